use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::info;
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod columns;
mod controller;
mod dataset;
mod domain;
mod export;
mod fetch;
mod filter;
mod inputter;
mod kind;
mod model;
mod paging;
mod sort;
mod store;
mod ui;
mod visibility;

use controller::Controller;
use domain::{MdvConfig, MdvError};
use model::{Model, Source, Status};
use store::SettingsStore;
use ui::TableUI;
use visibility::VisibilityResolver;

/// A tui based viewer for spreadsheet backed market data.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Google Sheet URL, or a path to a local CSV file
    source: Option<String>,

    /// Region feed endpoint returning {status, data: {region: [...]}}
    #[arg(long, conflicts_with_all = ["source", "sellers_url"])]
    feed_url: Option<String>,

    /// Number of weeks the region feed should cover
    #[arg(long, requires = "feed_url")]
    weeks: Option<u32>,

    /// sellers.json endpoint
    #[arg(long, conflicts_with = "source")]
    sellers_url: Option<String>,

    /// Role the visibility rules are resolved for
    #[arg(long, default_value = "viewer")]
    role: String,

    /// SQLite file holding the visibility settings; in-memory when omitted
    #[arg(long)]
    settings_db: Option<String>,

    /// Rows per page
    #[arg(long, default_value_t = domain::DEFAULT_PAGE_SIZE)]
    page_size: usize,

    /// Target file for the CSV export
    #[arg(long, default_value = "table-data.csv")]
    export: String,

    /// Append logs to this file (tui mode cannot log to the terminal)
    #[arg(long)]
    log_file: Option<String>,
}

fn main() -> ExitCode {
    match run() {
        Err(e) => {
            ratatui::restore();
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => {
            ratatui::restore();
            ExitCode::SUCCESS
        }
    }
}

fn init_logging(log_file: Option<&str>) -> Result<(), MdvError> {
    let Some(path) = log_file else {
        return Ok(());
    };
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(expand(path))?;
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::sync::Mutex::new(file))
                .with_ansi(false),
        )
        .with(ErrorLayer::default())
        .init();
    Ok(())
}

fn expand(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::full(path).map_or_else(|_| path.to_string(), |p| p.into_owned()))
}

fn pick_source(cli: &Cli) -> Result<Source, MdvError> {
    if let Some(url) = &cli.feed_url {
        return Ok(Source::Feed {
            url: url.clone(),
            weeks: cli.weeks,
        });
    }
    if let Some(url) = &cli.sellers_url {
        return Ok(Source::Sellers { url: url.clone() });
    }
    let Some(source) = &cli.source else {
        return Err(MdvError::FetchFailed(
            "no data source given; pass a sheet URL, a CSV file, --feed-url or --sellers-url"
                .to_string(),
        ));
    };
    if source.starts_with("http://") || source.starts_with("https://") {
        let sheet_id = fetch::parse_sheet_id(source)
            .ok_or_else(|| MdvError::InvalidSheetUrl(source.clone()))?;
        Ok(Source::Sheet { sheet_id })
    } else {
        Ok(Source::File {
            path: expand(source),
        })
    }
}

fn run() -> Result<(), MdvError> {
    let cli = Cli::parse();
    init_logging(cli.log_file.as_deref())?;
    info!("Starting mdv for role {}", cli.role);

    let store = match &cli.settings_db {
        Some(path) => SettingsStore::open(&expand(path))?,
        None => SettingsStore::in_memory()?,
    };
    let resolver = VisibilityResolver::new(Box::new(store), &cli.role);

    let config = MdvConfig::default()
        .role(cli.role.clone())
        .page_size(cli.page_size.max(1))
        .export_path(cli.export.clone());

    let source = pick_source(&cli)?;
    let mut model = Model::init(config.clone(), source, resolver)?;

    let ui = TableUI::new();
    let controller = Controller::new(&config);
    let mut terminal = ratatui::init();

    while model.status != Status::QUITTING {
        terminal.draw(|f| ui.draw(&model, f))?;

        if let Some(message) = controller.handle_event(&model)? {
            model.update(message)?;
        }
    }

    Ok(())
}
