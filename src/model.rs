use arboard::Clipboard;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, error, info, trace};

use crate::dataset::Dataset;
use crate::domain::{CMDMode, HELP_TEXT, MARKET_TABS, MdvConfig, MdvError, Message};
use crate::export;
use crate::fetch::Fetcher;
use crate::filter::{FilterPredicate, Operator};
use crate::inputter::{InputResult, Inputter};
use crate::kind;
use crate::paging::{self, Page};
use crate::sort::{Direction, SortSpec};
use crate::visibility::VisibilityResolver;
use crate::{filter, sort};

#[derive(Debug, PartialEq)]
pub enum Status {
    EMPTY,
    READY,
    LOADING,
    QUITTING,
}

/// Where the base dataset comes from. Each variant is a one-shot fetch; a
/// refresh replaces the dataset wholesale or, on failure, leaves the last
/// good one in place.
#[derive(Debug, Clone)]
pub enum Source {
    Sheet { sheet_id: String },
    File { path: PathBuf },
    Feed { url: String, weeks: Option<u32> },
    Sellers { url: String },
}

pub struct Model {
    config: MdvConfig,
    source: Source,
    fetcher: Option<Fetcher>,
    resolver: VisibilityResolver,

    tabs: Vec<String>,
    active_tab: usize,
    // Feed regions arrive in one response; switching tabs picks from here.
    feed_regions: Vec<(String, Dataset)>,

    data: Dataset,
    visible_columns: Vec<String>,
    search_term: String,
    filters: Vec<FilterPredicate>,
    sort: Option<SortSpec>,
    page_index: usize,
    // Filtered + sorted row indices into `data`; pagination slices this.
    view: Vec<usize>,

    selected_row: usize,
    selected_column: usize,

    pub status: Status,
    status_message: String,
    show_popup: bool,
    popup_message: String,

    input: Inputter,
    last_input: InputResult,
    cmd_mode: Option<CMDMode>,
    active_cmdinput: bool,

    clipboard: Option<Clipboard>,
}

impl Model {
    pub fn init(
        config: MdvConfig,
        source: Source,
        resolver: VisibilityResolver,
    ) -> Result<Self, MdvError> {
        let fetcher = match source {
            Source::File { .. } => None,
            _ => Some(Fetcher::new()?),
        };
        let mut model = Self {
            config,
            source,
            fetcher,
            resolver,
            tabs: Vec::new(),
            active_tab: 0,
            feed_regions: Vec::new(),
            data: Dataset::default(),
            visible_columns: Vec::new(),
            search_term: String::new(),
            filters: Vec::new(),
            sort: None,
            page_index: 1,
            view: Vec::new(),
            selected_row: 0,
            selected_column: 0,
            status: Status::EMPTY,
            status_message: "Started mdv!".to_string(),
            show_popup: false,
            popup_message: String::new(),
            input: Inputter::default(),
            last_input: InputResult::default(),
            cmd_mode: None,
            active_cmdinput: false,
            clipboard: None,
        };
        model.load_tabs();
        model.refresh();
        Ok(model)
    }

    /// Builds a model around an already materialized dataset. Used for the
    /// local-file source and by tests; skips all network access.
    pub fn with_dataset(
        config: MdvConfig,
        resolver: VisibilityResolver,
        tab: &str,
        data: Dataset,
    ) -> Self {
        let mut model = Self {
            config,
            source: Source::File {
                path: PathBuf::new(),
            },
            fetcher: None,
            resolver,
            tabs: vec![tab.to_string()],
            active_tab: 0,
            feed_regions: Vec::new(),
            data: Dataset::default(),
            visible_columns: Vec::new(),
            search_term: String::new(),
            filters: Vec::new(),
            sort: None,
            page_index: 1,
            view: Vec::new(),
            selected_row: 0,
            selected_column: 0,
            status: Status::EMPTY,
            status_message: String::new(),
            show_popup: false,
            popup_message: String::new(),
            input: Inputter::default(),
            last_input: InputResult::default(),
            cmd_mode: None,
            active_cmdinput: false,
            clipboard: None,
        };
        model.replace_dataset(data);
        model
    }

    fn load_tabs(&mut self) {
        let candidates: Vec<String> = match &self.source {
            Source::Sheet { .. } => MARKET_TABS.iter().map(|t| t.to_string()).collect(),
            Source::File { path } => {
                let name = path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("local")
                    .to_string();
                vec![name]
            }
            // Feed tabs come from the response itself, filled in on refresh.
            Source::Feed { .. } => Vec::new(),
            Source::Sellers { .. } => vec!["sellers".to_string()],
        };
        self.tabs = candidates
            .into_iter()
            .filter(|tab| self.resolver.is_tab_visible(tab))
            .collect();
        debug!("{} visible tabs for role {}", self.tabs.len(), self.resolver.role());
    }

    pub fn tab_name(&self) -> &str {
        self.tabs
            .get(self.active_tab)
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn tabs(&self) -> &[String] {
        &self.tabs
    }

    pub fn active_tab(&self) -> usize {
        self.active_tab
    }

    /// Re-fetches the active tab. On failure the previous dataset stays on
    /// screen and the failure lands in the status line, never a crash.
    pub fn refresh(&mut self) {
        self.status = Status::LOADING;
        match self.fetch_active() {
            Ok(data) => {
                let rows = data.len();
                self.replace_dataset(data);
                self.set_status_message(format!("Loaded {rows} records"));
            }
            Err(e) => {
                error!("Refresh failed, keeping previous data: {e}");
                self.status = if self.data.is_empty() {
                    Status::EMPTY
                } else {
                    Status::READY
                };
                self.set_status_message(format!("Refresh failed: {e}"));
            }
        }
    }

    fn fetch_active(&mut self) -> Result<Dataset, MdvError> {
        match (&self.source, &self.fetcher) {
            (Source::File { path }, _) => {
                let text = fs::read_to_string(path)?;
                if path.extension().is_some_and(|ext| ext == "json") {
                    let json = serde_json::from_str(&text)?;
                    Dataset::from_json_rows(&json)
                } else {
                    Ok(Dataset::from_csv(&text))
                }
            }
            (Source::Sheet { sheet_id }, Some(fetcher)) => {
                let tab = self
                    .tabs
                    .get(self.active_tab)
                    .cloned()
                    .unwrap_or_else(|| "GLOBAL".to_string());
                let text = fetcher.sheet_csv(sheet_id, &tab)?;
                Ok(Dataset::from_csv(&text))
            }
            (Source::Feed { url, weeks }, Some(fetcher)) => {
                let regions = fetcher.region_feed(url, *weeks)?;
                self.feed_regions = regions;
                self.tabs = self
                    .feed_regions
                    .iter()
                    .map(|(region, _)| region.clone())
                    .filter(|region| self.resolver.is_tab_visible(region))
                    .collect();
                self.active_tab = self.active_tab.min(self.tabs.len().saturating_sub(1));
                let tab = self.tab_name().to_string();
                Ok(self.region_dataset(&tab))
            }
            (Source::Sellers { url }, Some(fetcher)) => fetcher.sellers(url),
            _ => Ok(Dataset::default()),
        }
    }

    fn region_dataset(&self, tab: &str) -> Dataset {
        self.feed_regions
            .iter()
            .find(|(region, _)| region == tab)
            .map(|(_, data)| data.clone())
            .unwrap_or_default()
    }

    fn replace_dataset(&mut self, data: Dataset) {
        self.data = data;
        let tab = self.tab_name().to_string();
        self.visible_columns = self.resolver.visible_columns(&tab, self.data.headers());
        self.page_index = 1;
        self.selected_row = 0;
        self.selected_column = 0;
        self.rebuild_view();
        self.status = if self.data.is_empty() {
            Status::EMPTY
        } else {
            Status::READY
        };
    }

    /// Pure pipeline recomputation: the visible set is always
    /// `paginate(sort(filter(all)))` over the immutable base. Filter and
    /// sort produce index views; nothing mutates the base rows.
    fn rebuild_view(&mut self) {
        let filtered = filter::apply(&self.data, &self.filters, &self.search_term);
        self.view = sort::apply(&self.data, &filtered, self.sort.as_ref());
        let page = paging::paginate(&self.view, self.page_index, self.config.page_size);
        self.page_index = page.page_index;
        self.selected_row = self.selected_row.min(page.items.len().saturating_sub(1));
        self.selected_column = self
            .selected_column
            .min(self.visible_columns.len().saturating_sub(1));
        trace!(
            "View rebuilt: {}/{} rows, page {}/{}",
            self.view.len(),
            self.data.len(),
            self.page_index,
            page.page_count
        );
    }

    // -------------------- control state transitions ---------------------- //

    pub fn set_search(&mut self, term: &str) {
        self.search_term = term.to_string();
        self.page_index = 1;
        self.rebuild_view();
    }

    pub fn add_filter(&mut self, predicate: FilterPredicate) {
        info!(
            "Filter: {} {} {}",
            predicate.column,
            predicate.operator.as_str(),
            predicate.value
        );
        self.filters.push(predicate);
        self.page_index = 1;
        self.rebuild_view();
    }

    pub fn clear_filters(&mut self) {
        self.filters.clear();
        self.page_index = 1;
        self.rebuild_view();
        self.set_status_message("Filters cleared".to_string());
    }

    /// Header-click sort interaction: a new column sorts ascending, the active
    /// column flips direction. Last write wins, no secondary sort.
    pub fn toggle_sort(&mut self, column: &str) {
        let direction = match &self.sort {
            Some(spec) if spec.column == column => spec.direction.toggled(),
            _ => Direction::Asc,
        };
        self.sort = Some(SortSpec {
            column: column.to_string(),
            direction,
        });
        self.rebuild_view();
    }

    pub fn set_sort(&mut self, column: &str, direction: Direction) {
        self.sort = Some(SortSpec {
            column: column.to_string(),
            direction,
        });
        self.rebuild_view();
    }

    pub fn set_page(&mut self, page_index: usize) {
        self.page_index = page_index;
        self.rebuild_view();
    }

    fn next_tab(&mut self) {
        if self.tabs.len() < 2 {
            return;
        }
        self.active_tab = (self.active_tab + 1) % self.tabs.len();
        self.search_term.clear();
        self.filters.clear();
        self.sort = None;
        self.page_index = 1;
        match &self.source {
            Source::Feed { .. } => {
                let tab = self.tab_name().to_string();
                let data = self.region_dataset(&tab);
                self.replace_dataset(data);
            }
            _ => self.refresh(),
        }
    }

    // ------------------------- ui state access --------------------------- //

    pub fn page(&self) -> Page<'_> {
        paging::paginate(&self.view, self.page_index, self.config.page_size)
    }

    /// All filtered and sorted rows, pagination independent. This is what
    /// the CSV export walks.
    pub fn view(&self) -> &[usize] {
        &self.view
    }

    pub fn visible_columns(&self) -> &[String] {
        &self.visible_columns
    }

    pub fn cell_display(&self, row: usize, column: &str) -> String {
        kind::format_cell(self.data.get(row, column), kind::classify(column))
    }

    pub fn sort_spec(&self) -> Option<&SortSpec> {
        self.sort.as_ref()
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn filters(&self) -> &[FilterPredicate] {
        &self.filters
    }

    pub fn selection(&self) -> (usize, usize) {
        (self.selected_row, self.selected_column)
    }

    pub fn status_message(&self) -> &str {
        &self.status_message
    }

    pub fn popup(&self) -> Option<&str> {
        self.show_popup.then_some(self.popup_message.as_str())
    }

    pub fn cmd_input(&self) -> Option<&InputResult> {
        self.active_cmdinput.then_some(&self.last_input)
    }

    pub fn raw_keyevents(&self) -> bool {
        self.active_cmdinput
    }

    fn set_status_message(&mut self, message: String) {
        trace!("Status: {message}");
        self.status_message = message;
    }

    // --------------------------- update loop ------------------------------ //

    pub fn update(&mut self, message: Message) -> Result<(), MdvError> {
        if self.active_cmdinput {
            if let Message::RawKey(key) = message {
                self.raw_input(key);
            }
            return Ok(());
        }
        match message {
            Message::Quit => self.status = Status::QUITTING,
            Message::Help => self.toggle_help(),
            Message::Exit => {
                self.show_popup = false;
            }
            Message::MoveUp => self.move_selection(-1, 0),
            Message::MoveDown => self.move_selection(1, 0),
            Message::MoveLeft => self.move_selection(0, -1),
            Message::MoveRight => self.move_selection(0, 1),
            Message::NextPage => self.set_page(self.page_index + 1),
            Message::PrevPage => self.set_page(self.page_index.saturating_sub(1)),
            Message::NextTab => self.next_tab(),
            Message::Refresh => self.refresh(),
            Message::Search => self.enter_cmd_mode(CMDMode::SearchTable),
            Message::Filter => self.enter_cmd_mode(CMDMode::AddFilter),
            Message::ClearFilters => self.clear_filters(),
            Message::Sort => {
                if let Some(column) = self.selected_column_name() {
                    self.toggle_sort(&column);
                }
            }
            Message::SortDescending => {
                if let Some(column) = self.selected_column_name() {
                    self.set_sort(&column, Direction::Desc);
                }
            }
            Message::Export => self.export_csv(),
            Message::CopyCell => self.copy_cell(),
            Message::CopyRow => self.copy_row(),
            Message::Resize(_, _) => {}
            Message::RawKey(_) => {}
        }
        Ok(())
    }

    fn toggle_help(&mut self) {
        if self.show_popup {
            self.show_popup = false;
        } else {
            self.popup_message = HELP_TEXT.to_string();
            self.show_popup = true;
        }
    }

    fn selected_column_name(&self) -> Option<String> {
        self.visible_columns.get(self.selected_column).cloned()
    }

    fn selected_data_row(&self) -> Option<usize> {
        self.page().items.get(self.selected_row).copied()
    }

    fn move_selection(&mut self, drow: i64, dcol: i64) {
        let page_len = self.page().items.len();
        if page_len > 0 {
            let row = self.selected_row as i64 + drow;
            self.selected_row = row.clamp(0, page_len as i64 - 1) as usize;
        }
        if !self.visible_columns.is_empty() {
            let col = self.selected_column as i64 + dcol;
            self.selected_column = col.clamp(0, self.visible_columns.len() as i64 - 1) as usize;
        }
    }

    fn enter_cmd_mode(&mut self, mode: CMDMode) {
        let prompt = match mode {
            CMDMode::SearchTable => "search: ",
            CMDMode::AddFilter => "filter (column operator value): ",
        };
        self.cmd_mode = Some(mode);
        self.active_cmdinput = true;
        self.input.start(prompt);
        self.last_input = self.input.get();
    }

    fn raw_input(&mut self, key: ratatui::crossterm::event::KeyEvent) {
        self.last_input = self.input.read(key);
        if self.last_input.finished {
            self.active_cmdinput = false;
            let result = self.last_input.clone();
            let mode = self.cmd_mode.take();
            if result.canceled {
                return;
            }
            match mode {
                Some(CMDMode::SearchTable) => {
                    self.set_search(&result.input);
                    self.set_status_message(format!("Found {} results", self.view.len()));
                }
                Some(CMDMode::AddFilter) => match parse_filter(&result.input) {
                    Ok(predicate) => self.add_filter(predicate),
                    Err(msg) => self.set_status_message(msg),
                },
                None => {}
            }
        }
    }

    fn export_csv(&mut self) {
        let text = export::to_csv(&self.data, &self.view, Some(&self.visible_columns));
        let path = self.config.export_path.clone();
        match fs::write(&path, text) {
            Ok(()) => {
                info!("Exported {} rows to {path}", self.view.len());
                self.set_status_message(format!("Exported {} rows to {path}", self.view.len()));
            }
            Err(e) => {
                error!("Export failed: {e}");
                self.set_status_message(format!("Export failed: {e}"));
            }
        }
    }

    fn clipboard_set(&mut self, content: String) {
        if self.clipboard.is_none() {
            match Clipboard::new() {
                Ok(clipboard) => self.clipboard = Some(clipboard),
                Err(e) => {
                    error!("Clipboard unavailable: {e}");
                    self.set_status_message("Clipboard unavailable".to_string());
                    return;
                }
            }
        }
        if let Some(clipboard) = self.clipboard.as_mut() {
            match clipboard.set_text(content) {
                Ok(()) => self.set_status_message("Copied".to_string()),
                Err(e) => {
                    error!("Error copying to clipboard: {e:?}");
                    self.set_status_message("Copy failed".to_string());
                }
            }
        }
    }

    fn copy_cell(&mut self) {
        let Some(row) = self.selected_data_row() else {
            return;
        };
        let Some(column) = self.selected_column_name() else {
            return;
        };
        let cell = self.data.get(row, &column).raw();
        self.clipboard_set(cell);
    }

    fn copy_row(&mut self) {
        let Some(row) = self.selected_data_row() else {
            return;
        };
        let line = export::row_as_csv(&self.data, row, &self.visible_columns);
        self.clipboard_set(line);
    }
}

/// Parses a `column operator value` command line into a predicate. The
/// column may use its display label; the value may contain spaces.
pub fn parse_filter(input: &str) -> Result<FilterPredicate, String> {
    let mut parts = input.trim().splitn(3, char::is_whitespace);
    let column = parts.next().filter(|c| !c.is_empty());
    let operator = parts.next();
    let value = parts.next().unwrap_or("");
    match (column, operator) {
        (Some(column), Some(operator)) => {
            let operator: Operator = operator.parse()?;
            Ok(FilterPredicate {
                column: crate::columns::original_name(column).to_string(),
                operator,
                value: value.trim().to_string(),
            })
        }
        _ => Err("usage: column operator value".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SettingsStore;
    use crate::visibility::VisibilityResolver;

    fn resolver() -> VisibilityResolver {
        VisibilityResolver::new(Box::new(SettingsStore::in_memory().unwrap()), "viewer")
    }

    fn market_model() -> Model {
        let data = Dataset::from_csv(
            "SSP,Revenue,Priority_Weight\n\
             Google,15000,10%\n\
             Amazon,12000.5,2%\n\
             Index,500,33%\n\
             Pubmatic,oops,5%\n",
        );
        Model::with_dataset(MdvConfig::default(), resolver(), "market_lines", data)
    }

    #[test]
    fn search_resets_page_and_narrows_view() {
        let mut model = market_model();
        model.set_page(2);
        model.set_search("ama");
        assert_eq!(model.page().page_index, 1);
        assert_eq!(model.view().len(), 1);
        model.set_search("");
        assert_eq!(model.view().len(), 4);
    }

    #[test]
    fn filters_and_search_intersect() {
        let mut model = market_model();
        model.add_filter(parse_filter("Revenue greater-than 1000").unwrap());
        assert_eq!(model.view().len(), 2);
        model.set_search("goo");
        assert_eq!(model.view().len(), 1);
        model.clear_filters();
        assert_eq!(model.view().len(), 1); // search is still active
        model.set_search("");
        assert_eq!(model.view().len(), 4);
    }

    #[test]
    fn toggle_sort_follows_click_semantics() {
        let mut model = market_model();
        model.toggle_sort("Revenue");
        assert_eq!(
            model.sort_spec(),
            Some(&SortSpec {
                column: "Revenue".to_string(),
                direction: Direction::Asc
            })
        );
        model.toggle_sort("Revenue");
        assert_eq!(model.sort_spec().unwrap().direction, Direction::Desc);
        model.toggle_sort("SSP");
        let spec = model.sort_spec().unwrap();
        assert_eq!(spec.column, "SSP");
        assert_eq!(spec.direction, Direction::Asc);
    }

    #[test]
    fn percentage_column_sorts_numerically_through_the_model() {
        let mut model = market_model();
        model.toggle_sort("Priority_Weight");
        let weights: Vec<String> = model
            .view()
            .iter()
            .map(|&row| model.cell_display(row, "Priority_Weight"))
            .collect();
        assert_eq!(weights, ["2%", "5%", "10%", "33%"]);
    }

    #[test]
    fn display_formatting_reaches_cells() {
        let model = market_model();
        let revenue: Vec<String> = model
            .view()
            .iter()
            .map(|&row| model.cell_display(row, "Revenue"))
            .collect();
        assert_eq!(revenue, ["15.000 €", "12.001 €", "500 €", "oops"]);
    }

    #[test]
    fn filter_parsing() {
        let predicate = parse_filter("SSP starts-with goo").unwrap();
        assert_eq!(predicate.column, "SSP");
        assert_eq!(predicate.operator, Operator::StartsWith);
        assert_eq!(predicate.value, "goo");

        // Display labels map back to raw keys.
        assert_eq!(parse_filter("Weight equals 10%").unwrap().column, "Priority_Weight");
        // Values may contain whitespace.
        assert_eq!(parse_filter("SSP equals a b c").unwrap().value, "a b c");
        assert!(parse_filter("SSP").is_err());
        assert!(parse_filter("SSP between 1").is_err());
    }

    #[test]
    fn hidden_columns_drop_out_of_the_visible_set() {
        let mut store = SettingsStore::in_memory().unwrap();
        store
            .set_hidden_columns("viewer", "market_lines", &["Revenue".to_string()])
            .unwrap();
        let resolver = VisibilityResolver::new(Box::new(store), "viewer");
        let data = Dataset::from_csv("SSP,Revenue\nGoogle,5\n");
        let model = Model::with_dataset(MdvConfig::default(), resolver, "market_lines", data);
        assert_eq!(model.visible_columns(), ["SSP"]);
    }

    #[test]
    fn pagination_through_the_model() {
        let mut rows = String::from("n\n");
        for i in 0..250 {
            rows.push_str(&format!("{i}\n"));
        }
        let data = Dataset::from_csv(&rows);
        let mut model =
            Model::with_dataset(MdvConfig::default(), resolver(), "market_lines", data);
        assert_eq!(model.page().page_count, 3);
        model.set_page(99);
        assert_eq!(model.page().page_index, 3);
        assert_eq!(model.page().items.len(), 50);
    }

    #[test]
    fn failed_refresh_keeps_the_previous_dataset() {
        // The file behind this model does not exist, so a refresh can only
        // fail; the loaded data and READY status must survive it, with the
        // failure on the status line instead of a crash.
        let mut model = market_model();
        assert_eq!(model.view().len(), 4);
        model.update(Message::Refresh).unwrap();
        assert_eq!(model.status, Status::READY);
        assert_eq!(model.view().len(), 4);
        assert_eq!(model.cell_display(0, "SSP"), "Google");
        assert!(model.status_message().starts_with("Refresh failed"));
    }

    #[test]
    fn export_writes_filtered_rows_with_visible_columns_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");

        let mut store = SettingsStore::in_memory().unwrap();
        store
            .set_hidden_columns("viewer", "market_lines", &["Priority_Weight".to_string()])
            .unwrap();
        let resolver = VisibilityResolver::new(Box::new(store), "viewer");
        let data = Dataset::from_csv(
            "SSP,Revenue,Priority_Weight\nGoogle,15000,10%\nAmazon,12000.5,2%\n",
        );
        let config = MdvConfig::default().export_path(path.to_string_lossy().into_owned());
        let mut model = Model::with_dataset(config, resolver, "market_lines", data);
        model.set_search("goog");
        model.update(Message::Export).unwrap();

        // Raw values and display headers, not the formatted cells.
        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(written, "SSP,Revenue\nGoogle,15000");
    }
}
