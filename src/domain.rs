use derive_setters::Setters;
use std::io::Error;

pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Region tabs the market sheet is known to carry. The CSV export endpoint
/// cannot enumerate tabs, so this list stands in and gets filtered through
/// the per-role tab visibility rules.
pub const MARKET_TABS: [&str; 21] = [
    "GLOBAL", "DE", "ES", "IT", "FR", "GB", "US", "NL", "DK", "FI", "NO", "SE", "CL", "BR", "AR",
    "MX", "CO", "PE", "LATAM", "NORDIC", "APAC",
];

pub const HELP_TEXT: &str = "mdv - market data viewer

    q           quit
    h, ?        toggle this help
    arrows      move selection
    n / p       next / previous page
    /           search all columns
    f           add a filter (column operator value)
    F           clear all filters
    s           sort selected column (again to flip direction)
    S           sort selected column descending
    tab         next sheet tab
    r           refresh current tab
    e           export visible rows to CSV file
    y           copy selected cell
    Y           copy selected row as CSV
    esc         close popup / cancel input
";

#[derive(Debug)]
pub enum MdvError {
    IoError(Error),
    HttpError(reqwest::Error),
    DbError(rusqlite::Error),
    JsonError(serde_json::Error),
    // Remote answered, but not with usable data (non-2xx, wrong shape).
    FetchFailed(String),
    InvalidSheetUrl(String),
}

impl std::fmt::Display for MdvError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MdvError::IoError(e) => write!(f, "io error: {e}"),
            MdvError::HttpError(e) => write!(f, "http error: {e}"),
            MdvError::DbError(e) => write!(f, "settings store error: {e}"),
            MdvError::JsonError(e) => write!(f, "json error: {e}"),
            MdvError::FetchFailed(msg) => write!(f, "fetch failed: {msg}"),
            MdvError::InvalidSheetUrl(url) => write!(f, "not a google sheet url: {url}"),
        }
    }
}

impl std::error::Error for MdvError {}

impl From<Error> for MdvError {
    fn from(err: Error) -> Self {
        MdvError::IoError(err)
    }
}

impl From<reqwest::Error> for MdvError {
    fn from(err: reqwest::Error) -> Self {
        MdvError::HttpError(err)
    }
}

impl From<rusqlite::Error> for MdvError {
    fn from(err: rusqlite::Error) -> Self {
        MdvError::DbError(err)
    }
}

impl From<serde_json::Error> for MdvError {
    fn from(err: serde_json::Error) -> Self {
        MdvError::JsonError(err)
    }
}

#[derive(Debug, Clone, Setters)]
#[setters(into)]
pub struct MdvConfig {
    pub role: String,
    pub page_size: usize,
    pub event_poll_time: u64,
    pub export_path: String,
}

impl Default for MdvConfig {
    fn default() -> Self {
        Self {
            role: "viewer".to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            event_poll_time: 100,
            export_path: "table-data.csv".to_string(),
        }
    }
}

/// What kind of text the command line is currently collecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CMDMode {
    SearchTable,
    AddFilter,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Quit,
    Help,
    Exit,
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    NextPage,
    PrevPage,
    NextTab,
    Refresh,
    Search,
    Filter,
    ClearFilters,
    Sort,
    SortDescending,
    Export,
    CopyCell,
    CopyRow,
    Resize(usize, usize),
    RawKey(ratatui::crossterm::event::KeyEvent),
}
