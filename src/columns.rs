//! Static, role agnostic mapping from raw sheet column keys to the labels
//! shown in table headers and CSV exports. Unmapped keys fall back to the
//! raw key.

/// Raw column name -> display friendly name.
const DISPLAY_NAMES: [(&str, &str); 4] = [
    ("Primary_Line", "Primary"),
    ("Priority_Weight", "Weight"),
    ("demand_partner", "SSP"),
    ("demand_market_division", "Division"),
];

/// Columns whose cells hold percentage strings ("80%"). These sort on the
/// parsed numeric value, not lexicographically.
const PERCENTAGE_COLUMNS: [&str; 1] = ["Priority_Weight"];

pub fn display_name(column: &str) -> &str {
    DISPLAY_NAMES
        .iter()
        .find(|(raw, _)| *raw == column)
        .map(|(_, label)| *label)
        .unwrap_or(column)
}

/// Inverse of [`display_name`], used when mapping a header cell a user
/// interacted with back to the raw record key.
pub fn original_name(label: &str) -> &str {
    DISPLAY_NAMES
        .iter()
        .find(|(_, display)| *display == label)
        .map(|(raw, _)| *raw)
        .unwrap_or(label)
}

pub fn is_percentage_column(column: &str) -> bool {
    PERCENTAGE_COLUMNS.contains(&column)
}
