use crate::columns;
use crate::dataset::Dataset;

/// Quotes a field iff it contains a comma, a quote or a newline, doubling
/// internal quotes. Structural inverse of the parser's quoting rules.
fn escape_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn render_row(data: &Dataset, row: usize, selected: &[String]) -> String {
    selected
        .iter()
        .map(|column| escape_field(&data.get(row, column).raw()))
        .collect::<Vec<String>>()
        .join(",")
}

/// Serializes the given rows back to CSV text. The header row uses the
/// display-name mapping, the same one the on-screen headers use; data cells
/// render their raw (not kind-formatted) values. Falls back to the full
/// header set when no column selection is given.
pub fn to_csv(data: &Dataset, rows: &[usize], selected: Option<&[String]>) -> String {
    let all = data.headers();
    let selected: &[String] = match selected {
        Some(columns) if !columns.is_empty() => columns,
        _ => all,
    };

    let header = selected
        .iter()
        .map(|column| escape_field(columns::display_name(column)))
        .collect::<Vec<String>>()
        .join(",");

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(header);
    for &row in rows {
        lines.push(render_row(data, row, selected));
    }
    lines.join("\n")
}

/// One data row as a single CSV line, for copy-row-to-clipboard.
pub fn row_as_csv(data: &Dataset, row: usize, selected: &[String]) -> String {
    render_row(data, row, selected)
}
