use serde_json::Value as Json;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::domain::MdvError;

/// One cell of tabular data. Cells arrive as text from the sheet export and
/// are promoted to `Num` when they match a plain numeric literal; `Missing`
/// marks a field a short row never carried.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Num(f64),
    Missing,
}

impl Value {
    /// Raw string representation, without any display formatting applied.
    /// Whole numbers render without a decimal point, matching how they were
    /// read from the sheet.
    pub fn raw(&self) -> String {
        match self {
            Value::Str(s) => s.clone(),
            Value::Num(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{n}")
                }
            }
            Value::Missing => String::new(),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Num(n) => Some(*n),
            Value::Str(s) => {
                let n: f64 = s.trim().parse().ok()?;
                n.is_finite().then_some(n)
            }
            Value::Missing => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    fn from_json(json: &Json) -> Value {
        match json {
            Json::Null => Value::Missing,
            Json::Number(n) => Value::Num(n.as_f64().unwrap_or(0.0)),
            Json::String(s) => promote(s),
            Json::Bool(b) => Value::Str(b.to_string()),
            other => Value::Str(other.to_string()),
        }
    }
}

/// Matches `^-?\d+(\.\d+)?$`, the pattern the sheet export uses for plain
/// numeric cells. Percentages, currency glyphs and grouping separators stay
/// strings on purpose.
fn is_numeric_literal(field: &str) -> bool {
    let digits = field.strip_prefix('-').unwrap_or(field);
    if digits.is_empty() {
        return false;
    }
    match digits.split_once('.') {
        None => digits.bytes().all(|b| b.is_ascii_digit()),
        Some((int, frac)) => {
            !int.is_empty()
                && !frac.is_empty()
                && int.bytes().all(|b| b.is_ascii_digit())
                && frac.bytes().all(|b| b.is_ascii_digit())
        }
    }
}

fn promote(field: &str) -> Value {
    if is_numeric_literal(field) {
        match field.parse::<f64>() {
            Ok(n) => Value::Num(n),
            Err(_) => Value::Str(field.to_string()),
        }
    } else {
        Value::Str(field.to_string())
    }
}

/// Splits a raw CSV blob into rows of raw fields. Single left-to-right scan
/// with a quote flag: `""` inside quotes is a literal quote, separators and
/// line breaks inside quotes are data, `\r\n` counts as one break. Best
/// effort on malformed input; an unterminated quote runs to end of input.
pub fn parse_csv(text: &str) -> Vec<Vec<String>> {
    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;

    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            ',' if !in_quotes => {
                row.push(std::mem::take(&mut field));
            }
            '\n' | '\r' if !in_quotes => {
                if c == '\r' && chars.peek() == Some(&'\n') {
                    chars.next();
                }
                if !field.is_empty() || !row.is_empty() {
                    row.push(std::mem::take(&mut field));
                    rows.push(std::mem::take(&mut row));
                }
            }
            _ => field.push(c),
        }
    }
    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }
    rows
}

/// An immutable rectangular dataset: the header set (order significant, it
/// defines default column and CSV export order) plus data rows. Replaced
/// wholesale on refresh; every derived stage (filter, sort, page) works on
/// row indices into this base.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    headers: Vec<String>,
    index: HashMap<String, usize>,
    rows: Vec<Vec<Value>>,
}

impl Dataset {
    fn from_header_and_rows(headers: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let index = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.clone(), i))
            .collect();
        Dataset {
            headers,
            index,
            rows,
        }
    }

    /// Materializes parsed rows into a dataset: row 0 is the header, the
    /// rest zip positionally against it. Fewer than two rows means there is
    /// no header or no data, which yields an empty dataset.
    pub fn from_rows(mut parsed: Vec<Vec<Value>>) -> Self {
        if parsed.len() < 2 {
            debug!("Materializing empty dataset from {} rows", parsed.len());
            return Dataset::default();
        }
        let header_row = parsed.remove(0);
        let headers: Vec<String> = header_row.iter().map(Value::raw).collect();
        for row in parsed.iter_mut() {
            // Rows longer than the header carry cells no key can reach.
            if row.len() > headers.len() {
                warn!(
                    "Dropping {} unkeyed trailing cells",
                    row.len() - headers.len()
                );
                row.truncate(headers.len());
            }
        }
        Dataset::from_header_and_rows(headers, parsed)
    }

    pub fn from_csv(text: &str) -> Self {
        let parsed = parse_csv(text)
            .into_iter()
            .map(|row| row.iter().map(|field| promote(field)).collect())
            .collect();
        Dataset::from_rows(parsed)
    }

    /// Normalizes a pre-parsed JSON array-of-arrays (the mock/test source
    /// shape) into the same dataset the CSV path produces.
    pub fn from_json_rows(json: &Json) -> Result<Self, MdvError> {
        let outer = json
            .as_array()
            .ok_or_else(|| MdvError::FetchFailed("expected an array of rows".to_string()))?;
        let mut parsed = Vec::with_capacity(outer.len());
        for row in outer {
            let cells = row
                .as_array()
                .ok_or_else(|| MdvError::FetchFailed("expected an array of cells".to_string()))?;
            parsed.push(cells.iter().map(Value::from_json).collect());
        }
        Ok(Dataset::from_rows(parsed))
    }

    /// Builds a dataset from keyed JSON records (region feed, sellers.json).
    /// The first record's key order defines the header set.
    pub fn from_records(records: &[serde_json::Map<String, Json>]) -> Self {
        let Some(first) = records.first() else {
            return Dataset::default();
        };
        let headers: Vec<String> = first.keys().cloned().collect();
        let rows = records
            .iter()
            .map(|record| {
                headers
                    .iter()
                    .map(|h| record.get(h).map(Value::from_json).unwrap_or(Value::Missing))
                    .collect()
            })
            .collect();
        Dataset::from_header_and_rows(headers, rows)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.index.get(column).copied()
    }

    /// Cell lookup by row index and column name. Out of range positions and
    /// unknown columns read as `Missing`, short rows included.
    pub fn get(&self, row: usize, column: &str) -> &Value {
        const MISSING: &Value = &Value::Missing;
        let Some(col) = self.column_index(column) else {
            return MISSING;
        };
        self.rows
            .get(row)
            .and_then(|cells| cells.get(col))
            .unwrap_or(MISSING)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_quoted_fields() {
        let rows = parse_csv("a,\"b,c\",d\n1,\"say \"\"hi\"\"\",3\n");
        assert_eq!(rows[0], vec!["a", "b,c", "d"]);
        assert_eq!(rows[1], vec!["1", "say \"hi\"", "3"]);
    }

    #[test]
    fn preserves_newlines_inside_quotes() {
        let rows = parse_csv("a,b\n\"line1\nline2\",2\n");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][0], "line1\nline2");
    }

    #[test]
    fn crlf_is_one_line_break() {
        let rows = parse_csv("a,b\r\n1,2\r\n");
        assert_eq!(rows, vec![vec!["a", "b"], vec!["1", "2"]]);
    }

    #[test]
    fn empty_input_and_trailing_newlines() {
        assert!(parse_csv("").is_empty());
        assert_eq!(parse_csv("a,b\n").len(), 1);
        assert_eq!(parse_csv("a,b\n\n\n").len(), 1);
    }

    #[test]
    fn unterminated_quote_runs_to_end() {
        let rows = parse_csv("a,\"no closing\nquote");
        assert_eq!(rows, vec![vec!["a", "no closing\nquote"]]);
    }

    #[test]
    fn empty_fields_survive() {
        let rows = parse_csv("a,,c\n,,\n");
        assert_eq!(rows[0], vec!["a", "", "c"]);
        assert_eq!(rows[1], vec!["", "", ""]);
    }

    #[test]
    fn numeric_literal_pattern() {
        assert!(is_numeric_literal("42"));
        assert!(is_numeric_literal("-42"));
        assert!(is_numeric_literal("12000.5"));
        assert!(!is_numeric_literal("1."));
        assert!(!is_numeric_literal(".5"));
        assert!(!is_numeric_literal("80%"));
        assert!(!is_numeric_literal("1,000"));
        assert!(!is_numeric_literal(""));
        assert!(!is_numeric_literal("-"));
    }

    #[test]
    fn promotes_numeric_cells() {
        let ds = Dataset::from_csv("SSP,REV\nGoogle,15000\nAmazon,12000.5\n");
        assert_eq!(ds.get(0, "REV"), &Value::Num(15000.0));
        assert_eq!(ds.get(1, "REV"), &Value::Num(12000.5));
        assert_eq!(ds.get(0, "SSP"), &Value::Str("Google".to_string()));
    }

    #[test]
    fn fewer_than_two_rows_is_empty() {
        assert!(Dataset::from_csv("").is_empty());
        assert!(Dataset::from_csv("only,a,header\n").is_empty());
    }

    #[test]
    fn short_rows_read_as_missing() {
        let ds = Dataset::from_csv("a,b,c\n1,2\n");
        assert_eq!(ds.get(0, "a"), &Value::Num(1.0));
        assert_eq!(ds.get(0, "c"), &Value::Missing);
        assert_eq!(ds.get(0, "nope"), &Value::Missing);
    }

    #[test]
    fn json_rows_normalize_like_csv() {
        let json: Json =
            serde_json::from_str(r#"[["SSP","REV"],["Google",15000],["Amazon","12000.5"]]"#)
                .unwrap();
        let ds = Dataset::from_json_rows(&json).unwrap();
        assert_eq!(ds.headers(), ["SSP", "REV"]);
        assert_eq!(ds.get(0, "REV"), &Value::Num(15000.0));
        assert_eq!(ds.get(1, "REV"), &Value::Num(12000.5));
    }

    #[test]
    fn records_keep_first_record_key_order() {
        let records: Vec<serde_json::Map<String, Json>> = serde_json::from_str(
            r#"[{"seller_id":"1","name":"Acme","domain":"acme.tv"},
                {"seller_id":"2","name":"Beta","domain":null}]"#,
        )
        .unwrap();
        let ds = Dataset::from_records(&records);
        assert_eq!(ds.headers(), ["seller_id", "name", "domain"]);
        assert_eq!(ds.get(1, "domain"), &Value::Missing);
    }

    #[test]
    fn raw_rendering_of_numbers() {
        assert_eq!(Value::Num(15000.0).raw(), "15000");
        assert_eq!(Value::Num(12000.5).raw(), "12000.5");
        assert_eq!(Value::Missing.raw(), "");
    }
}
