use crate::columns;
use crate::dataset::Value;

/// Semantic classification of a column, driving both display formatting and
/// the sort comparator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Plain,
    Percentage,
    Currency,
    Rpmo,
    Rank,
}

/// Classifies a column by name. Currency/rpmo/rank substring checks take
/// precedence over the percentage map and over generic numeric detection,
/// so `Revenue_rank` stays a rank column.
pub fn classify(column: &str) -> Kind {
    let lower = column.to_lowercase();
    if lower.contains("rank") {
        Kind::Rank
    } else if lower.contains("rpmo") {
        Kind::Rpmo
    } else if lower.contains("rev") {
        Kind::Currency
    } else if columns::is_percentage_column(column) {
        Kind::Percentage
    } else {
        Kind::Plain
    }
}

/// Renders one cell for display. Missing and empty cells render empty
/// regardless of kind; non numeric text in a typed column passes through
/// unformatted.
pub fn format_cell(value: &Value, kind: Kind) -> String {
    let raw = value.raw();
    if raw.is_empty() {
        return raw;
    }
    let Some(n) = value.as_number() else {
        return raw;
    };
    match kind {
        Kind::Currency => format!("{} €", format_magnitude(n)),
        Kind::Rpmo => decimal_string(n, 4),
        Kind::Rank => format!("{}", n.round() as i64),
        Kind::Plain => format_magnitude(n),
        // Percentage cells display as received ("80%"); the parsed number
        // only matters for sorting.
        Kind::Percentage => raw,
    }
}

/// de-DE style numeric rendering: values below 10 keep exactly one decimal
/// digit, values at or above round to a whole number. The compare is
/// signed, so every negative value takes the one-decimal path; thousands
/// group with dots on both paths. Rounding is half away from zero.
fn format_magnitude(n: f64) -> String {
    if n < 10.0 {
        let rendered = format!("{n:.1}");
        let (int, frac) = rendered.split_once('.').unwrap_or((rendered.as_str(), "0"));
        let (sign, digits) = match int.strip_prefix('-') {
            Some(rest) => ("-", rest),
            None => ("", int),
        };
        format!("{sign}{},{frac}", group_digits(digits))
    } else {
        group_thousands(n.round() as i64)
    }
}

fn decimal_string(n: f64, decimals: usize) -> String {
    // Comma as the decimal separator, per the locale of the dashboard.
    format!("{n:.decimals$}").replacen('.', ",", 1)
}

fn group_digits(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    let lead = digits.len() % 3;
    for (i, c) in digits.chars().enumerate() {
        if i != 0 && (i + 3 - lead) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }
    grouped
}

fn group_thousands(n: i64) -> String {
    let grouped = group_digits(&n.abs().to_string());
    if n < 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

/// Parses a percentage cell for sorting: a trailing `%` is stripped, the
/// remainder parsed as a float; plain numbers parse as-is; anything else
/// counts as 0.
pub fn parse_percentage(value: &Value) -> f64 {
    match value {
        Value::Num(n) => *n,
        Value::Missing => 0.0,
        Value::Str(s) => {
            let trimmed = s.trim();
            let number = trimmed.strip_suffix('%').unwrap_or(trimmed);
            number.trim().parse().unwrap_or(0.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_precedence() {
        assert_eq!(classify("Revenue"), Kind::Currency);
        assert_eq!(classify("OMP_rev"), Kind::Currency);
        assert_eq!(classify("RPMO"), Kind::Rpmo);
        assert_eq!(classify("Revenue_rank"), Kind::Rank);
        assert_eq!(classify("Priority_Weight"), Kind::Percentage);
        assert_eq!(classify("SSP"), Kind::Plain);
    }

    #[test]
    fn currency_formatting() {
        assert_eq!(format_cell(&Value::Num(15000.0), Kind::Currency), "15.000 €");
        // At or above 10 rounds half away from zero, sub-unit cents dropped.
        assert_eq!(format_cell(&Value::Num(12000.5), Kind::Currency), "12.001 €");
        assert_eq!(format_cell(&Value::Num(9.47), Kind::Currency), "9,5 €");
    }

    #[test]
    fn negatives_keep_one_decimal_with_grouping() {
        // The ten-euro threshold is signed, so every negative value renders
        // with one decimal digit and grouped thousands.
        assert_eq!(format_cell(&Value::Num(-1234.0), Kind::Currency), "-1.234,0 €");
        assert_eq!(format_cell(&Value::Num(-15000.5), Kind::Currency), "-15.000,5 €");
        assert_eq!(format_cell(&Value::Num(-9.47), Kind::Currency), "-9,5 €");
        assert_eq!(format_cell(&Value::Num(-1234.0), Kind::Plain), "-1.234,0");
    }

    #[test]
    fn plain_numeric_formatting() {
        assert_eq!(format_cell(&Value::Num(1299.0), Kind::Plain), "1.299");
        assert_eq!(format_cell(&Value::Num(2.0), Kind::Plain), "2,0");
    }

    #[test]
    fn rank_and_rpmo_formatting() {
        assert_eq!(format_cell(&Value::Num(12000.6), Kind::Rank), "12001");
        assert_eq!(format_cell(&Value::Num(0.1875), Kind::Rpmo), "0,1875");
        assert_eq!(format_cell(&Value::Num(1.0), Kind::Rpmo), "1,0000");
    }

    #[test]
    fn empty_and_textual_cells_pass_through() {
        assert_eq!(format_cell(&Value::Missing, Kind::Currency), "");
        assert_eq!(format_cell(&Value::Str(String::new()), Kind::Currency), "");
        let na = Value::Str("n/a".to_string());
        assert_eq!(format_cell(&na, Kind::Currency), "n/a");
    }

    #[test]
    fn percentage_parsing() {
        assert_eq!(parse_percentage(&Value::Str("80%".to_string())), 80.0);
        assert_eq!(parse_percentage(&Value::Str("2.5".to_string())), 2.5);
        assert_eq!(parse_percentage(&Value::Str("abc".to_string())), 0.0);
        assert_eq!(parse_percentage(&Value::Num(33.0)), 33.0);
        assert_eq!(parse_percentage(&Value::Missing), 0.0);
    }

    #[test]
    fn thousands_grouping() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1.000");
        assert_eq!(group_thousands(1234567), "1.234.567");
        assert_eq!(group_thousands(-15000), "-15.000");
    }
}
