use rayon::prelude::*;
use std::str::FromStr;
use tracing::trace;

use crate::dataset::Dataset;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Equals,
    NotEquals,
    Contains,
    StartsWith,
    EndsWith,
    GreaterThan,
    LessThan,
}

impl Operator {
    pub const ALL: [Operator; 7] = [
        Operator::Equals,
        Operator::NotEquals,
        Operator::Contains,
        Operator::StartsWith,
        Operator::EndsWith,
        Operator::GreaterThan,
        Operator::LessThan,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Operator::Equals => "equals",
            Operator::NotEquals => "not-equals",
            Operator::Contains => "contains",
            Operator::StartsWith => "starts-with",
            Operator::EndsWith => "ends-with",
            Operator::GreaterThan => "greater-than",
            Operator::LessThan => "less-than",
        }
    }
}

impl FromStr for Operator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operator::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| format!("unknown operator `{s}`"))
    }
}

/// One column/operator/value condition. A set of predicates combines with
/// logical AND; predicates live in UI state only and are never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterPredicate {
    pub column: String,
    pub operator: Operator,
    pub value: String,
}

impl FilterPredicate {
    /// Evaluates this predicate against one row. Both sides compare as
    /// lower-cased strings; a missing field reads as the empty string. The
    /// numeric operators coerce both sides to numbers and evaluate to false
    /// whenever either side does not parse.
    fn matches(&self, data: &Dataset, row: usize) -> bool {
        let cell = data.get(row, &self.column).raw().to_lowercase();
        let wanted = self.value.to_lowercase();
        match self.operator {
            Operator::Equals => cell == wanted,
            Operator::NotEquals => cell != wanted,
            Operator::Contains => cell.contains(&wanted),
            Operator::StartsWith => cell.starts_with(&wanted),
            Operator::EndsWith => cell.ends_with(&wanted),
            Operator::GreaterThan => match (cell.parse::<f64>(), wanted.parse::<f64>()) {
                (Ok(a), Ok(b)) => a > b,
                _ => false,
            },
            Operator::LessThan => match (cell.parse::<f64>(), wanted.parse::<f64>()) {
                (Ok(a), Ok(b)) => a < b,
                _ => false,
            },
        }
    }
}

fn matches_search(data: &Dataset, row: usize, term_lower: &str) -> bool {
    data.headers()
        .iter()
        .any(|column| data.get(row, column).raw().to_lowercase().contains(term_lower))
}

/// Produces the visible row subset: a row survives if it matches the free
/// text search (any field, case-insensitive substring) AND every predicate.
/// Returns indices into the base dataset; the base is never mutated.
pub fn apply(data: &Dataset, predicates: &[FilterPredicate], search_term: &str) -> Vec<usize> {
    let term_lower = search_term.trim().to_lowercase();
    let kept: Vec<usize> = (0..data.len())
        .into_par_iter()
        .filter(|&row| {
            (term_lower.is_empty() || matches_search(data, row, &term_lower))
                && predicates.iter().all(|p| p.matches(data, row))
        })
        .collect();
    trace!(
        "Filter kept {}/{} rows ({} predicates, search: {:?})",
        kept.len(),
        data.len(),
        predicates.len(),
        search_term
    );
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prices() -> Dataset {
        Dataset::from_csv("name,price\nalpha,50\nbeta,150\ngamma,abc\n")
    }

    fn predicate(column: &str, operator: Operator, value: &str) -> FilterPredicate {
        FilterPredicate {
            column: column.to_string(),
            operator,
            value: value.to_string(),
        }
    }

    #[test]
    fn greater_than_skips_non_numeric() {
        let data = prices();
        let kept = apply(
            &data,
            &[predicate("price", Operator::GreaterThan, "100")],
            "",
        );
        assert_eq!(kept, vec![1]);
    }

    #[test]
    fn non_numeric_filter_value_matches_nothing() {
        let data = prices();
        let kept = apply(&data, &[predicate("price", Operator::LessThan, "cheap")], "");
        assert!(kept.is_empty());
    }

    #[test]
    fn predicates_combine_with_and() {
        let data = prices();
        let kept = apply(
            &data,
            &[
                predicate("name", Operator::Contains, "a"),
                predicate("price", Operator::Equals, "50"),
            ],
            "",
        );
        assert_eq!(kept, vec![0]);
    }

    #[test]
    fn search_is_case_insensitive_and_spans_all_fields() {
        let data = prices();
        assert_eq!(apply(&data, &[], "BETA"), vec![1]);
        assert_eq!(apply(&data, &[], "150"), vec![1]);
        assert_eq!(apply(&data, &[], ""), vec![0, 1, 2]);
        assert!(apply(&data, &[], "zzz").is_empty());
    }

    #[test]
    fn search_and_predicates_intersect() {
        let data = prices();
        let kept = apply(&data, &[predicate("name", Operator::StartsWith, "g")], "a");
        assert_eq!(kept, vec![2]);
    }

    #[test]
    fn string_operators() {
        let data = prices();
        assert_eq!(
            apply(&data, &[predicate("name", Operator::EndsWith, "MA")], ""),
            vec![2]
        );
        assert_eq!(
            apply(&data, &[predicate("name", Operator::NotEquals, "alpha")], ""),
            vec![1, 2]
        );
    }

    #[test]
    fn missing_field_compares_as_empty_string() {
        let data = Dataset::from_csv("a,b\n1\n2,x\n");
        let kept = apply(&data, &[predicate("b", Operator::Equals, "")], "");
        assert_eq!(kept, vec![0]);
    }

    #[test]
    fn filter_is_idempotent() {
        let data = prices();
        let preds = [predicate("price", Operator::GreaterThan, "10")];
        let once = apply(&data, &preds, "");
        // Re-filtering the kept subset keeps every row of it.
        let again: Vec<usize> = once
            .iter()
            .copied()
            .filter(|&row| preds.iter().all(|p| p.matches(&data, row)))
            .collect();
        assert_eq!(once, again);
    }

    #[test]
    fn operator_round_trip() {
        for op in Operator::ALL {
            assert_eq!(op.as_str().parse::<Operator>().unwrap(), op);
        }
        assert!("between".parse::<Operator>().is_err());
    }
}
