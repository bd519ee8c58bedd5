use std::cmp::Ordering;
use tracing::trace;

use crate::dataset::Dataset;
use crate::kind::{self, Kind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn toggled(self) -> Self {
        match self {
            Direction::Asc => Direction::Desc,
            Direction::Desc => Direction::Asc,
        }
    }
}

/// The single active sort: re-selecting the same column toggles direction,
/// selecting a new one replaces it entirely (no secondary sort).
#[derive(Debug, Clone, PartialEq)]
pub struct SortSpec {
    pub column: String,
    pub direction: Direction,
}

/// How one column compares. Decided once per sort, never per pair, so the
/// ordering stays total: a single non-numeric cell switches the whole
/// column to string compare instead of mixing comparators between pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Comparator {
    Percentage,
    Numeric,
    Text,
}

/// Orders a view of row indices by one column. Percentage columns compare
/// on the parsed percentage value; a column whose present cells are all
/// numeric compares numerically; everything else falls back to a case
/// insensitive string compare. `Desc` is the exact inverse of `Asc` over
/// the same comparator. Rows with a missing cell always sort last,
/// regardless of direction, keeping their relative order.
pub fn apply(data: &Dataset, view: &[usize], spec: Option<&SortSpec>) -> Vec<usize> {
    let Some(spec) = spec else {
        return view.to_vec();
    };
    let mut present: Vec<usize> = Vec::with_capacity(view.len());
    let mut missing: Vec<usize> = Vec::new();
    for &row in view {
        if data.get(row, &spec.column).is_missing() {
            missing.push(row);
        } else {
            present.push(row);
        }
    }

    let comparator = column_comparator(data, &present, &spec.column);

    // Stable sort, so equal keys keep the incoming order.
    present.sort_by(|&a, &b| {
        let ordering = compare(data, a, b, &spec.column, comparator);
        match spec.direction {
            Direction::Asc => ordering,
            Direction::Desc => ordering.reverse(),
        }
    });

    present.extend(missing);
    trace!(
        "Sorted {} rows by {} {:?} ({:?})",
        present.len(),
        spec.column,
        spec.direction,
        comparator
    );
    present
}

fn column_comparator(data: &Dataset, rows: &[usize], column: &str) -> Comparator {
    if kind::classify(column) == Kind::Percentage {
        return Comparator::Percentage;
    }
    let all_numeric = rows
        .iter()
        .all(|&row| data.get(row, column).as_number().is_some());
    if all_numeric {
        Comparator::Numeric
    } else {
        Comparator::Text
    }
}

fn compare(data: &Dataset, a: usize, b: usize, column: &str, comparator: Comparator) -> Ordering {
    let left = data.get(a, column);
    let right = data.get(b, column);

    match comparator {
        Comparator::Percentage => {
            let l = kind::parse_percentage(left);
            let r = kind::parse_percentage(right);
            l.partial_cmp(&r).unwrap_or(Ordering::Equal)
        }
        Comparator::Numeric => {
            let l = left.as_number().unwrap_or(f64::NAN);
            let r = right.as_number().unwrap_or(f64::NAN);
            l.partial_cmp(&r).unwrap_or(Ordering::Equal)
        }
        Comparator::Text => left.raw().to_lowercase().cmp(&right.raw().to_lowercase()),
    }
}
