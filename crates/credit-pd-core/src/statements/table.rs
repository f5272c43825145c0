//! Raw statement tables and period/row lookup.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::types::Money;

/// Earliest and latest labels accepted as reporting years.
const MIN_YEAR: i64 = 1990;
const MAX_YEAR: i64 = 2100;

/// A single statement: first column holds row labels, every other column one
/// reporting period. Cells are kept as text exactly as loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementTable {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// The `(prev, cur)` pair of a statement line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodValues {
    pub prev: Option<Money>,
    pub cur: Option<Money>,
}

impl PeriodValues {
    pub const MISSING: PeriodValues = PeriodValues {
        prev: None,
        cur: None,
    };

    /// Absolute values of both periods.
    pub fn magnitude(self) -> PeriodValues {
        PeriodValues {
            prev: self.prev.map(|v| v.abs()),
            cur: self.cur.map(|v| v.abs()),
        }
    }
}

/// Column indices of the two comparison periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodColumns {
    pub prev: usize,
    pub cur: usize,
}

/// Anything the ratio extractor can read a statement from.
pub trait StatementSource {
    /// Ordered column labels, label column first.
    fn columns(&self) -> &[String];

    /// First row (in table order) whose label contains any of `aliases`,
    /// compared case-insensitively.
    fn find_row(&self, aliases: &[&str]) -> Option<&[String]>;
}

impl StatementSource for StatementTable {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn find_row(&self, aliases: &[&str]) -> Option<&[String]> {
        let needles: Vec<String> = aliases.iter().map(|a| a.to_lowercase()).collect();
        self.rows
            .iter()
            .find(|row| {
                row.first()
                    .map(|label| label_matches(label, &needles))
                    .unwrap_or(false)
            })
            .map(|row| row.as_slice())
    }
}

impl StatementTable {
    pub fn new(name: impl Into<String>, columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            name: name.into(),
            columns,
            rows,
        }
    }
}

fn label_matches(label: &str, needles: &[String]) -> bool {
    let label = label.to_lowercase();
    needles.iter().any(|n| label.contains(n.as_str()))
}

/// Parse a column label as a reporting year (`"2023"`, `" 2023 "`, `"2023.0"`).
pub fn parse_year(label: &str) -> Option<i64> {
    let value: f64 = label.trim().parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    let year = value.trunc() as i64;
    (MIN_YEAR..=MAX_YEAR).contains(&year).then_some(year)
}

/// Pick the two comparison periods of a statement.
///
/// The two most recent year-labelled columns win. With no year labels at all
/// the last two columns are taken positionally. A single year column, or fewer
/// than two data columns, leaves the statement without usable periods.
pub fn select_periods<S: StatementSource + ?Sized>(source: &S) -> Option<PeriodColumns> {
    let columns = source.columns();
    if columns.len() < 3 {
        return None;
    }

    let mut years: Vec<(i64, usize)> = columns
        .iter()
        .enumerate()
        .skip(1)
        .filter_map(|(idx, label)| parse_year(label).map(|y| (y, idx)))
        .collect();

    match years.len() {
        0 => Some(PeriodColumns {
            prev: columns.len() - 2,
            cur: columns.len() - 1,
        }),
        1 => None,
        n => {
            years.sort_by_key(|(year, _)| *year);
            Some(PeriodColumns {
                prev: years[n - 2].1,
                cur: years[n - 1].1,
            })
        }
    }
}

/// Parse a statement cell. Thousands separators and whitespace are stripped;
/// anything that still fails to parse is missing.
pub fn parse_amount(cell: &str) -> Option<Money> {
    let cleaned: String = cell
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .ok()
}

/// Resolve a concept's `(prev, cur)` values from a statement.
pub fn lookup<S: StatementSource + ?Sized>(
    source: &S,
    periods: Option<PeriodColumns>,
    aliases: &[&str],
) -> PeriodValues {
    let Some(periods) = periods else {
        return PeriodValues::MISSING;
    };
    let Some(row) = source.find_row(aliases) else {
        return PeriodValues::MISSING;
    };
    let cell = |idx: usize| row.get(idx).and_then(|c| parse_amount(c));
    PeriodValues {
        prev: cell(periods.prev),
        cur: cell(periods.cur),
    }
}
