//! Locating the column that holds a metric for a given year.
//!
//! Processed employment tables name their columns `<period>_<metric>`, where
//! the period is either a full year (`2019`) or a half-year (`2023.1/2`,
//! `2023.2/2`). Later surveys publish two half-years, earlier ones one
//! annual figure, and the oldest education extract has no period at all.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

use crate::table::Table;

/// Year whose education extract carries bare metric names.
pub const LEGACY_BARE_YEAR: i32 = 2008;

static PERIOD_COLUMN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{4})(?:\.([12])/2)?_(.+)$").expect("period column pattern is valid")
});

/// The naming conventions, in the order they are tried.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ColumnScheme {
    SecondHalf,
    FirstHalf,
    FullYear,
    Bare,
}

impl ColumnScheme {
    pub fn column_name(&self, metric: &str, year: i32) -> String {
        match self {
            ColumnScheme::SecondHalf => format!("{}.2/2_{}", year, metric),
            ColumnScheme::FirstHalf => format!("{}.1/2_{}", year, metric),
            ColumnScheme::FullYear => format!("{}_{}", year, metric),
            ColumnScheme::Bare => metric.to_string(),
        }
    }
}

/// Resolves `(metric, year)` to a column id by fixed priority:
/// second half, first half, full year, then (for the legacy extract only)
/// the bare metric name.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ColumnResolver {
    bare_year: Option<i32>,
}

impl ColumnResolver {
    /// Half-year and full-year schemes only.
    pub fn standard() -> Self {
        Self { bare_year: None }
    }

    /// Also accept the bare metric name when the year is [`LEGACY_BARE_YEAR`].
    pub fn with_legacy_bare_year() -> Self {
        Self {
            bare_year: Some(LEGACY_BARE_YEAR),
        }
    }

    fn schemes(&self, year: i32) -> impl Iterator<Item = ColumnScheme> {
        let bare = (self.bare_year == Some(year)).then_some(ColumnScheme::Bare);
        [
            ColumnScheme::SecondHalf,
            ColumnScheme::FirstHalf,
            ColumnScheme::FullYear,
        ]
        .into_iter()
        .chain(bare)
    }

    /// First candidate present among `columns`, or `None`.
    pub fn resolve_in<S: AsRef<str>>(&self, columns: &[S], metric: &str, year: i32) -> Option<String> {
        self.schemes(year)
            .map(|scheme| scheme.column_name(metric, year))
            .find(|candidate| columns.iter().any(|c| c.as_ref() == candidate))
    }

    pub fn resolve(&self, table: &Table, metric: &str, year: i32) -> Option<String> {
        self.resolve_in(table.columns(), metric, year)
    }

    /// Every year for which `metric` resolves, ascending.
    pub fn available_years(&self, table: &Table, metric: &str) -> Vec<i32> {
        let mut years: BTreeSet<i32> = table
            .columns()
            .iter()
            .filter_map(|c| PERIOD_COLUMN.captures(c))
            .filter(|caps| &caps[3] == metric)
            .filter_map(|caps| caps[1].parse().ok())
            .collect();
        if let Some(bare) = self.bare_year {
            if table.has_column(metric) {
                years.insert(bare);
            }
        }
        years.into_iter().collect()
    }
}

/// Resolve with the standard schemes.
pub fn resolve_column(table: &Table, metric: &str, year: i32) -> Option<String> {
    ColumnResolver::standard().resolve(table, metric, year)
}
