//! Chart descriptions. A chart is a pure function from loaded data and a few
//! runtime parameters to a serialisable [`ChartSpec`]; drawing it is left to
//! whatever consumes the JSON.

pub mod employment;
pub mod facility;
pub mod page;
pub mod population;
pub mod welfare;

use serde::Serialize;
use std::{collections::BTreeMap, fmt};

use crate::aggregate::{other::validate_threshold, DEFAULT_THRESHOLD_PCT};
use crate::resolve::ColumnResolver;
use crate::table::Table;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Line,
    Bar,
    Pie,
    Treemap,
    Choropleth,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Point {
    pub label: String,
    pub value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// `[lat, lon]` for map markers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<[f64; 2]>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, f64>,
}

impl Point {
    pub fn new(label: impl Into<String>, value: f64) -> Self {
        Self {
            label: label.into(),
            value,
            detail: None,
            position: None,
            extra: BTreeMap::new(),
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_extra(mut self, key: &str, value: f64) -> Self {
        self.extra.insert(key.to_string(), value);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub name: String,
    pub points: Vec<Point>,
}

impl Series {
    pub fn new(name: impl Into<String>, points: Vec<Point>) -> Self {
        Self {
            name: name.into(),
            points,
        }
    }
}

/// One step of an animated chart, named after its period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame {
    pub name: String,
    pub series: Vec<Series>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub title: String,
    pub series: Vec<Series>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub frames: Vec<Frame>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

impl ChartSpec {
    pub fn new(kind: ChartKind, title: impl Into<String>, series: Vec<Series>) -> Self {
        Self {
            kind,
            title: title.into(),
            series,
            frames: Vec::new(),
            notes: Vec::new(),
        }
    }
}

/// Why a chart has nothing to show. The page skips it and says why.
#[derive(Debug, Clone, PartialEq)]
pub enum EmptyReason {
    /// `year` is `None` when the metric exists for no year at all.
    MissingColumn { metric: String, year: Option<i32> },
    NoRows,
    MissingDataset(String),
    InvalidParameter(String),
}

impl fmt::Display for EmptyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmptyReason::MissingColumn {
                metric,
                year: Some(year),
            } => write!(f, "no column for '{}' in {}", metric, year),
            EmptyReason::MissingColumn { metric, year: None } => {
                write!(f, "no column for '{}' in any year", metric)
            }
            EmptyReason::NoRows => write!(f, "no data rows"),
            EmptyReason::MissingDataset(name) => write!(f, "dataset '{}' unavailable", name),
            EmptyReason::InvalidParameter(msg) => write!(f, "invalid parameter: {}", msg),
        }
    }
}

impl std::error::Error for EmptyReason {}

/// Runtime knobs shared by every chart.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartParams {
    /// Selected year; the latest available one when `None`.
    pub year: Option<i32>,
    pub other_threshold_pct: f64,
    /// Selected province for per-region charts; `전국` when `None`.
    pub region: Option<String>,
}

impl Default for ChartParams {
    fn default() -> Self {
        Self {
            year: None,
            other_threshold_pct: DEFAULT_THRESHOLD_PCT,
            region: None,
        }
    }
}

impl ChartParams {
    pub fn new(year: Option<i32>, other_threshold_pct: f64) -> anyhow::Result<Self> {
        Ok(Self {
            year,
            other_threshold_pct: validate_threshold(other_threshold_pct)?,
            region: None,
        })
    }

    pub fn with_region(mut self, region: Option<String>) -> Self {
        self.region = region;
        self
    }
}

pub trait ParameterizedChart {
    type Input: ?Sized;

    /// Stable identifier, used in logs and in the CLI output.
    fn id(&self) -> &str;

    fn render(&self, input: &Self::Input, params: &ChartParams) -> Result<ChartSpec, EmptyReason>;
}

/// `params.year`, or the latest year in which `metric` resolves.
pub(crate) fn pick_year(
    resolver: &ColumnResolver,
    table: &Table,
    metric: &str,
    params: &ChartParams,
) -> Result<i32, EmptyReason> {
    match params.year {
        Some(year) => Ok(year),
        None => resolver
            .available_years(table, metric)
            .last()
            .copied()
            .ok_or_else(|| EmptyReason::MissingColumn {
                metric: metric.to_string(),
                year: None,
            }),
    }
}

pub(crate) fn resolve_or_empty(
    resolver: &ColumnResolver,
    table: &Table,
    metric: &str,
    year: i32,
) -> Result<String, EmptyReason> {
    resolver
        .resolve(table, metric, year)
        .ok_or_else(|| EmptyReason::MissingColumn {
            metric: metric.to_string(),
            year: Some(year),
        })
}

/// `1234567` → `1,234,567`; fractions are rounded away.
pub fn format_count(v: f64) -> String {
    let n = v.round() as i64;
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if n < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
