//! Disabled recipients of basic livelihood security and near-poverty
//! support, per province and year.
//!
//! The source has one row per `(년도, 시도)` and one column per recipient
//! group. The national series is the per-year sum over provinces.

use anyhow::{anyhow, Context, Result};
use std::{collections::BTreeMap, path::Path};
use tracing::{debug, info, instrument};

use crate::region::normalize_region_name;
use crate::table::{utils::parse_number, RawTable};

pub const YEAR_COLUMN: &str = "년도";
pub const PROVINCE_COLUMN: &str = "시도";

pub const BASIC_GENERAL: &str = "기초생활수급자 수급자-일반";
pub const BASIC_SEVERE: &str = "기초생활수급자 수급자-중증";
pub const NEAR_POVERTY_GENERAL: &str = "차상위계층 수급자-일반";
pub const NEAR_POVERTY_EXCESS: &str = "차상위초과";

/// Recipient groups, in display order.
pub const WELFARE_METRICS: [&str; 4] = [
    BASIC_GENERAL,
    BASIC_SEVERE,
    NEAR_POVERTY_GENERAL,
    NEAR_POVERTY_EXCESS,
];

#[derive(Debug, Clone, PartialEq)]
pub struct WelfareRecord {
    pub province: String,
    pub year: i32,
    /// Indexed like [`WELFARE_METRICS`]; `None` for blank or `-` cells.
    pub values: [Option<f64>; 4],
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WelfareTable {
    records: Vec<WelfareRecord>,
    /// Which of [`WELFARE_METRICS`] the source has a column for.
    present: [bool; 4],
}

fn metric_index(metric: &str) -> Option<usize> {
    WELFARE_METRICS.iter().position(|m| *m == metric)
}

impl WelfareTable {
    #[instrument(level = "info", skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = RawTable::from_csv_path(path.as_ref())?;
        let table = Self::from_raw(raw)
            .with_context(|| format!("reading welfare table {}", path.as_ref().display()))?;
        info!(records = table.records.len(), "loaded welfare recipients");
        Ok(table)
    }

    /// Row 0 is the header. Header cells are trimmed, so ` 차상위초과`
    /// matches too.
    pub fn from_raw(raw: RawTable) -> Result<Self> {
        let table = raw.into_table(0)?;
        let year_col = table
            .column_index(YEAR_COLUMN)
            .ok_or_else(|| anyhow!("column '{}' not found", YEAR_COLUMN))?;
        let province_col = table
            .column_index(PROVINCE_COLUMN)
            .ok_or_else(|| anyhow!("column '{}' not found", PROVINCE_COLUMN))?;
        let metric_cols: Vec<Option<usize>> = WELFARE_METRICS
            .iter()
            .map(|m| table.column_index(m))
            .collect();
        if metric_cols.iter().all(Option::is_none) {
            return Err(anyhow!("no recipient columns found"));
        }

        let mut records = Vec::with_capacity(table.num_rows());
        for (idx, row) in table.rows().iter().enumerate() {
            let year = parse_number(&row[year_col])
                .filter(|y| y.fract() == 0.0)
                .ok_or_else(|| anyhow!("row {}: year '{}' is not an integer", idx, row[year_col]))?;
            let mut values = [None; 4];
            for (slot, col) in values.iter_mut().zip(&metric_cols) {
                *slot = col.and_then(|c| parse_number(&row[c]));
            }
            records.push(WelfareRecord {
                province: normalize_region_name(&row[province_col]),
                year: year as i32,
                values,
            });
        }

        let mut present = [false; 4];
        for (flag, col) in present.iter_mut().zip(&metric_cols) {
            *flag = col.is_some();
        }
        debug!(?present, "welfare columns");
        Ok(Self { records, present })
    }

    pub fn records(&self) -> &[WelfareRecord] {
        &self.records
    }

    pub fn has_metric(&self, metric: &str) -> bool {
        metric_index(metric).map_or(false, |i| self.present[i])
    }

    /// Provinces in order of first appearance.
    pub fn provinces(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for r in &self.records {
            if !seen.contains(&r.province.as_str()) {
                seen.push(r.province.as_str());
            }
        }
        seen
    }

    /// Per-year sum over every province; blank cells count as nothing.
    pub fn national_series(&self, metric: &str) -> Option<Vec<(i32, f64)>> {
        let idx = metric_index(metric).filter(|i| self.present[*i])?;
        let mut by_year: BTreeMap<i32, f64> = BTreeMap::new();
        for r in &self.records {
            *by_year.entry(r.year).or_default() += r.values[idx].unwrap_or(0.0);
        }
        Some(by_year.into_iter().collect())
    }

    /// One province's values by year; years with a blank cell are left out.
    pub fn province_series(&self, province: &str, metric: &str) -> Option<Vec<(i32, f64)>> {
        let idx = metric_index(metric).filter(|i| self.present[*i])?;
        let province = normalize_region_name(province);
        let by_year: BTreeMap<i32, f64> = self
            .records
            .iter()
            .filter(|r| r.province == province)
            .filter_map(|r| r.values[idx].map(|v| (r.year, v)))
            .collect();
        Some(by_year.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{fs, io::Cursor};
    use tempfile::tempdir;

    const CSV: &str = "\
년도,시도,기초생활수급자 수급자-일반,기초생활수급자 수급자-중증,차상위계층 수급자-일반, 차상위초과
2020,서울특별시,\"1,000\",500,300,20
2020,강원도,400,200,100,-
2021,서울특별시,1100,520,310,25
2021,강원특별자치도,420,210,110,5
";

    #[test]
    fn national_series_sums_provinces() -> Result<()> {
        let t = WelfareTable::from_raw(RawTable::from_csv_reader(Cursor::new(CSV))?)?;
        assert_eq!(t.records().len(), 4);
        assert_eq!(t.national_series(BASIC_GENERAL), Some(vec![(2020, 1400.0), (2021, 1520.0)]));
        assert_eq!(t.national_series(NEAR_POVERTY_EXCESS), Some(vec![(2020, 20.0), (2021, 30.0)]));
        assert_eq!(t.national_series("없는 항목"), None);
        Ok(())
    }

    #[test]
    fn province_series_follows_renamed_provinces() -> Result<()> {
        let t = WelfareTable::from_raw(RawTable::from_csv_reader(Cursor::new(CSV))?)?;
        assert_eq!(t.provinces(), vec!["서울특별시", "강원도"]);
        assert_eq!(
            t.province_series("강원특별자치도", BASIC_SEVERE),
            Some(vec![(2020, 200.0), (2021, 210.0)])
        );
        assert_eq!(t.province_series("강원도", NEAR_POVERTY_EXCESS), Some(vec![(2021, 5.0)]));
        assert_eq!(t.province_series("부산광역시", BASIC_SEVERE), Some(vec![]));
        Ok(())
    }

    #[test]
    fn missing_columns_and_bad_years() -> Result<()> {
        let t = WelfareTable::from_raw(RawTable::from_csv_reader(Cursor::new(
            "년도,시도,차상위초과\n2020,서울특별시,3\n",
        ))?)?;
        assert!(t.has_metric(NEAR_POVERTY_EXCESS));
        assert!(!t.has_metric(BASIC_GENERAL));
        assert_eq!(t.national_series(BASIC_GENERAL), None);

        let no_metrics = RawTable::from_csv_reader(Cursor::new("년도,시도\n2020,서울특별시\n"))?;
        assert!(WelfareTable::from_raw(no_metrics).is_err());

        let bad_year = RawTable::from_csv_reader(Cursor::new("년도,시도,차상위초과\n이천,서울특별시,3\n"))?;
        assert!(WelfareTable::from_raw(bad_year).is_err());
        Ok(())
    }

    #[test]
    fn reads_from_disk() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("Disability_Assistance.csv");
        fs::write(&path, CSV)?;
        let t = WelfareTable::from_csv_path(&path)?;
        assert_eq!(t.provinces().len(), 2);
        assert!(WelfareTable::from_csv_path(dir.path().join("missing.csv")).is_err());
        Ok(())
    }
}
