//! Registered disabled population by region, gender, disability type and year.
//!
//! The source is wide: `시도별, 성별, 장애유형별, <year>, <year>, ...`.
//! `성별 = 계` totals over genders, `장애유형별 = 합계` totals over types and
//! `시도별 = 전국` is the national aggregate.

use anyhow::{anyhow, Context, Result};
use std::{
    collections::{BTreeMap, HashMap},
    path::Path,
};
use tracing::{info, instrument, warn};

use crate::region::{normalize_region_name, NATIONAL};
use crate::table::{utils::parse_number, RawTable};

pub const TOTAL_GENDER: &str = "계";
pub const TOTAL_TYPE: &str = "합계";

const ID_COLUMNS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopulationRecord {
    pub region: String,
    pub gender: String,
    pub disability_type: String,
    pub year: i32,
    pub count: u64,
}

/// `전국` compared with the sum of the regions for one cell of the cube.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsistencyDrift {
    pub gender: String,
    pub disability_type: String,
    pub year: i32,
    pub national: u64,
    pub regional_sum: u64,
}

impl ConsistencyDrift {
    pub fn difference(&self) -> i64 {
        self.national as i64 - self.regional_sum as i64
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PopulationTable {
    records: Vec<PopulationRecord>,
    years: Vec<i32>,
}

fn parse_count(cell: &str) -> Option<u64> {
    let trimmed = cell.trim();
    if trimmed.is_empty() || trimmed == "-" {
        return Some(0);
    }
    let v = parse_number(trimmed)?;
    (v >= 0.0 && v.fract() == 0.0).then_some(v as u64)
}

impl PopulationTable {
    #[instrument(level = "info", skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = RawTable::from_csv_path(path.as_ref())?;
        let table = Self::from_raw(&raw)
            .with_context(|| format!("reading population table {}", path.as_ref().display()))?;
        info!(records = table.records.len(), years = table.years.len(), "loaded population");
        Ok(table)
    }

    /// Row 0 is the header; `-` and blank counts read as 0, every other
    /// count must be a non-negative integer.
    pub fn from_raw(raw: &RawTable) -> Result<Self> {
        let header = raw.rows.first().ok_or_else(|| anyhow!("population sheet is empty"))?;
        if header.len() <= ID_COLUMNS {
            return Err(anyhow!(
                "expected {} id columns followed by years, found {} columns",
                ID_COLUMNS,
                header.len()
            ));
        }
        let years = header[ID_COLUMNS..]
            .iter()
            .map(|h| {
                h.trim()
                    .parse::<i32>()
                    .map_err(|_| anyhow!("year column '{}' is not an integer", h))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut records = Vec::new();
        for (idx, row) in raw.rows.iter().enumerate().skip(1) {
            if row.iter().all(|c| c.trim().is_empty()) {
                continue;
            }
            let id = |col: usize| row.get(col).map(|c| c.trim().to_string()).unwrap_or_default();
            let (region, gender, disability_type) = (id(0), id(1), id(2));
            for (offset, year) in years.iter().enumerate() {
                let cell = row.get(ID_COLUMNS + offset).map(String::as_str).unwrap_or("");
                let count = parse_count(cell).ok_or_else(|| {
                    anyhow!("row {} year {}: '{}' is not an integer count", idx, year, cell)
                })?;
                records.push(PopulationRecord {
                    region: region.clone(),
                    gender: gender.clone(),
                    disability_type: disability_type.clone(),
                    year: *year,
                    count,
                });
            }
        }

        let mut sorted_years = years;
        sorted_years.sort_unstable();
        sorted_years.dedup();
        Ok(Self {
            records,
            years: sorted_years,
        })
    }

    pub fn records(&self) -> &[PopulationRecord] {
        &self.records
    }

    /// Years present in the header, ascending.
    pub fn years(&self) -> &[i32] {
        &self.years
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn select<'a, F>(&'a self, keep: F) -> impl Iterator<Item = &'a PopulationRecord>
    where
        F: Fn(&PopulationRecord) -> bool + 'a,
    {
        self.records.iter().filter(move |r| keep(*r))
    }

    /// National total over genders and types, per year.
    pub fn national_trend(&self) -> Vec<(i32, u64)> {
        let mut by_year: BTreeMap<i32, u64> = BTreeMap::new();
        for r in self.select(|r| {
            r.region == NATIONAL && r.gender == TOTAL_GENDER && r.disability_type == TOTAL_TYPE
        }) {
            *by_year.entry(r.year).or_default() += r.count;
        }
        by_year.into_iter().collect()
    }

    /// National total over types, per gender (excluding `계`) and year.
    pub fn gender_trend(&self) -> BTreeMap<String, Vec<(i32, u64)>> {
        let mut out: BTreeMap<String, BTreeMap<i32, u64>> = BTreeMap::new();
        for r in self.select(|r| {
            r.region == NATIONAL && r.disability_type == TOTAL_TYPE && r.gender != TOTAL_GENDER
        }) {
            *out.entry(r.gender.clone()).or_default().entry(r.year).or_default() += r.count;
        }
        out.into_iter()
            .map(|(g, years)| (g, years.into_iter().collect()))
            .collect()
    }

    /// National count per disability type (excluding `합계`) for one year.
    pub fn type_counts(&self, year: i32) -> Vec<(String, u64)> {
        self.select(move |r| {
            r.year == year
                && r.region == NATIONAL
                && r.gender == TOTAL_GENDER
                && r.disability_type != TOTAL_TYPE
        })
        .map(|r| (r.disability_type.clone(), r.count))
        .collect()
    }

    /// Total per region (excluding `전국`) for one year, names normalised.
    pub fn regional_totals(&self, year: i32) -> Vec<(String, u64)> {
        self.select(move |r| {
            r.year == year
                && r.region != NATIONAL
                && r.gender == TOTAL_GENDER
                && r.disability_type == TOTAL_TYPE
        })
        .map(|r| (normalize_region_name(&r.region), r.count))
        .collect()
    }

    /// Compare every `전국` cell with the sum of the regional cells that
    /// share its gender, type and year. Drifts are logged and returned,
    /// never corrected.
    pub fn check_national_consistency(&self) -> Vec<ConsistencyDrift> {
        type Key = (String, String, i32);
        let mut national: HashMap<Key, u64> = HashMap::new();
        let mut regional: HashMap<Key, u64> = HashMap::new();
        for r in &self.records {
            let key = (r.gender.clone(), r.disability_type.clone(), r.year);
            let slot = if r.region == NATIONAL {
                national.entry(key)
            } else {
                regional.entry(key)
            };
            *slot.or_default() += r.count;
        }

        let mut drifts: Vec<ConsistencyDrift> = national
            .into_iter()
            .filter_map(|((gender, disability_type, year), national)| {
                let regional_sum = regional
                    .get(&(gender.clone(), disability_type.clone(), year))
                    .copied()
                    .unwrap_or(0);
                (national != regional_sum).then_some(ConsistencyDrift {
                    gender,
                    disability_type,
                    year,
                    national,
                    regional_sum,
                })
            })
            .collect();
        drifts.sort_by(|a, b| {
            (a.year, &a.gender, &a.disability_type).cmp(&(b.year, &b.gender, &b.disability_type))
        });

        for d in &drifts {
            warn!(
                year = d.year,
                gender = %d.gender,
                disability_type = %d.disability_type,
                national = d.national,
                regional_sum = d.regional_sum,
                "national row disagrees with regional sum"
            );
        }
        drifts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const CSV: &str = "\
시도별,성별,장애유형별,2022,2023
전국,계,합계,\"1,000\",1100
전국,계,지체,600,650
전국,계,시각,400,450
전국,남자,합계,550,600
전국,여자,합계,450,500
서울특별시,계,합계,300,-
강원특별자치도,계,합계,700,1000
";

    fn table() -> PopulationTable {
        let raw = RawTable::from_csv_reader(std::io::Cursor::new(CSV)).unwrap();
        PopulationTable::from_raw(&raw).unwrap()
    }

    #[test]
    fn loads_wide_csv_with_placeholders() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("pop.csv");
        fs::write(&path, CSV)?;
        let t = PopulationTable::from_csv_path(&path)?;
        assert_eq!(t.years(), &[2022, 2023]);
        assert_eq!(t.records().len(), 14);
        let seoul_2023 = t
            .records()
            .iter()
            .find(|r| r.region == "서울특별시" && r.year == 2023)
            .map(|r| r.count);
        assert_eq!(seoul_2023, Some(0));
        Ok(())
    }

    #[test]
    fn non_integer_counts_and_years_are_rejected() {
        let raw = RawTable::from_csv_reader(std::io::Cursor::new(
            "시도별,성별,장애유형별,2022\n전국,계,합계,12.5\n",
        ))
        .unwrap();
        assert!(PopulationTable::from_raw(&raw).is_err());

        let raw = RawTable::from_csv_reader(std::io::Cursor::new(
            "시도별,성별,장애유형별,연도\n전국,계,합계,1\n",
        ))
        .unwrap();
        assert!(PopulationTable::from_raw(&raw).is_err());
    }

    #[test]
    fn trends_and_breakdowns() {
        let t = table();
        assert_eq!(t.national_trend(), vec![(2022, 1000), (2023, 1100)]);

        let genders = t.gender_trend();
        assert_eq!(genders.keys().collect::<Vec<_>>(), vec!["남자", "여자"]);
        assert_eq!(genders["여자"], vec![(2022, 450), (2023, 500)]);

        assert_eq!(
            t.type_counts(2023),
            vec![("지체".to_string(), 650), ("시각".to_string(), 450)]
        );
        assert_eq!(
            t.regional_totals(2022),
            vec![("서울특별시".to_string(), 300), ("강원도".to_string(), 700)]
        );
    }

    #[test]
    fn consistency_reports_only_drifting_cells() {
        let drifts = table().check_national_consistency();
        let total_2022 = drifts
            .iter()
            .find(|d| d.year == 2022 && d.gender == "계" && d.disability_type == "합계");
        assert!(total_2022.is_none());

        let total_2023 = drifts
            .iter()
            .find(|d| d.year == 2023 && d.gender == "계" && d.disability_type == "합계")
            .unwrap();
        assert_eq!(total_2023.national, 1100);
        assert_eq!(total_2023.regional_sum, 1000);
        assert_eq!(total_2023.difference(), 100);

        // no regional breakdown by type, so every national type cell drifts
        assert!(drifts.iter().any(|d| d.disability_type == "지체" && d.regional_sum == 0));
    }
}
