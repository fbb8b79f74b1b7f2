//! Reading every source the charts need.

pub mod geo;

use anyhow::{anyhow, Context, Result};
use glob::glob;
use reqwest::Client;
use std::{
    collections::BTreeMap,
    path::Path,
    time::Duration,
};
use tracing::{info, instrument, warn};

use crate::aggregate::FacilityRecord;
use crate::config::Config;
use crate::population::{PopulationTable, TOTAL_TYPE};
use crate::preprocess::PROCESSED_PREFIX;
use crate::region::{district_key, normalize_region_name, RegionCatalog, NATIONAL, SUBTOTAL};
use crate::table::{parquet::read_table, utils::parse_number, RawTable, Table};
use crate::welfare::WelfareTable;

pub use geo::{Feature, FeatureCollection, GeoCache, GeoLayer};

/// Column holding the disability type in the province population extract.
const PROVINCE_TYPE_COLUMN: &str = "장애유형별(1)";

/// Registered disabled population of one district.
#[derive(Debug, Clone, PartialEq)]
pub struct DistrictPopulation {
    pub province: String,
    pub district: String,
    pub population: f64,
}

impl DistrictPopulation {
    /// `"<province> <district>"`, normalised.
    pub fn key(&self) -> String {
        district_key(&self.province, &self.district)
    }
}

/// Everything loaded from disk. Each source is independent: a failed one
/// only disables the charts built on it.
#[derive(Debug)]
pub struct Datasets {
    pub tables: Result<BTreeMap<String, Table>>,
    pub population: Result<PopulationTable>,
    pub province_population: Result<Vec<(String, f64)>>,
    pub district_population: Result<Vec<DistrictPopulation>>,
    pub day_care_facilities: Result<Vec<FacilityRecord>>,
    pub welfare_centers: Result<Vec<FacilityRecord>>,
    pub welfare_recipients: Result<WelfareTable>,
    pub catalog: RegionCatalog,
}

impl Datasets {
    /// A processed table by key, e.g. `disable_age`.
    pub fn table(&self, key: &str) -> Option<&Table> {
        self.tables.as_ref().ok().and_then(|t| t.get(key))
    }
}

/// Owns the configuration and HTTP client; loads once and keeps the
/// result until [`DataLoader::reload`] is called.
pub struct DataLoader {
    config: Config,
    geo: GeoCache,
    current: Option<Datasets>,
}

impl DataLoader {
    pub fn new(config: Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("building http client")?;
        let geo = GeoCache::new(client, &config.data_dir, config.geo.clone());
        Ok(Self {
            config,
            geo,
            current: None,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn geo(&self) -> &GeoCache {
        &self.geo
    }

    /// Loaded datasets, reading them on first use. Fails only when the
    /// region catalog cannot be read.
    pub fn load(&mut self) -> Result<&Datasets> {
        if self.current.is_none() {
            self.current = Some(self.read_all()?);
        }
        self.current
            .as_ref()
            .ok_or_else(|| anyhow!("datasets not loaded"))
    }

    /// Drop what was loaded and read everything again.
    pub fn reload(&mut self) -> Result<&Datasets> {
        info!("reloading datasets");
        self.current = None;
        self.load()
    }

    fn read_all(&self) -> Result<Datasets> {
        let cfg = &self.config;
        let catalog = RegionCatalog::load(cfg.region_catalog.as_deref())?;
        let datasets = Datasets {
            tables: load_processed_tables(&cfg.results_dir),
            population: load_population(cfg.data_file(&cfg.files.population)),
            province_population: load_province_population(
                cfg.data_file(&cfg.files.province_population),
            ),
            district_population: load_district_population(
                cfg.data_file(&cfg.files.district_population),
            ),
            day_care_facilities: load_facilities(cfg.data_file(&cfg.files.day_care_facilities)),
            welfare_centers: load_facilities(cfg.data_file(&cfg.files.welfare_centers)),
            welfare_recipients: load_welfare(cfg.data_file(&cfg.files.welfare_recipients)),
            catalog,
        };
        report("processed tables", &datasets.tables);
        report("population", &datasets.population);
        report("province population", &datasets.province_population);
        report("district population", &datasets.district_population);
        report("day-care facilities", &datasets.day_care_facilities);
        report("welfare centers", &datasets.welfare_centers);
        report("welfare recipients", &datasets.welfare_recipients);
        Ok(datasets)
    }
}

fn report<T>(what: &str, slot: &Result<T>) {
    if let Err(e) = slot {
        warn!(dataset = what, error = %format!("{:#}", e), "dataset unavailable");
    }
}

/// Every `processed_*.parquet` in `dir`, keyed by file stem without the
/// prefix. Unreadable files are logged and skipped.
#[instrument(level = "info", skip(dir), fields(dir = %dir.as_ref().display()))]
pub fn load_processed_tables<P: AsRef<Path>>(dir: P) -> Result<BTreeMap<String, Table>> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(anyhow!("results directory {} not found", dir.display()));
    }
    let pattern = format!(
        "{}/{}*.parquet",
        glob::Pattern::escape(&dir.to_string_lossy()),
        PROCESSED_PREFIX
    );
    let paths: Vec<_> = glob(&pattern)
        .with_context(|| format!("Failed to read glob pattern '{}'", pattern))?
        .filter_map(|entry| entry.ok())
        .collect();
    if paths.is_empty() {
        return Err(anyhow!("no processed tables in {}", dir.display()));
    }

    let mut tables = BTreeMap::new();
    for path in paths {
        let Some(key) = path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(|s| s.strip_prefix(PROCESSED_PREFIX))
            .map(str::to_string)
        else {
            continue;
        };
        match read_table(&path) {
            Ok(table) => {
                info!(key = %key, rows = table.num_rows(), "loaded table");
                tables.insert(key, table);
            }
            Err(e) => warn!(path = %path.display(), error = %format!("{:#}", e), "skipping table"),
        }
    }
    Ok(tables)
}

pub fn load_population<P: AsRef<Path>>(path: P) -> Result<PopulationTable> {
    PopulationTable::from_csv_path(path)
}

/// Province totals from the extract with one title row: rows whose
/// disability type is `합계`, columns 0 and 2, national and subtotal rows
/// excluded, names normalised. Unparsable counts are dropped.
#[instrument(level = "info", skip(path), fields(path = %path.as_ref().display()))]
pub fn load_province_population<P: AsRef<Path>>(path: P) -> Result<Vec<(String, f64)>> {
    let table = RawTable::from_csv_path(path.as_ref())?.into_table(1)?;
    let type_col = table
        .column_index(PROVINCE_TYPE_COLUMN)
        .ok_or_else(|| anyhow!("column '{}' not found", PROVINCE_TYPE_COLUMN))?;
    if table.columns().len() < 3 {
        return Err(anyhow!("expected at least 3 columns, found {}", table.columns().len()));
    }

    let rows: Vec<(String, f64)> = table
        .rows()
        .iter()
        .filter(|r| r[type_col].trim() == TOTAL_TYPE)
        .filter(|r| !matches!(r[0].trim(), NATIONAL | SUBTOTAL))
        .filter_map(|r| parse_number(&r[2]).map(|v| (normalize_region_name(&r[0]), v)))
        .collect();
    info!(provinces = rows.len(), "loaded province population");
    Ok(rows)
}

/// District totals from the extract with two title rows. Columns are
/// positional: province, district, total, then breakdowns.
#[instrument(level = "info", skip(path), fields(path = %path.as_ref().display()))]
pub fn load_district_population<P: AsRef<Path>>(path: P) -> Result<Vec<DistrictPopulation>> {
    let table = RawTable::from_csv_path(path.as_ref())?.into_table(2)?;
    if table.columns().len() < 3 {
        return Err(anyhow!("expected at least 3 columns, found {}", table.columns().len()));
    }

    let rows: Vec<DistrictPopulation> = table
        .rows()
        .iter()
        .filter(|r| r[0].trim() != NATIONAL && r[1].trim() != SUBTOTAL)
        .filter_map(|r| {
            parse_number(&r[2]).map(|population| DistrictPopulation {
                province: normalize_region_name(&r[0]),
                district: r[1].trim().to_string(),
                population,
            })
        })
        .collect();
    info!(districts = rows.len(), "loaded district population");
    Ok(rows)
}

/// Recipients per province and year, see [`WelfareTable`].
pub fn load_welfare<P: AsRef<Path>>(path: P) -> Result<WelfareTable> {
    WelfareTable::from_csv_path(path)
}

/// Facility registry with `시도` and `시군구` columns.
#[instrument(level = "info", skip(path), fields(path = %path.as_ref().display()))]
pub fn load_facilities<P: AsRef<Path>>(path: P) -> Result<Vec<FacilityRecord>> {
    let table = RawTable::from_csv_path(path.as_ref())?.into_table(0)?;
    let province = table
        .column_index("시도")
        .ok_or_else(|| anyhow!("column '시도' not found"))?;
    let district = table
        .column_index("시군구")
        .ok_or_else(|| anyhow!("column '시군구' not found"))?;

    let records: Vec<FacilityRecord> = table
        .rows()
        .iter()
        .map(|r| FacilityRecord {
            province: r[province].trim().to_string(),
            district: r[district].trim().to_string(),
        })
        .collect();
    info!(facilities = records.len(), "loaded facilities");
    Ok(records)
}
