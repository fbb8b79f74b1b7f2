use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
};
use tracing::{debug, info};

/// Environment variable naming a YAML config file.
pub const CONFIG_ENV: &str = "WELFARESTATS_CONFIG";
/// Config file picked up from the working directory when present.
pub const LOCAL_CONFIG: &str = "welfarestats.yaml";

pub const PROVINCES_GEO_URL: &str = "https://raw.githubusercontent.com/southkorea/southkorea-maps/master/korea_administrative_boundaries/2018/geojson/skorea_provinces_geo.json";
pub const MUNICIPALITIES_GEO_URL: &str = "https://raw.githubusercontent.com/southkorea/southkorea-maps/master/kostat/2013/json/skorea_municipalities_geo_simple.json";

/// One boundary layer: where to fetch it and the file it is cached as
/// under `data_dir`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoLayerConfig {
    pub url: String,
    pub cache_file: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoConfig {
    pub provinces: GeoLayerConfig,
    pub municipalities: GeoLayerConfig,
}

impl Default for GeoConfig {
    fn default() -> Self {
        Self {
            provinces: GeoLayerConfig {
                url: PROVINCES_GEO_URL.to_string(),
                cache_file: "skorea_provinces_geo.json".to_string(),
            },
            municipalities: GeoLayerConfig {
                url: MUNICIPALITIES_GEO_URL.to_string(),
                cache_file: "skorea_municipalities_geo_simple.json".to_string(),
            },
        }
    }
}

/// Source file names, relative to `data_dir`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileNames {
    pub population: String,
    pub province_population: String,
    pub district_population: String,
    pub day_care_facilities: String,
    pub welfare_centers: String,
    pub welfare_recipients: String,
}

impl Default for FileNames {
    fn default() -> Self {
        Self {
            population: "korean_disabled_population_statistics.csv".to_string(),
            province_population: "disability_population.csv".to_string(),
            district_population: "시군구별_장애정도별_성별_등록장애인수_20250717111030.csv".to_string(),
            day_care_facilities: "disability_facilities.csv".to_string(),
            welfare_centers: "보건복지부_장애인복지관 현황_20240425_utf8.csv".to_string(),
            welfare_recipients: "Disability_Assistance.csv".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data_dir: PathBuf,
    /// Where processed tables are written and read.
    pub results_dir: PathBuf,
    /// Prefix of raw sheets picked up by the preprocessor.
    pub raw_prefix: String,
    pub files: FileNames,
    pub geo: GeoConfig,
    /// Share, in percent, below which a category joins the `기타` bucket.
    pub other_threshold_pct: f64,
    /// Replaces the built-in region catalog when set.
    pub region_catalog: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            results_dir: PathBuf::from("results"),
            raw_prefix: "disable".to_string(),
            files: FileNames::default(),
            geo: GeoConfig::default(),
            other_threshold_pct: 4.0,
            region_catalog: None,
        }
    }
}

impl Config {
    /// `$WELFARESTATS_CONFIG`, then `./welfarestats.yaml`, then defaults.
    pub fn load() -> Result<Self> {
        if let Ok(path) = env::var(CONFIG_ENV) {
            return Self::from_path(&path);
        }
        let local = Path::new(LOCAL_CONFIG);
        if local.is_file() {
            return Self::from_path(local);
        }
        debug!("no config file, using defaults");
        Ok(Self::default())
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config = Self::from_yaml(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        info!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn data_file(&self, name: &str) -> PathBuf {
        self.data_dir.join(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn partial_yaml_keeps_defaults() -> Result<()> {
        let cfg = Config::from_yaml("data_dir: /srv/stats\nother_threshold_pct: 7.5\n")?;
        assert_eq!(cfg.data_dir, PathBuf::from("/srv/stats"));
        assert_eq!(cfg.other_threshold_pct, 7.5);
        assert_eq!(cfg.results_dir, PathBuf::from("results"));
        assert_eq!(cfg.geo, GeoConfig::default());
        Ok(())
    }

    #[test]
    fn from_path_reads_file() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("cfg.yaml");
        fs::write(&path, "raw_prefix: survey\nfiles:\n  population: pop.csv\n  province_population: p.csv\n  district_population: d.csv\n  day_care_facilities: f.csv\n  welfare_centers: w.csv\n")?;
        let cfg = Config::from_path(&path)?;
        assert_eq!(cfg.raw_prefix, "survey");
        assert_eq!(cfg.data_file(&cfg.files.population), PathBuf::from("data/pop.csv"));
        Ok(())
    }

    #[test]
    fn file_names_fill_in_missing_entries() -> Result<()> {
        let cfg = Config::from_yaml("files:\n  population: pop.csv\n")?;
        assert_eq!(cfg.files.population, "pop.csv");
        assert_eq!(cfg.files.welfare_recipients, "Disability_Assistance.csv");
        Ok(())
    }

    #[test]
    fn bad_yaml_is_an_error() {
        assert!(Config::from_yaml("other_threshold_pct: [").is_err());
    }
}
