//! Region names and the reference catalog of provinces and districts.

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use serde::Deserialize;
use std::{collections::HashMap, fs, path::Path};
use tracing::debug;

/// Built-in catalog, see `assets/regions.yaml`.
const REGIONS_YAML: &str = include_str!("../assets/regions.yaml");

static BUILTIN: OnceCell<RegionCatalog> = OnceCell::new();

/// Renamed provinces, mapped back to the names the other sources use.
const RENAMES: [(&str, &str); 2] = [("강원특별자치도", "강원도"), ("전북특별자치도", "전라북도")];

/// National aggregate row label.
pub const NATIONAL: &str = "전국";
/// Subtotal row label in district extracts.
pub const SUBTOTAL: &str = "소계";

/// Canonical form of a province name or of a `"<province> <district>"`
/// name. Only the province part is rewritten; applying it twice is a no-op.
pub fn normalize_region_name(name: &str) -> String {
    let trimmed = name.trim();
    for (from, to) in RENAMES {
        if let Some(rest) = trimmed.strip_prefix(from) {
            if rest.is_empty() || rest.starts_with(' ') {
                return format!("{}{}", to, rest);
            }
        }
    }
    trimmed.to_string()
}

/// `"<province> <district>"`, normalised.
pub fn district_key(province: &str, district: &str) -> String {
    normalize_region_name(&format!("{} {}", province.trim(), district.trim()))
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Province {
    pub name: String,
    pub short: String,
    pub area_km2: f64,
    pub lat: f64,
    pub lon: f64,
    /// Feature `name` in the province boundary layer.
    pub geo_name: String,
}

#[derive(Deserialize)]
struct CatalogFile {
    provinces: Vec<Province>,
    #[serde(default)]
    districts: HashMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegionCatalog {
    provinces: Vec<Province>,
    districts: HashMap<String, f64>,
}

impl RegionCatalog {
    /// The embedded catalog, parsed on first use.
    pub fn builtin() -> Result<&'static RegionCatalog> {
        BUILTIN.get_or_try_init(|| Self::from_yaml(REGIONS_YAML).context("parsing built-in region catalog"))
    }

    /// `path` when given, the embedded catalog otherwise.
    pub fn load(path: Option<&Path>) -> Result<RegionCatalog> {
        match path {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("reading region catalog {}", path.display()))?;
                Self::from_yaml(&text)
                    .with_context(|| format!("parsing region catalog {}", path.display()))
            }
            None => Ok(Self::builtin()?.clone()),
        }
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        let file: CatalogFile = serde_yaml::from_str(text)?;
        let provinces = file
            .provinces
            .into_iter()
            .map(|mut p| {
                p.name = normalize_region_name(&p.name);
                p
            })
            .collect::<Vec<_>>();
        let districts = file
            .districts
            .into_iter()
            .map(|(k, v)| (normalize_region_name(&k), v))
            .collect::<HashMap<_, _>>();
        debug!(provinces = provinces.len(), districts = districts.len(), "region catalog");
        Ok(Self { provinces, districts })
    }

    pub fn provinces(&self) -> &[Province] {
        &self.provinces
    }

    /// Province by full name, in either its old or its renamed form.
    pub fn province(&self, name: &str) -> Option<&Province> {
        let name = normalize_region_name(name);
        self.provinces.iter().find(|p| p.name == name)
    }

    /// Full name for a short (`서울`) or already full (`서울특별시`) name.
    pub fn full_name(&self, name: &str) -> Option<&str> {
        let trimmed = name.trim();
        self.provinces
            .iter()
            .find(|p| p.short == trimmed)
            .or_else(|| self.province(trimmed))
            .map(|p| p.name.as_str())
    }

    /// Area in km² of a province or of a `"<province> <district>"`.
    pub fn area(&self, name: &str) -> Option<f64> {
        self.province(name)
            .map(|p| p.area_km2)
            .or_else(|| self.districts.get(&normalize_region_name(name)).copied())
    }

    pub fn centroid(&self, name: &str) -> Option<(f64, f64)> {
        self.province(name).map(|p| (p.lat, p.lon))
    }

    pub fn geo_name(&self, name: &str) -> Option<&str> {
        self.province(name).map(|p| p.geo_name.as_str())
    }
}
