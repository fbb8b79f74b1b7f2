use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::region::{district_key, RegionCatalog};

/// One facility as listed in the registry extracts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacilityRecord {
    /// Short (`서울`) or full (`서울특별시`) province name.
    pub province: String,
    pub district: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionLevel {
    Province,
    District,
}

/// Facilities per province, or per `"<province> <district>"`. Records whose
/// province does not map to a catalog province are dropped.
pub fn count_facilities(
    records: &[FacilityRecord],
    catalog: &RegionCatalog,
    level: RegionLevel,
) -> BTreeMap<String, u64> {
    let mut counts = BTreeMap::new();
    let mut dropped = 0usize;
    for record in records {
        let Some(province) = catalog.full_name(&record.province) else {
            debug!(province = %record.province, "unmapped province");
            dropped += 1;
            continue;
        };
        let key = match level {
            RegionLevel::Province => province.to_string(),
            RegionLevel::District => district_key(province, &record.district),
        };
        *counts.entry(key).or_insert(0) += 1;
    }
    if dropped > 0 {
        warn!(dropped, total = records.len(), "facility records with unknown province dropped");
    }
    counts
}
