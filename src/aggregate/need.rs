use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::region::{normalize_region_name, RegionCatalog};

/// Population per facility, with one phantom facility so regions without
/// any stay finite.
pub fn need_index(population: f64, facilities: u64) -> f64 {
    population / (facilities as f64 + 1.0)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NeedRow {
    pub region: String,
    pub population: f64,
    pub facilities: u64,
    pub need_index: f64,
    /// Facilities per km², when the region's area is known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facility_density: Option<f64>,
}

/// Left join of population with facility counts on the normalised region
/// name; regions absent from `counts` have no facilities.
pub fn join_need(
    population: &[(String, f64)],
    counts: &BTreeMap<String, u64>,
    catalog: &RegionCatalog,
) -> Vec<NeedRow> {
    let counts: HashMap<String, u64> = counts
        .iter()
        .map(|(k, v)| (normalize_region_name(k), *v))
        .collect();

    population
        .iter()
        .map(|(region, pop)| {
            let region = normalize_region_name(region);
            let facilities = counts.get(&region).copied().unwrap_or(0);
            let facility_density = catalog
                .area(&region)
                .filter(|a| *a > 0.0)
                .map(|a| facilities as f64 / a);
            NeedRow {
                need_index: need_index(*pop, facilities),
                population: *pop,
                facilities,
                facility_density,
                region,
            }
        })
        .collect()
}
