use serde::Serialize;
use tracing::debug;

use crate::region::{normalize_region_name, RegionCatalog};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DensityRow {
    pub region: String,
    pub value: f64,
    pub area_km2: f64,
    pub density: f64,
}

/// `value / area` for every region the catalog knows; the rest are dropped.
pub fn density(values: &[(String, f64)], catalog: &RegionCatalog) -> Vec<DensityRow> {
    values
        .iter()
        .filter_map(|(region, value)| {
            let region = normalize_region_name(region);
            match catalog.area(&region).filter(|a| *a > 0.0) {
                Some(area_km2) => Some(DensityRow {
                    density: value / area_km2,
                    value: *value,
                    area_km2,
                    region,
                }),
                None => {
                    debug!(region = %region, "no area, dropping");
                    None
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn unknown_regions_are_dropped() -> Result<()> {
        let catalog = RegionCatalog::builtin()?;
        let rows = density(
            &[
                ("서울특별시".to_string(), 605.23 * 2.0),
                ("전북특별자치도".to_string(), 0.0),
                ("전국".to_string(), 1.0),
                ("바다".to_string(), 1.0),
            ],
            catalog,
        );
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].density, 2.0);
        assert_eq!(rows[1].region, "전라북도");
        assert_eq!(rows[1].density, 0.0);
        Ok(())
    }
}
