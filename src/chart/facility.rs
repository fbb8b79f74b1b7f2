//! Facility need maps: population per facility for provinces or districts.

use super::{ChartKind, ChartParams, ChartSpec, EmptyReason, ParameterizedChart, Point, Series};
use crate::aggregate::{count_facilities, join_need, FacilityRecord, RegionLevel};
use crate::loader::DistrictPopulation;
use crate::region::RegionCatalog;

pub struct FacilityInputs<'a> {
    pub province_population: &'a [(String, f64)],
    pub district_population: &'a [DistrictPopulation],
    pub facilities: &'a [FacilityRecord],
}

/// Choropleth of the need index for one facility category. Province points
/// are labelled with the boundary feature name, district points with the
/// bare district name the municipality layer uses.
pub struct FacilityNeedMap<'a> {
    pub catalog: &'a RegionCatalog,
    pub level: RegionLevel,
    /// Facility category, e.g. `주간이용시설` or `복지관`.
    pub category: &'static str,
}

impl<'a> FacilityNeedMap<'a> {
    fn population(&self, inputs: &FacilityInputs<'_>) -> Vec<(String, f64)> {
        match self.level {
            RegionLevel::Province => inputs.province_population.to_vec(),
            RegionLevel::District => inputs
                .district_population
                .iter()
                .map(|d| (d.key(), d.population))
                .collect(),
        }
    }

    fn label(&self, region: &str) -> String {
        match self.level {
            RegionLevel::Province => self
                .catalog
                .geo_name(region)
                .unwrap_or(region)
                .to_string(),
            RegionLevel::District => region
                .split_once(' ')
                .map(|(_, district)| district)
                .unwrap_or(region)
                .to_string(),
        }
    }
}

impl<'a> ParameterizedChart for FacilityNeedMap<'a> {
    type Input = FacilityInputs<'a>;

    fn id(&self) -> &str {
        match (self.level, self.category) {
            (RegionLevel::Province, "복지관") => "welfare_center_need_province",
            (RegionLevel::District, "복지관") => "welfare_center_need_district",
            (RegionLevel::Province, _) => "facility_need_province",
            (RegionLevel::District, _) => "facility_need_district",
        }
    }

    fn render(&self, inputs: &FacilityInputs<'a>, _params: &ChartParams) -> Result<ChartSpec, EmptyReason> {
        let population = self.population(inputs);
        if population.is_empty() {
            return Err(EmptyReason::NoRows);
        }
        let counts = count_facilities(inputs.facilities, self.catalog, self.level);
        let points: Vec<Point> = join_need(&population, &counts, self.catalog)
            .into_iter()
            .map(|row| {
                let mut point = Point::new(self.label(&row.region), row.need_index)
                    .with_detail(row.region.clone())
                    .with_extra("population", row.population)
                    .with_extra("facilities", row.facilities as f64);
                if let Some(d) = row.facility_density {
                    point = point.with_extra("facility_density", d);
                }
                point
            })
            .collect();

        let scope = match self.level {
            RegionLevel::Province => "시도별",
            RegionLevel::District => "시군구별",
        };
        Ok(ChartSpec::new(
            ChartKind::Choropleth,
            format!("{} 장애인구수 대비 {} 필요도", scope, self.category),
            vec![Series::new(format!("{}필요지수", self.category), points)],
        ))
    }
}
