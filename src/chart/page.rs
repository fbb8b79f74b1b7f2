//! The dashboard pages: which charts each one shows and what feeds them.

use anyhow::{anyhow, Result};
use serde::Serialize;
use std::str::FromStr;
use tracing::{info, warn};

use super::{
    employment::{ActivityTimeSeries, CategoryRates, ParticipationPie, RegionTreemap},
    facility::{FacilityInputs, FacilityNeedMap},
    population::{GenderTrend, NationalTrend, RegionalDensityMap, TypeSharePie},
    welfare::WelfareTrend,
    ChartParams, ChartSpec, EmptyReason, ParameterizedChart,
};
use crate::aggregate::RegionLevel;
use crate::loader::{Datasets, FeatureCollection, GeoLayer};
use crate::table::Table;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Population,
    Employment,
    Facility,
    Welfare,
}

impl Page {
    pub const ALL: [Page; 4] = [Page::Population, Page::Employment, Page::Facility, Page::Welfare];

    /// Boundary layers the page's maps are drawn on.
    pub fn geo_layers(&self) -> &'static [GeoLayer] {
        match self {
            Page::Population => &[GeoLayer::Provinces],
            Page::Facility => &[GeoLayer::Provinces, GeoLayer::Municipalities],
            Page::Employment | Page::Welfare => &[],
        }
    }
}

impl FromStr for Page {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "population" => Ok(Page::Population),
            "employment" => Ok(Page::Employment),
            "facility" => Ok(Page::Facility),
            "welfare" => Ok(Page::Welfare),
            other => Err(anyhow!("unknown page '{}'", other)),
        }
    }
}

/// Boundary layers that could be loaded; map charts are skipped without them.
#[derive(Debug, Default, Clone, Copy)]
pub struct Geometry<'a> {
    pub provinces: Option<&'a FeatureCollection>,
    pub municipalities: Option<&'a FeatureCollection>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedChart {
    pub id: String,
    pub spec: ChartSpec,
}

/// Charts of one page; empty charts are logged and left out.
pub fn render_page(
    page: Page,
    datasets: &Datasets,
    geometry: Geometry<'_>,
    params: &ChartParams,
) -> Vec<RenderedChart> {
    let outcomes = match page {
        Page::Employment => employment_page(datasets, params),
        Page::Population => population_page(datasets, geometry, params),
        Page::Facility => facility_page(datasets, geometry, params),
        Page::Welfare => welfare_page(datasets, params),
    };
    let mut charts = Vec::with_capacity(outcomes.len());
    for (id, outcome) in outcomes {
        match outcome {
            Ok(spec) => charts.push(RenderedChart { id, spec }),
            Err(reason) => warn!(chart = %id, %reason, "chart skipped"),
        }
    }
    info!(?page, charts = charts.len(), "page rendered");
    charts
}

type Outcome = (String, Result<ChartSpec, EmptyReason>);

fn run<C>(chart: &C, input: Result<&C::Input, EmptyReason>, params: &ChartParams) -> Outcome
where
    C: ParameterizedChart,
{
    let outcome = input.and_then(|input| chart.render(input, params));
    (chart.id().to_string(), outcome)
}

fn table<'d>(datasets: &'d Datasets, key: &str) -> Result<&'d Table, EmptyReason> {
    datasets
        .table(key)
        .ok_or_else(|| EmptyReason::MissingDataset(key.to_string()))
}

fn employment_page(datasets: &Datasets, params: &ChartParams) -> Vec<Outcome> {
    vec![
        run(&ActivityTimeSeries::default(), table(datasets, "disable_age"), params),
        run(&CategoryRates::by_age(), table(datasets, "disable_age"), params),
        run(&CategoryRates::by_education(), table(datasets, "disable_edu"), params),
        run(&CategoryRates::by_sex(), table(datasets, "disable_sex"), params),
        run(&ParticipationPie::default(), table(datasets, "disable_sex"), params),
        run(&CategoryRates::by_disability_type(), table(datasets, "disable_type"), params),
        run(&RegionTreemap::default(), table(datasets, "disable_region"), params),
    ]
}

fn population_page(datasets: &Datasets, geometry: Geometry<'_>, params: &ChartParams) -> Vec<Outcome> {
    let population = datasets
        .population
        .as_ref()
        .map_err(|_| EmptyReason::MissingDataset("population".to_string()));

    let mut national = run(&NationalTrend, population.clone(), params);
    if let (Ok(table), Ok(spec)) = (&population, &mut national.1) {
        let drifts = table.check_national_consistency();
        if !drifts.is_empty() {
            spec.notes.push(format!(
                "전국 값과 시도 합계가 다른 항목 {}건",
                drifts.len()
            ));
        }
    }

    let density = match geometry.provinces {
        Some(provinces) => run(
            &RegionalDensityMap {
                catalog: &datasets.catalog,
                geometry: Some(provinces),
            },
            population.clone(),
            params,
        ),
        None => (
            "regional_density_map".to_string(),
            Err(EmptyReason::MissingDataset("province geometry".to_string())),
        ),
    };

    vec![
        run(&TypeSharePie, population.clone(), params),
        national,
        density,
        run(&GenderTrend, population, params),
    ]
}

fn facility_page(datasets: &Datasets, geometry: Geometry<'_>, params: &ChartParams) -> Vec<Outcome> {
    let mut outcomes = Vec::new();
    let categories = [
        ("주간이용시설", &datasets.day_care_facilities, "day-care facilities"),
        ("복지관", &datasets.welfare_centers, "welfare centers"),
    ];

    for level in [RegionLevel::Province, RegionLevel::District] {
        let (population_ok, population_name, layer) = match level {
            RegionLevel::Province => (
                datasets.province_population.is_ok(),
                "province population",
                geometry.provinces,
            ),
            RegionLevel::District => (
                datasets.district_population.is_ok(),
                "district population",
                geometry.municipalities,
            ),
        };

        for (category, facilities, facilities_name) in &categories {
            let chart = FacilityNeedMap {
                catalog: &datasets.catalog,
                level,
                category: *category,
            };
            let missing = if !population_ok {
                Some(population_name)
            } else if facilities.is_err() {
                Some(*facilities_name)
            } else if layer.is_none() {
                Some(match level {
                    RegionLevel::Province => "province geometry",
                    RegionLevel::District => "municipality geometry",
                })
            } else {
                None
            };
            if let Some(name) = missing {
                outcomes.push((
                    chart.id().to_string(),
                    Err(EmptyReason::MissingDataset(name.to_string())),
                ));
                continue;
            }

            let inputs = FacilityInputs {
                province_population: datasets.province_population.as_deref().unwrap_or(&[]),
                district_population: datasets.district_population.as_deref().unwrap_or(&[]),
                facilities: facilities.as_deref().unwrap_or(&[]),
            };
            outcomes.push(run(&chart, Ok(&inputs), params));
        }
    }
    outcomes
}

fn welfare_page(datasets: &Datasets, params: &ChartParams) -> Vec<Outcome> {
    let recipients = datasets
        .welfare_recipients
        .as_ref()
        .map_err(|_| EmptyReason::MissingDataset("welfare recipients".to_string()));
    WelfareTrend::all()
        .iter()
        .map(|chart| run(chart, recipients.clone(), params))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::FacilityRecord;
    use crate::loader::DistrictPopulation;
    use crate::population::PopulationTable;
    use crate::region::RegionCatalog;
    use crate::table::RawTable;
    use crate::welfare::WelfareTable;
    use std::collections::BTreeMap;
    use std::io::Cursor;

    fn datasets() -> Datasets {
        let raw = RawTable::from_csv_reader(Cursor::new(
            "시도별,성별,장애유형별,2023\n전국,계,합계,100\n전국,계,지체,100\n전국,남자,합계,60\n서울특별시,계,합계,90\n",
        ))
        .unwrap();
        let age = Table::new(
            vec!["연령".into(), "2023_경제활동인구 (명)".into(), "2023_비경제활동인구 (명)".into()],
            vec![vec!["전체".into(), "10".into(), "20".into()]],
        )
        .unwrap();
        let mut tables = BTreeMap::new();
        tables.insert("disable_age".to_string(), age);

        Datasets {
            tables: Ok(tables),
            population: PopulationTable::from_raw(&raw),
            province_population: Ok(vec![("서울특별시".to_string(), 90.0)]),
            district_population: Ok(vec![DistrictPopulation {
                province: "서울특별시".into(),
                district: "종로구".into(),
                population: 9.0,
            }]),
            day_care_facilities: Ok(vec![FacilityRecord {
                province: "서울".into(),
                district: "종로구".into(),
            }]),
            welfare_centers: Err(anyhow!("missing file")),
            welfare_recipients: WelfareTable::from_raw(
                RawTable::from_csv_reader(Cursor::new(
                    "년도,시도,기초생활수급자 수급자-일반,차상위초과\n2021,서울특별시,10,1\n2021,부산광역시,5,2\n",
                ))
                .unwrap(),
            ),
            catalog: RegionCatalog::builtin().unwrap().clone(),
        }
    }

    #[test]
    fn page_names_parse() {
        assert_eq!("facility".parse::<Page>().unwrap(), Page::Facility);
        assert_eq!("welfare".parse::<Page>().unwrap(), Page::Welfare);
        assert!("home".parse::<Page>().is_err());
    }

    #[test]
    fn only_map_pages_need_boundaries() {
        assert!(Page::Employment.geo_layers().is_empty());
        assert!(Page::Welfare.geo_layers().is_empty());
        assert_eq!(Page::Population.geo_layers(), &[GeoLayer::Provinces]);
        assert!(Page::Facility.geo_layers().contains(&GeoLayer::Municipalities));
    }

    #[test]
    fn welfare_page_draws_present_groups() {
        let charts = render_page(Page::Welfare, &datasets(), Geometry::default(), &ChartParams::default());
        let ids: Vec<_> = charts.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["basic_livelihood_general_trend", "near_poverty_excess_trend"]);
        assert_eq!(charts[0].spec.series[0].points[0].value, 15.0);

        let busan = ChartParams::default().with_region(Some("부산광역시".to_string()));
        let charts = render_page(Page::Welfare, &datasets(), Geometry::default(), &busan);
        assert_eq!(charts[1].spec.series[0].points[0].value, 2.0);
    }

    #[test]
    fn employment_page_skips_missing_tables() {
        let charts = render_page(Page::Employment, &datasets(), Geometry::default(), &ChartParams::default());
        let ids: Vec<_> = charts.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["activity_time_series"]);
    }

    #[test]
    fn population_page_flags_drift_and_needs_geometry_for_maps() {
        let charts = render_page(Page::Population, &datasets(), Geometry::default(), &ChartParams::default());
        let ids: Vec<_> = charts.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["disability_type_share_pie", "national_trend", "gender_trend"]);
        assert_eq!(charts[1].spec.notes.len(), 1);
    }

    #[test]
    fn facility_page_renders_what_it_can() {
        let geo: FeatureCollection = serde_json::from_str(r#"{"features":[]}"#).unwrap();
        let geometry = Geometry {
            provinces: Some(&geo),
            municipalities: None,
        };
        let charts = render_page(Page::Facility, &datasets(), geometry, &ChartParams::default());
        let ids: Vec<_> = charts.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["facility_need_province"]);
        assert_eq!(charts[0].spec.series[0].points[0].value, 45.0);
    }
}
