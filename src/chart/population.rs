//! Charts over the registered disabled population.

use std::collections::HashSet;

use super::{ChartKind, ChartParams, ChartSpec, EmptyReason, Frame, ParameterizedChart, Point, Series};
use crate::aggregate::{bucket_other, density};
use crate::loader::FeatureCollection;
use crate::population::PopulationTable;
use crate::region::RegionCatalog;

/// The frame named after `params.year`, or the first one.
fn initial_frame(frames: &[Frame], params: &ChartParams) -> Result<Vec<Series>, EmptyReason> {
    let wanted = params.year.map(|y| y.to_string());
    let frame = match &wanted {
        Some(name) => frames.iter().find(|f| &f.name == name),
        None => frames.first(),
    };
    frame.map(|f| f.series.clone()).ok_or(match params.year {
        Some(year) if !frames.is_empty() => EmptyReason::MissingColumn {
            metric: "인구수".to_string(),
            year: Some(year),
        },
        _ => EmptyReason::NoRows,
    })
}

/// Share of each disability type in the national total, one frame per
/// year, small types folded into `기타`.
#[derive(Default)]
pub struct TypeSharePie;

impl ParameterizedChart for TypeSharePie {
    type Input = PopulationTable;

    fn id(&self) -> &str {
        "disability_type_share_pie"
    }

    fn render(&self, table: &PopulationTable, params: &ChartParams) -> Result<ChartSpec, EmptyReason> {
        let mut frames = Vec::new();
        for year in table.years() {
            let counts: Vec<(String, f64)> = table
                .type_counts(*year)
                .into_iter()
                .map(|(t, c)| (t, c as f64))
                .collect();
            if counts.is_empty() {
                continue;
            }
            let mut slices = bucket_other(&counts, params.other_threshold_pct)
                .map_err(|e| EmptyReason::InvalidParameter(e.to_string()))?;
            slices.sort_by(|a, b| a.label.cmp(&b.label));
            let points = slices
                .into_iter()
                .map(|s| {
                    let point = Point::new(s.label, s.value);
                    match s.detail {
                        Some(d) => point.with_detail(d),
                        None => point,
                    }
                })
                .collect();
            frames.push(Frame {
                name: year.to_string(),
                series: vec![Series::new("인구수", points)],
            });
        }

        let series = initial_frame(&frames, params)?;
        let mut spec = ChartSpec::new(ChartKind::Pie, "연도별 장애유형별 장애인구 비율", series);
        spec.frames = frames;
        spec.notes.push(format!("기타 기준: {}% 미만", params.other_threshold_pct));
        Ok(spec)
    }
}

/// National total over every year.
#[derive(Default)]
pub struct NationalTrend;

impl ParameterizedChart for NationalTrend {
    type Input = PopulationTable;

    fn id(&self) -> &str {
        "national_trend"
    }

    fn render(&self, table: &PopulationTable, _params: &ChartParams) -> Result<ChartSpec, EmptyReason> {
        let points: Vec<Point> = table
            .national_trend()
            .into_iter()
            .map(|(y, c)| Point::new(y.to_string(), c as f64))
            .collect();
        if points.is_empty() {
            return Err(EmptyReason::NoRows);
        }
        Ok(ChartSpec::new(
            ChartKind::Line,
            "연도별 전국 장애인구 총계 추이 (성별: 계)",
            vec![Series::new("총계 추이", points)],
        ))
    }
}

/// National total per gender over every year.
#[derive(Default)]
pub struct GenderTrend;

impl ParameterizedChart for GenderTrend {
    type Input = PopulationTable;

    fn id(&self) -> &str {
        "gender_trend"
    }

    fn render(&self, table: &PopulationTable, _params: &ChartParams) -> Result<ChartSpec, EmptyReason> {
        let series: Vec<Series> = table
            .gender_trend()
            .into_iter()
            .map(|(gender, points)| {
                Series::new(
                    gender,
                    points
                        .into_iter()
                        .map(|(y, c)| Point::new(y.to_string(), c as f64))
                        .collect(),
                )
            })
            .collect();
        if series.is_empty() {
            return Err(EmptyReason::NoRows);
        }
        Ok(ChartSpec::new(
            ChartKind::Line,
            "연도별 전국 성별 장애인구 총계 추이",
            series,
        ))
    }
}

/// Population density per province, one frame per year. Points carry the
/// boundary feature name as label and the centroid as marker position.
pub struct RegionalDensityMap<'a> {
    pub catalog: &'a RegionCatalog,
    /// Province boundaries; only used to flag regions the map cannot place.
    pub geometry: Option<&'a FeatureCollection>,
}

impl<'a> ParameterizedChart for RegionalDensityMap<'a> {
    type Input = PopulationTable;

    fn id(&self) -> &str {
        "regional_density_map"
    }

    fn render(&self, population: &PopulationTable, params: &ChartParams) -> Result<ChartSpec, EmptyReason> {
        let known: Option<HashSet<&str>> = self.geometry.map(|g| g.names().into_iter().collect());
        let mut unplaced = HashSet::new();
        let mut frames = Vec::new();

        for year in population.years() {
            let totals: Vec<(String, f64)> = population
                .regional_totals(*year)
                .into_iter()
                .map(|(r, c)| (r, c as f64))
                .collect();
            let points: Vec<Point> = density(&totals, self.catalog)
                .into_iter()
                .filter_map(|row| {
                    let province = self.catalog.province(&row.region)?;
                    if let Some(names) = &known {
                        if !names.contains(province.geo_name.as_str()) {
                            unplaced.insert(province.name.clone());
                        }
                    }
                    let mut point = Point::new(province.geo_name.clone(), row.density)
                        .with_detail(province.name.clone())
                        .with_extra("population", row.value)
                        .with_extra("area_km2", row.area_km2);
                    point.position = Some([province.lat, province.lon]);
                    Some(point)
                })
                .collect();
            if points.is_empty() {
                continue;
            }
            frames.push(Frame {
                name: year.to_string(),
                series: vec![Series::new("인구 밀도", points)],
            });
        }

        let series = initial_frame(&frames, params)?;
        let mut spec = ChartSpec::new(
            ChartKind::Choropleth,
            "연도별 시도별 장애인구 총계 및 밀도",
            series,
        );
        spec.frames = frames;
        let mut unplaced: Vec<String> = unplaced.into_iter().collect();
        unplaced.sort();
        for name in unplaced {
            spec.notes.push(format!("경계 데이터에 없는 지역: {}", name));
        }
        Ok(spec)
    }
}
