//! Charts over the processed employment survey tables.

use tracing::debug;

use super::{
    format_count, pick_year, resolve_or_empty, ChartKind, ChartParams, ChartSpec, EmptyReason,
    ParameterizedChart, Point, Series,
};
use crate::resolve::ColumnResolver;
use crate::table::Table;

/// Key of the all-categories row.
pub const TOTAL_ROW: &str = "전체";

pub const ACTIVE: &str = "경제활동인구 (명)";
pub const INACTIVE: &str = "비경제활동인구 (명)";
pub const EMPLOYED: &str = "취업자 (명)";
pub const UNEMPLOYED: &str = "실업자 (명)";
pub const PARTICIPATION_RATE: &str = "경활률 (%)";
pub const EMPLOYMENT_RATE: &str = "고용률 (%)";
pub const UNEMPLOYMENT_RATE: &str = "실업률 (%)";

/// Economically active and inactive population of the `전체` row, for
/// every year both resolve.
pub struct ActivityTimeSeries {
    resolver: ColumnResolver,
}

impl Default for ActivityTimeSeries {
    fn default() -> Self {
        Self {
            resolver: ColumnResolver::standard(),
        }
    }
}

impl ParameterizedChart for ActivityTimeSeries {
    type Input = Table;

    fn id(&self) -> &str {
        "activity_time_series"
    }

    fn render(&self, table: &Table, _params: &ChartParams) -> Result<ChartSpec, EmptyReason> {
        if !table.keys().any(|k| k == TOTAL_ROW) {
            return Err(EmptyReason::NoRows);
        }
        let mut active = Vec::new();
        let mut inactive = Vec::new();
        for year in self.resolver.available_years(table, ACTIVE) {
            let (Some(a_col), Some(i_col)) = (
                self.resolver.resolve(table, ACTIVE, year),
                self.resolver.resolve(table, INACTIVE, year),
            ) else {
                continue;
            };
            let (Some(a), Some(i)) = (table.value(TOTAL_ROW, &a_col), table.value(TOTAL_ROW, &i_col))
            else {
                debug!(year, "activity values missing");
                continue;
            };
            active.push(Point::new(year.to_string(), a));
            inactive.push(Point::new(year.to_string(), i));
        }
        if active.is_empty() {
            return Err(EmptyReason::NoRows);
        }
        Ok(ChartSpec::new(
            ChartKind::Line,
            "연도별 장애인 경제활동 및 비경제활동인구수",
            vec![
                Series::new("경제활동인구", active),
                Series::new("비경제활동인구", inactive),
            ],
        ))
    }
}

/// Grouped bars of a few rate metrics per category for one year, the
/// `전체` row excluded.
pub struct CategoryRates {
    id: &'static str,
    title: &'static str,
    metrics: Vec<&'static str>,
    resolver: ColumnResolver,
}

impl CategoryRates {
    pub fn new(id: &'static str, title: &'static str, metrics: Vec<&'static str>) -> Self {
        Self {
            id,
            title,
            metrics,
            resolver: ColumnResolver::standard(),
        }
    }

    pub fn with_resolver(mut self, resolver: ColumnResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn by_age() -> Self {
        Self::new("age_rates", "연령별 고용률 및 실업률", vec![EMPLOYMENT_RATE, UNEMPLOYMENT_RATE])
    }

    /// The education extract goes back to the bare-named 2008 columns.
    pub fn by_education() -> Self {
        Self::new(
            "education_rates",
            "학력 수준별 고용률 및 실업률",
            vec![EMPLOYMENT_RATE, UNEMPLOYMENT_RATE],
        )
        .with_resolver(ColumnResolver::with_legacy_bare_year())
    }

    pub fn by_sex() -> Self {
        Self::new("sex_rates", "성별 경제활동 지표", vec![PARTICIPATION_RATE, EMPLOYMENT_RATE])
    }

    pub fn by_disability_type() -> Self {
        Self::new("type_rates", "장애 유형별 고용률", vec![EMPLOYMENT_RATE])
    }
}

impl ParameterizedChart for CategoryRates {
    type Input = Table;

    fn id(&self) -> &str {
        self.id
    }

    /// A metric that does not resolve drops only its own series; the chart
    /// is empty when none resolves.
    fn render(&self, table: &Table, params: &ChartParams) -> Result<ChartSpec, EmptyReason> {
        let first = self.metrics.first().ok_or(EmptyReason::NoRows)?;
        let year = self
            .metrics
            .iter()
            .filter_map(|m| pick_year(&self.resolver, table, m, params).ok())
            .max()
            .map_or_else(|| pick_year(&self.resolver, table, first, params), Ok)?;
        let rows = table.without_key(TOTAL_ROW);
        if rows.is_empty() {
            return Err(EmptyReason::NoRows);
        }

        let mut series = Vec::with_capacity(self.metrics.len());
        let mut notes = Vec::new();
        let mut first_missing = None;
        for metric in &self.metrics {
            let col = match resolve_or_empty(&self.resolver, &rows, metric, year) {
                Ok(col) => col,
                Err(reason) => {
                    debug!(chart = self.id, %reason, "series skipped");
                    notes.push(format!("{}년 {} 자료 없음", year, metric));
                    first_missing.get_or_insert(reason);
                    continue;
                }
            };
            let points: Vec<Point> = rows
                .keys()
                .zip(rows.numeric_column(&col).unwrap_or_default())
                .filter_map(|(key, v)| v.map(|v| Point::new(key, v)))
                .collect();
            series.push(Series::new(*metric, points));
        }
        if series.is_empty() {
            return Err(first_missing.unwrap_or(EmptyReason::NoRows));
        }
        if series.iter().all(|s| s.points.is_empty()) {
            return Err(EmptyReason::NoRows);
        }
        let mut spec = ChartSpec::new(
            ChartKind::Bar,
            format!("{}년 {}", year, self.title),
            series,
        );
        spec.notes = notes;
        Ok(spec)
    }
}

/// Participation rate per sex as a pie, each slice detailing the active,
/// employed and unemployed counts behind it.
pub struct ParticipationPie {
    resolver: ColumnResolver,
}

impl Default for ParticipationPie {
    fn default() -> Self {
        Self {
            resolver: ColumnResolver::standard(),
        }
    }
}

impl ParameterizedChart for ParticipationPie {
    type Input = Table;

    fn id(&self) -> &str {
        "sex_participation_pie"
    }

    fn render(&self, table: &Table, params: &ChartParams) -> Result<ChartSpec, EmptyReason> {
        let year = pick_year(&self.resolver, table, PARTICIPATION_RATE, params)?;
        let rows = table.without_key(TOTAL_ROW);
        let rate = resolve_or_empty(&self.resolver, &rows, PARTICIPATION_RATE, year)?;
        let active = resolve_or_empty(&self.resolver, &rows, ACTIVE, year)?;
        let employed = resolve_or_empty(&self.resolver, &rows, EMPLOYED, year)?;
        let unemployed = resolve_or_empty(&self.resolver, &rows, UNEMPLOYED, year)?;

        let points: Vec<Point> = rows
            .keys()
            .filter_map(|key| {
                let r = rows.value(key, &rate)?;
                let a = rows.value(key, &active)?;
                let e = rows.value(key, &employed)?;
                let u = rows.value(key, &unemployed)?;
                Some(Point::new(key, r).with_detail(format!(
                    "경제활동인구: {}명, 취업자: {}명, 실업자: {}명",
                    format_count(a),
                    format_count(e),
                    format_count(u)
                )))
            })
            .collect();
        if points.is_empty() {
            return Err(EmptyReason::NoRows);
        }
        Ok(ChartSpec::new(
            ChartKind::Pie,
            format!("{}년 성별 경제활동참가율 분포", year),
            vec![Series::new("경제활동참가율", points)],
        ))
    }
}

/// Employed people per region as a treemap, with each region's share.
pub struct RegionTreemap {
    resolver: ColumnResolver,
}

impl Default for RegionTreemap {
    fn default() -> Self {
        Self {
            resolver: ColumnResolver::standard(),
        }
    }
}

impl ParameterizedChart for RegionTreemap {
    type Input = Table;

    fn id(&self) -> &str {
        "region_employed_treemap"
    }

    fn render(&self, table: &Table, params: &ChartParams) -> Result<ChartSpec, EmptyReason> {
        let year = pick_year(&self.resolver, table, EMPLOYED, params)?;
        let rows = table.without_key(TOTAL_ROW);
        let col = resolve_or_empty(&self.resolver, &rows, EMPLOYED, year)?;
        let values: Vec<(&str, f64)> = rows
            .keys()
            .zip(rows.numeric_column(&col).unwrap_or_default())
            .filter_map(|(k, v)| v.map(|v| (k, v)))
            .collect();
        let total: f64 = values.iter().map(|(_, v)| v).sum();
        if values.is_empty() {
            return Err(EmptyReason::NoRows);
        }

        let points = values
            .into_iter()
            .map(|(k, v)| {
                let point = Point::new(k, v);
                if total > 0.0 {
                    point.with_extra("share_pct", v / total * 100.0)
                } else {
                    point
                }
            })
            .collect();
        Ok(ChartSpec::new(
            ChartKind::Treemap,
            format!("{}년 권역별 장애인 취업자 수 분포", year),
            vec![Series::new("취업자 수", points)],
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(columns: &[&str], rows: &[&[&str]]) -> Table {
        Table::new(
            columns.iter().map(|c| c.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
        .unwrap()
    }

    fn age_table() -> Table {
        table(
            &[
                "연령",
                "2022_경제활동인구 (명)",
                "2022_비경제활동인구 (명)",
                "2023.1/2_경제활동인구 (명)",
                "2023.1/2_비경제활동인구 (명)",
                "2023.2/2_경제활동인구 (명)",
                "2023.2/2_비경제활동인구 (명)",
                "2023.2/2_고용률 (%)",
                "2023.2/2_실업률 (%)",
            ],
            &[
                &["전체", "1,000", "2,000", "1,010", "1,990", "1,020", "1,980", "35.0", "4.0"],
                &["15~29세", "100", "200", "", "", "110", "190", "30.5", "-"],
                &["30~39세", "150", "100", "", "", "160", "90", "55.0", "3.1"],
            ],
        )
    }

    #[test]
    fn time_series_prefers_second_half() -> Result<(), EmptyReason> {
        let spec = ActivityTimeSeries::default().render(&age_table(), &ChartParams::default())?;
        assert_eq!(spec.kind, ChartKind::Line);
        let active = &spec.series[0].points;
        assert_eq!(active.len(), 2);
        assert_eq!(active[0].label, "2022");
        assert_eq!(active[1].value, 1020.0);
        assert_eq!(spec.series[1].points[1].value, 1980.0);
        Ok(())
    }

    #[test]
    fn time_series_needs_total_row() {
        let t = age_table().without_key(TOTAL_ROW);
        assert_eq!(
            ActivityTimeSeries::default().render(&t, &ChartParams::default()),
            Err(EmptyReason::NoRows)
        );
    }

    #[test]
    fn rates_exclude_total_and_missing_cells() -> Result<(), EmptyReason> {
        let params = ChartParams {
            year: Some(2023),
            ..ChartParams::default()
        };
        let spec = CategoryRates::by_age().render(&age_table(), &params)?;
        assert_eq!(spec.title, "2023년 연령별 고용률 및 실업률");
        assert_eq!(spec.series[0].name, EMPLOYMENT_RATE);
        assert_eq!(spec.series[0].points.len(), 2);
        assert_eq!(spec.series[1].points.len(), 1);
        assert!(spec.series.iter().flat_map(|s| &s.points).all(|p| p.label != TOTAL_ROW));
        Ok(())
    }

    #[test]
    fn rates_default_to_latest_year_and_report_missing_columns() {
        let spec = CategoryRates::by_age()
            .render(&age_table(), &ChartParams::default())
            .unwrap();
        assert!(spec.title.starts_with("2023년"));

        let params = ChartParams {
            year: Some(2019),
            ..ChartParams::default()
        };
        assert_eq!(
            CategoryRates::by_age().render(&age_table(), &params),
            Err(EmptyReason::MissingColumn {
                metric: EMPLOYMENT_RATE.to_string(),
                year: Some(2019)
            })
        );
    }

    #[test]
    fn education_reads_bare_2008_columns() {
        let t = table(
            &["학력", "고용률 (%)", "실업률 (%)", "2009_고용률 (%)", "2009_실업률 (%)"],
            &[&["전체", "40", "5", "41", "6"], &["대졸", "60", "3", "61", "2"]],
        );
        let params = ChartParams {
            year: Some(2008),
            ..ChartParams::default()
        };
        let spec = CategoryRates::by_education().render(&t, &params).unwrap();
        assert_eq!(spec.series[0].points, vec![Point::new("대졸", 60.0)]);
        assert!(CategoryRates::by_age().render(&t, &params).is_err());
    }

    #[test]
    fn sex_rates_keep_the_series_that_resolve() {
        let t = table(
            &["성별", "2024_경활률 (%)"],
            &[&["전체", "38"], &["남", "45"], &["여", "28"]],
        );
        let spec = CategoryRates::by_sex()
            .render(&t, &ChartParams::default())
            .unwrap();
        assert_eq!(spec.series.len(), 1);
        assert_eq!(spec.series[0].name, PARTICIPATION_RATE);
        assert_eq!(spec.series[0].points.len(), 2);
        assert_eq!(spec.notes, vec![format!("2024년 {} 자료 없음", EMPLOYMENT_RATE)]);
    }

    #[test]
    fn participation_pie_details_counts() {
        let t = table(
            &[
                "성별",
                "2024_경활률 (%)",
                "2024_경제활동인구 (명)",
                "2024_취업자 (명)",
                "2024_실업자 (명)",
            ],
            &[
                &["전체", "38", "1000", "950", "50"],
                &["남", "45", "6,000", "5,700", "300"],
                &["여", "28", "4,000", "3,800", "200"],
            ],
        );
        let spec = ParticipationPie::default()
            .render(&t, &ChartParams::default())
            .unwrap();
        let points = &spec.series[0].points;
        assert_eq!(points.len(), 2);
        assert_eq!(
            points[0].detail.as_deref(),
            Some("경제활동인구: 6,000명, 취업자: 5,700명, 실업자: 300명")
        );

        let without_counts = table(&["성별", "2024_경활률 (%)"], &[&["남", "45"]]);
        assert!(matches!(
            ParticipationPie::default().render(&without_counts, &ChartParams::default()),
            Err(EmptyReason::MissingColumn { .. })
        ));
    }

    #[test]
    fn treemap_shares_sum_to_hundred() {
        let t = table(
            &["권역", "2024_취업자 (명)"],
            &[&["전체", "100"], &["수도권", "60"], &["영남권", "40"]],
        );
        let spec = RegionTreemap::default()
            .render(&t, &ChartParams::default())
            .unwrap();
        let shares: f64 = spec.series[0]
            .points
            .iter()
            .map(|p| p.extra["share_pct"])
            .sum();
        assert!((shares - 100.0).abs() < 1e-9);
    }
}
