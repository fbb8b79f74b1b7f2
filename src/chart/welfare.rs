//! Recipient trends for one welfare group, nationally or for one province.

use super::{ChartKind, ChartParams, ChartSpec, EmptyReason, ParameterizedChart, Point, Series};
use crate::region::{normalize_region_name, NATIONAL};
use crate::welfare::{
    WelfareTable, BASIC_GENERAL, BASIC_SEVERE, NEAR_POVERTY_EXCESS, NEAR_POVERTY_GENERAL,
};

/// Line of one recipient group over the years. `params.region` picks the
/// province; without it the per-year national sum is drawn.
pub struct WelfareTrend {
    id: &'static str,
    metric: &'static str,
}

impl WelfareTrend {
    pub fn basic_general() -> Self {
        Self {
            id: "basic_livelihood_general_trend",
            metric: BASIC_GENERAL,
        }
    }

    pub fn basic_severe() -> Self {
        Self {
            id: "basic_livelihood_severe_trend",
            metric: BASIC_SEVERE,
        }
    }

    pub fn near_poverty_general() -> Self {
        Self {
            id: "near_poverty_general_trend",
            metric: NEAR_POVERTY_GENERAL,
        }
    }

    pub fn near_poverty_excess() -> Self {
        Self {
            id: "near_poverty_excess_trend",
            metric: NEAR_POVERTY_EXCESS,
        }
    }

    /// One chart per recipient group, in tab order.
    pub fn all() -> [WelfareTrend; 4] {
        [
            Self::basic_general(),
            Self::basic_severe(),
            Self::near_poverty_general(),
            Self::near_poverty_excess(),
        ]
    }
}

impl ParameterizedChart for WelfareTrend {
    type Input = WelfareTable;

    fn id(&self) -> &str {
        self.id
    }

    fn render(&self, table: &WelfareTable, params: &ChartParams) -> Result<ChartSpec, EmptyReason> {
        let region = params
            .region
            .as_deref()
            .map(normalize_region_name)
            .unwrap_or_else(|| NATIONAL.to_string());

        let values = if region == NATIONAL {
            table.national_series(self.metric)
        } else {
            if !table.provinces().contains(&region.as_str()) {
                return Err(EmptyReason::InvalidParameter(format!(
                    "unknown region '{}'",
                    region
                )));
            }
            table.province_series(&region, self.metric)
        }
        .ok_or_else(|| EmptyReason::MissingColumn {
            metric: self.metric.to_string(),
            year: None,
        })?;
        if values.is_empty() {
            return Err(EmptyReason::NoRows);
        }

        let points = values
            .into_iter()
            .map(|(year, v)| Point::new(year.to_string(), v))
            .collect();
        Ok(ChartSpec::new(
            ChartKind::Line,
            format!("{} {} 변화 추이", region, self.metric),
            vec![Series::new(self.metric, points)],
        ))
    }
}
