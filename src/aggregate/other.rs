use anyhow::{anyhow, Result};
use serde::Serialize;

pub const OTHER_LABEL: &str = "기타";
pub const DEFAULT_THRESHOLD_PCT: f64 = 4.0;

/// One pie slice. `detail` lists the members of the `기타` slice.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Slice {
    pub label: String,
    pub value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl Slice {
    fn plain(label: &str, value: f64) -> Self {
        Self {
            label: label.to_string(),
            value,
            detail: None,
        }
    }
}

/// `6.0` → `6%`, `5.56` → `5.6%`.
fn format_pct(pct: f64) -> String {
    let rounded = (pct * 10.0).round() / 10.0;
    if rounded.fract() == 0.0 {
        format!("{}%", rounded as i64)
    } else {
        format!("{:.1}%", rounded)
    }
}

pub fn validate_threshold(threshold_pct: f64) -> Result<f64> {
    if (0.0..=100.0).contains(&threshold_pct) {
        Ok(threshold_pct)
    } else {
        Err(anyhow!(
            "other threshold must lie in [0, 100], got {}",
            threshold_pct
        ))
    }
}

/// Fold every category whose share of the total is below `threshold_pct`
/// into one `기타` slice appended last. Kept categories stay in input order.
/// A zero total passes through unchanged.
pub fn bucket_other(items: &[(String, f64)], threshold_pct: f64) -> Result<Vec<Slice>> {
    let threshold = validate_threshold(threshold_pct)?;
    let total: f64 = items.iter().map(|(_, v)| v).sum();
    if total <= 0.0 {
        return Ok(items.iter().map(|(l, v)| Slice::plain(l, *v)).collect());
    }

    let mut kept = Vec::with_capacity(items.len());
    let mut small = Vec::new();
    for (label, value) in items {
        let pct = value / total * 100.0;
        if pct < threshold {
            small.push((label, *value, pct));
        } else {
            kept.push(Slice::plain(label, *value));
        }
    }

    if !small.is_empty() {
        let detail = small
            .iter()
            .map(|(label, _, pct)| format!("{}: {}", label, format_pct(*pct)))
            .collect::<Vec<_>>()
            .join(", ");
        kept.push(Slice {
            label: OTHER_LABEL.to_string(),
            value: small.iter().map(|(_, v, _)| v).sum(),
            detail: Some(detail),
        });
    }
    Ok(kept)
}
