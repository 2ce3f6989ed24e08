//! Data handed to the narrative and export collaborators.

use num_format::{Locale, ToFormattedString};
use serde::{Deserialize, Serialize};

use crate::series::AnnualSeries;
use crate::stats::KpiResult;

pub const SOURCE: &str = "e-Stat (Portal Site of Official Statistics of Japan)";
pub const INSUFFICIENT_DATA: &str = "insufficient data";

const PLACEHOLDER_FROM: f64 = 18_000.0;
const PLACEHOLDER_TO: f64 = 25_000.0;

/// Stand-in series used when live data is unavailable: values spaced evenly
/// from 18,000 to 25,000 over `start..=end`.
pub fn placeholder_series(start: i32, end: i32) -> AnnualSeries {
    let (start, end) = if start <= end { (start, end) } else { (end, start) };
    let steps = f64::from(end - start);
    AnnualSeries::from_points((start..=end).map(|year| {
        let value = if steps > 0.0 {
            PLACEHOLDER_FROM + (PLACEHOLDER_TO - PLACEHOLDER_FROM) * f64::from(year - start) / steps
        } else {
            PLACEHOLDER_FROM
        };
        (year, value)
    }))
}

fn thousands(v: f64) -> String {
    let rounded = v.round();
    if rounded.abs() < i64::MAX as f64 {
        (rounded as i64).to_formatted_string(&Locale::en)
    } else {
        format!("{:.0}", rounded)
    }
}

fn percent(v: Option<f64>) -> String {
    match v {
        Some(x) if x.is_finite() => format!("{:.1}%", x * 100.0),
        _ => INSUFFICIENT_DATA.to_string(),
    }
}

/// Facts a narrative generator is given. Values are pre-formatted text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportContext {
    pub industry: String,
    pub region: String,
    pub latest: String,
    pub yoy: String,
    pub cagr: String,
    pub source: String,
    /// Latest point is a projection, not an official figure.
    pub nowcast: bool,
    /// Data came from the placeholder series.
    pub placeholder: bool,
}

impl ReportContext {
    pub fn new(
        industry: impl Into<String>,
        region: impl Into<String>,
        kpis: Option<&KpiResult>,
        unit: Option<&str>,
    ) -> Self {
        let latest = match kpis {
            Some(k) => {
                let mut s = format!("{}: {}", k.latest_year, thousands(k.latest_value));
                if let Some(u) = unit.filter(|u| !u.trim().is_empty()) {
                    s.push(' ');
                    s.push_str(u.trim());
                }
                s
            }
            None => INSUFFICIENT_DATA.to_string(),
        };
        Self {
            industry: industry.into(),
            region: region.into(),
            latest,
            yoy: percent(kpis.and_then(|k| k.yoy)),
            cagr: percent(kpis.and_then(|k| k.cagr)),
            source: SOURCE.to_string(),
            nowcast: false,
            placeholder: false,
        }
    }

    pub fn with_nowcast(mut self, nowcast: bool) -> Self {
        self.nowcast = nowcast;
        self
    }

    pub fn with_placeholder(mut self, placeholder: bool) -> Self {
        self.placeholder = placeholder;
        self
    }

    /// Ordered `(key, value)` pairs.
    pub fn facts(&self) -> Vec<(&'static str, String)> {
        let mut facts = vec![
            ("Industry", self.industry.clone()),
            ("Region", self.region.clone()),
            ("Latest market size", self.latest.clone()),
            ("Year over year", self.yoy.clone()),
            ("CAGR", self.cagr.clone()),
            ("Source", self.source.clone()),
        ];
        if self.nowcast {
            facts.push(("Note", "latest value is a nowcast estimate".to_string()));
        }
        if self.placeholder {
            facts.push(("Note", "sample data, not official statistics".to_string()));
        }
        facts
    }

    /// `- key: value` lines.
    pub fn to_bullets(&self) -> String {
        self.facts()
            .iter()
            .map(|(k, v)| format!("- {}: {}", k, v))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_spans_range() {
        let s = placeholder_series(2015, 2021);
        assert_eq!(s.len(), 7);
        assert_eq!(s.first(), Some((2015, 18_000.0)));
        assert_eq!(s.latest(), Some((2021, 25_000.0)));
        assert_eq!(placeholder_series(2020, 2020).latest(), Some((2020, 18_000.0)));
    }

    #[test]
    fn undefined_kpis_render_as_insufficient() {
        let k = KpiResult {
            latest_year: 2020,
            latest_value: 1_234_567.4,
            yoy: None,
            cagr: Some(0.052),
        };
        let ctx = ReportContext::new("飲食店", "東京都", Some(&k), Some("万円")).with_nowcast(true);
        assert_eq!(ctx.latest, "2020: 1,234,567 万円");
        assert_eq!(ctx.yoy, INSUFFICIENT_DATA);
        assert_eq!(ctx.cagr, "5.2%");
        let bullets = ctx.to_bullets();
        assert!(bullets.starts_with("- Industry: 飲食店\n- Region: 東京都"));
        assert!(bullets.contains("nowcast"));
    }
}
