//! One-period-ahead extrapolation of an annual series.
//!
//! Official annual figures lag by a year or more. The engine appends a
//! projected `latest_year + 1` point, either by compounding sub-period growth
//! rates (e.g. monthly % changes) onto the latest observation, or by
//! exponentially smoothing the history.

use log::warn;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::series::AnnualSeries;

pub const DEFAULT_SMOOTHING: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NowcastMethod {
    /// Compound the sub-period growth rates onto the latest value.
    #[default]
    Cumulative,
    /// Exponentially weighted mean of the history.
    Smoothed,
}

impl FromStr for NowcastMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cumulative" | "cumrate" => Ok(Self::Cumulative),
            "smoothed" | "ewm" => Ok(Self::Smoothed),
            other => Err(format!("unknown nowcast method: {}", other)),
        }
    }
}

impl fmt::Display for NowcastMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Cumulative => "cumulative",
            Self::Smoothed => "smoothed",
        })
    }
}

/// Compound `growth` (percent, `None` = 0 %) onto `latest`.
///
/// Returns `(projected, rate)`; `rate` is 0 when `latest` is 0.
pub fn cumulative_growth(latest: f64, growth: &[Option<f64>]) -> (f64, f64) {
    let factor: f64 = growth
        .iter()
        .map(|g| 1.0 + g.unwrap_or(0.0) / 100.0)
        .product();
    let projected = latest * factor;
    let rate = if latest == 0.0 {
        0.0
    } else {
        (projected - latest) / latest
    };
    (projected, rate)
}

/// Adjusted exponentially weighted mean; the newest value has weight 1, the
/// one before `(1 - alpha)`, and so on.
pub fn smoothed_mean(values: impl IntoIterator<Item = f64>, alpha: f64) -> Option<f64> {
    let decay = 1.0 - alpha;
    let mut num = 0.0;
    let mut den = 0.0;
    let mut seen = false;
    for x in values {
        num = num * decay + x;
        den = den * decay + 1.0;
        seen = true;
    }
    seen.then(|| num / den)
}

fn clamp_alpha(alpha: f64) -> f64 {
    if alpha.is_finite() && alpha > 0.0 && alpha <= 1.0 {
        return alpha;
    }
    let clamped = if alpha.is_nan() {
        DEFAULT_SMOOTHING
    } else {
        alpha.clamp(f64::EPSILON, 1.0)
    };
    warn!("smoothing factor {} outside (0, 1]; using {}", alpha, clamped);
    clamped
}

/// Append a projection for the year after the latest observation.
///
/// An empty series is returned unchanged. A series that already carries a
/// projection is re-projected from its observed points, so repeated calls with
/// the same inputs give the same result. `Cumulative` without any growth data
/// falls back to `Smoothed`.
pub fn apply(
    series: &AnnualSeries,
    sub_period_growth: &[Option<f64>],
    method: NowcastMethod,
    smoothing_factor: f64,
) -> AnnualSeries {
    let observed = series.observed();
    let Some((latest_year, latest_value)) = observed.latest() else {
        return series.clone();
    };

    let projected = match method {
        NowcastMethod::Cumulative if !sub_period_growth.is_empty() => {
            cumulative_growth(latest_value, sub_period_growth).0
        }
        _ => smoothed_mean(observed.values(), clamp_alpha(smoothing_factor))
            .unwrap_or(latest_value),
    };

    observed.with_projection(latest_year + 1, projected)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smoothing_matches_adjusted_ewm() {
        // alpha 0.5: weights 0.25, 0.5, 1 over [1, 2, 3]
        let m = smoothed_mean([1.0, 2.0, 3.0], 0.5).unwrap();
        assert!((m - (0.25 + 1.0 + 3.0) / 1.75).abs() < 1e-12);
        assert_eq!(smoothed_mean(std::iter::empty(), 0.3), None);
    }

    #[test]
    fn zero_latest_reports_zero_rate() {
        let (projected, rate) = cumulative_growth(0.0, &[Some(5.0)]);
        assert_eq!(projected, 0.0);
        assert_eq!(rate, 0.0);
    }

    #[test]
    fn method_names_parse() {
        assert_eq!("cumrate".parse::<NowcastMethod>(), Ok(NowcastMethod::Cumulative));
        assert_eq!("Smoothed".parse::<NowcastMethod>(), Ok(NowcastMethod::Smoothed));
        assert!("linear".parse::<NowcastMethod>().is_err());
    }
}
