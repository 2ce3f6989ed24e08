use crate::series::AnnualSeries;
use serde::{Deserialize, Serialize};

/// Headline indicators for an annual series.
///
/// `None` means "undefined" (insufficient data), which is not the same as 0 %.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct KpiResult {
    pub latest_year: i32,
    pub latest_value: f64,
    /// `(latest - previous) / previous` against `latest_year - 1`.
    pub yoy: Option<f64>,
    /// Compound annual growth from the first to the latest year.
    pub cagr: Option<f64>,
}

/// Compute KPIs over the finite points of `series`.
///
/// Returns `None` when no finite point remains. Missing points are dropped,
/// not zero-filled.
pub fn compute(series: &AnnualSeries) -> Option<KpiResult> {
    let points: Vec<(i32, f64)> = series.iter().filter(|(_, v)| v.is_finite()).collect();
    let &(first_year, first_value) = points.first()?;
    let &(latest_year, latest_value) = points.last()?;

    let yoy = points
        .iter()
        .find(|(y, _)| *y == latest_year - 1)
        .map(|&(_, prev)| prev)
        .filter(|prev| *prev > 0.0)
        .map(|prev| (latest_value - prev) / prev);

    let span = (latest_year - first_year).max(1);
    let cagr = if first_value > 0.0 {
        Some((latest_value / first_value).powf(1.0 / f64::from(span)) - 1.0)
            .filter(|c| c.is_finite())
    } else {
        None
    };

    Some(KpiResult {
        latest_year,
        latest_value,
        yoy,
        cagr,
    })
}
