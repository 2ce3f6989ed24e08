use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::LazyLock;

use crate::models::NormalizedRecord;

static YEAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d{4})").expect("static regex"));

/// First four-digit run in a time label: `"2019年"` → 2019, `"2019000000"` → 2019.
pub fn extract_year(label: &str) -> Option<i32> {
    YEAR.captures(label)?.get(1)?.as_str().parse().ok()
}

/// Annual aggregate, ascending by year.
///
/// When `nowcast` is set, the latest point is a projection rather than an
/// observation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnualSeries {
    points: BTreeMap<i32, f64>,
    nowcast: bool,
}

impl AnnualSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Observed points; a repeated year replaces the earlier value.
    pub fn from_points(points: impl IntoIterator<Item = (i32, f64)>) -> Self {
        Self {
            points: points.into_iter().collect(),
            nowcast: false,
        }
    }

    /// Sum of all non-missing values per year. Rows without a recognizable
    /// year or without a value are skipped.
    pub fn from_records(records: &[NormalizedRecord]) -> Self {
        let mut points: BTreeMap<i32, f64> = BTreeMap::new();
        for r in records {
            let (Some(year), Some(value)) = (r.time.as_deref().and_then(extract_year), r.value)
            else {
                continue;
            };
            *points.entry(year).or_default() += value;
        }
        Self {
            points,
            nowcast: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_nowcast(&self) -> bool {
        self.nowcast
    }

    pub fn get(&self, year: i32) -> Option<f64> {
        self.points.get(&year).copied()
    }

    pub fn first(&self) -> Option<(i32, f64)> {
        self.points.first_key_value().map(|(y, v)| (*y, *v))
    }

    pub fn latest(&self) -> Option<(i32, f64)> {
        self.points.last_key_value().map(|(y, v)| (*y, *v))
    }

    pub fn iter(&self) -> impl Iterator<Item = (i32, f64)> + '_ {
        self.points.iter().map(|(y, v)| (*y, *v))
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.values().copied()
    }

    /// The series without its projected point.
    pub fn observed(&self) -> Self {
        let mut points = self.points.clone();
        if self.nowcast {
            points.pop_last();
        }
        Self {
            points,
            nowcast: false,
        }
    }

    /// Append a projection after the latest year and mark the series.
    pub(crate) fn with_projection(mut self, year: i32, value: f64) -> Self {
        self.points.insert(year, value);
        self.nowcast = true;
        self
    }
}
