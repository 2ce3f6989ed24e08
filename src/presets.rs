//! Named table presets: a `statsDataId` plus the query defaults that go with it.
//!
//! Presets are a JSON object keyed by preset id:
//! ```json
//! { "household_spending": { "name": "...", "statsDataId": "0003109558",
//!                           "default_params": { "cdCat01": "100" } } }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;

use crate::areas;
use crate::error::{EstatError, Result};
use crate::models::Params;

const BUNDLED: &str = include_str!("../data/sample_queries.json");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preset {
    pub name: String,
    #[serde(rename = "statsDataId")]
    pub stats_data_id: String,
    #[serde(default)]
    pub default_params: Params,
}

impl Preset {
    /// Query for this table over `period`, optionally narrowed to one area.
    pub fn params(&self, period: (i32, i32), area: Option<&str>) -> Params {
        areas::prepare_params(&self.default_params, period, area)
    }
}

/// Presets ordered by id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Presets {
    entries: BTreeMap<String, Preset>,
}

impl Presets {
    pub fn from_json_str(text: &str) -> Result<Self> {
        let entries: BTreeMap<String, Preset> =
            serde_json::from_str(text).map_err(|e| EstatError::Presets(e.to_string()))?;
        if let Some((id, _)) = entries.iter().find(|(_, p)| p.stats_data_id.trim().is_empty()) {
            return Err(EstatError::Presets(format!("preset {:?} has no statsDataId", id)));
        }
        Ok(Self { entries })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| EstatError::Presets(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&text)
    }

    /// Presets shipped with the crate.
    pub fn bundled() -> Result<&'static Presets> {
        static BUNDLED_PRESETS: OnceLock<Presets> = OnceLock::new();
        if let Some(p) = BUNDLED_PRESETS.get() {
            return Ok(p);
        }
        let parsed = Self::from_json_str(BUNDLED)?;
        Ok(BUNDLED_PRESETS.get_or_init(|| parsed))
    }

    pub fn get(&self, id: &str) -> Option<&Preset> {
        self.entries.get(id.trim())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Preset)> + '_ {
        self.entries.iter().map(|(id, p)| (id.as_str(), p))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
