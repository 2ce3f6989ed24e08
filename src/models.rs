use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::{EstatError, Result};

/// Table-specific query parameters (`cdArea`, `time`, `cdCat01`, ...).
///
/// A `BTreeMap` so that two logically equal parameter sets always iterate in
/// the same order; the response cache relies on that.
pub type Params = BTreeMap<String, String>;

/// Placeholder e-Stat uses for "no data" in the `$` field.
pub const MISSING_SYMBOL: &str = "-";

/// `RESULT` block of a `getStatsData` response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiResult {
    /// `0` means success; anything else is an API-level error.
    /// Some responses encode it as a string, others as a number.
    #[serde(rename = "STATUS", deserialize_with = "de_u32_from_string_or_number")]
    pub status: u32,
    #[serde(rename = "ERROR_MSG", default)]
    pub error_msg: Option<String>,
}

/// Serde helper: parse `u32` from either a JSON number or a string.
fn de_u32_from_string_or_number<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::{self, Visitor};
    struct U32Visitor;

    impl<'de> Visitor<'de> for U32Visitor {
        type Value = u32;

        fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            write!(f, "a string or integer representing a non-negative status code")
        }

        fn visit_u64<E>(self, v: u64) -> std::result::Result<Self::Value, E>
        where
            E: de::Error,
        {
            u32::try_from(v).map_err(E::custom)
        }

        fn visit_i64<E>(self, v: i64) -> std::result::Result<Self::Value, E>
        where
            E: de::Error,
        {
            u32::try_from(v).map_err(|_| E::custom("negative value for status"))
        }

        fn visit_str<E>(self, s: &str) -> std::result::Result<Self::Value, E>
        where
            E: de::Error,
        {
            s.trim().parse::<u32>().map_err(E::custom)
        }
    }

    deserializer.deserialize_any(U32Visitor)
}

/// Serde helper: the `$` cell is usually a string but numbers show up too.
fn de_opt_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::{self, Visitor};
    struct TextVisitor;

    impl<'de> Visitor<'de> for TextVisitor {
        type Value = Option<String>;

        fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            write!(f, "a string, a number, or null")
        }

        fn visit_str<E>(self, s: &str) -> std::result::Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(s.to_string()))
        }

        fn visit_u64<E>(self, v: u64) -> std::result::Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(v.to_string()))
        }

        fn visit_i64<E>(self, v: i64) -> std::result::Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(v.to_string()))
        }

        fn visit_f64<E>(self, v: f64) -> std::result::Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(v.to_string()))
        }

        fn visit_unit<E>(self) -> std::result::Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }

        fn visit_none<E>(self) -> std::result::Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }
    }

    deserializer.deserialize_any(TextVisitor)
}

/// Raw `VALUE` entry from the API. Every attribute is optional because the
/// API omits dimensions a table does not have.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RawValueRecord {
    #[serde(rename = "@cat01", default)]
    pub cat01: Option<String>,
    #[serde(rename = "@area", default)]
    pub area: Option<String>,
    #[serde(rename = "@time", default)]
    pub time: Option<String>,
    #[serde(rename = "@tab", default)]
    pub tab: Option<String>,
    #[serde(rename = "@classCode", default)]
    pub class_code: Option<String>,
    #[serde(rename = "$", default, deserialize_with = "de_opt_text")]
    pub value: Option<String>,
}

impl RawValueRecord {
    /// Numeric value of the cell. `None` for the `-` placeholder, blanks,
    /// suppression symbols, and anything else that is not a finite float.
    pub fn numeric_value(&self) -> Option<f64> {
        let text = self.value.as_deref()?.trim();
        if text.is_empty() || text == MISSING_SYMBOL {
            return None;
        }
        text.parse::<f64>().ok().filter(|v| v.is_finite())
    }
}

/// Tidy structure used by this crate (one row = one observation).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NormalizedRecord {
    /// Resolved `cat01` label.
    pub category: Option<String>,
    pub area: Option<String>,
    pub time: Option<String>,
    pub tab: Option<String>,
    pub class_code: Option<String>,
    pub value: Option<f64>,
}

/// The parts of a `getStatsData` payload this crate works with.
///
/// Accepts both the live envelope (`{"GET_STATS_DATA": {"RESULT": .., "STATISTICAL_DATA": ..}}`)
/// and a bare `{"STATISTICAL_DATA": {"RESULT": .., ..}}` document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawResponse {
    pub result: Option<ApiResult>,
    /// `CLASS_INF.CLASS_OBJ`, always as a list.
    pub class_objs: Vec<Value>,
    /// `DATA_INF.VALUE`, always as a list. Entries are left untyped so that
    /// one malformed row cannot fail the whole table.
    pub values: Vec<Value>,
}

impl RawResponse {
    pub fn from_json(body: &Value) -> Self {
        let envelope = body.get("GET_STATS_DATA").unwrap_or(body);
        let data = envelope.get("STATISTICAL_DATA").unwrap_or(&Value::Null);
        let result = envelope
            .get("RESULT")
            .or_else(|| data.get("RESULT"))
            .and_then(|r| serde_json::from_value::<ApiResult>(r.clone()).ok());
        Self {
            result,
            class_objs: one_or_many(data.pointer("/CLASS_INF/CLASS_OBJ")),
            values: one_or_many(data.pointer("/DATA_INF/VALUE")),
        }
    }

    /// Surface an API-level error carried inside an HTTP 200 response.
    pub fn check_status(&self) -> Result<()> {
        match &self.result {
            Some(r) if r.status == 0 => Ok(()),
            Some(r) => Err(EstatError::RemoteApi {
                status: r.status,
                message: r
                    .error_msg
                    .clone()
                    .unwrap_or_else(|| "e-Stat API returned an error".into()),
            }),
            None => Err(EstatError::Decode(
                "response carried no RESULT block".into(),
            )),
        }
    }
}

/// The API collapses single-element lists into a bare object.
pub(crate) fn one_or_many(v: Option<&Value>) -> Vec<Value> {
    match v {
        Some(Value::Array(items)) => items.clone(),
        Some(Value::Null) | None => Vec::new(),
        Some(other) => vec![other.clone()],
    }
}
