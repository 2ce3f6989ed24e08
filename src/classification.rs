//! Code → label lookup built from a response's `CLASS_INF.CLASS_OBJ` block.
//!
//! e-Stat encodes every dimension of a table (`cat01`, `area`, `time`, ...) as
//! opaque codes and ships the labels separately. Partial metadata must never
//! block the numeric data, so malformed dimensions are logged and skipped.

use ahash::AHashMap;
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::one_or_many;

/// One `CLASS` item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClassItem {
    #[serde(rename = "@code")]
    pub code: String,
    #[serde(rename = "@name", default)]
    pub name: String,
}

/// One classification dimension with its items in wire order.
#[derive(Debug, Clone, Default)]
pub struct ClassDimension {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub items: Vec<ClassItem>,
    lookup: AHashMap<String, usize>,
}

impl ClassDimension {
    pub fn label(&self, code: &str) -> Option<&str> {
        self.lookup
            .get(code)
            .map(|&i| self.items[i].name.as_str())
    }

    fn parse(obj: &Value) -> Option<Self> {
        let id = obj.get("@id")?.as_str()?.trim();
        if id.is_empty() {
            return None;
        }
        let items: Vec<ClassItem> = one_or_many(obj.get("CLASS"))
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<_, _>>()
            .ok()?;
        let mut lookup = AHashMap::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            // first occurrence wins on duplicate codes
            lookup.entry(item.code.clone()).or_insert(i);
        }
        Some(Self {
            id: id.to_string(),
            name: str_field(obj, "@name").unwrap_or_default(),
            description: str_field(obj, "@description"),
            items,
            lookup,
        })
    }
}

fn str_field(obj: &Value, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Mapping from dimension id to its code → label table.
#[derive(Debug, Clone, Default)]
pub struct ClassificationIndex {
    dimensions: Vec<ClassDimension>,
    by_id: AHashMap<String, usize>,
}

impl ClassificationIndex {
    /// Build the index from the `CLASS_OBJ` list of a response.
    pub fn build(class_objs: &[Value]) -> Self {
        let mut index = Self::default();
        for obj in class_objs {
            match ClassDimension::parse(obj) {
                Some(dim) => {
                    if index.by_id.contains_key(&dim.id) {
                        warn!("duplicate classification dimension {:?}; keeping the first", dim.id);
                        continue;
                    }
                    index.by_id.insert(dim.id.clone(), index.dimensions.len());
                    index.dimensions.push(dim);
                }
                None => warn!("skipping malformed classification object: {}", obj),
            }
        }
        index
    }

    /// Label for `code` in `dimension`, or `code` itself when either is unknown.
    pub fn resolve<'a>(&'a self, dimension: &str, code: &'a str) -> &'a str {
        self.dimension(dimension)
            .and_then(|d| d.label(code))
            .unwrap_or(code)
    }

    /// Like [`resolve`](Self::resolve) for the optional attributes of a value row.
    pub fn resolve_opt(&self, dimension: &str, code: Option<&str>) -> Option<String> {
        code.map(|c| self.resolve(dimension, c).to_string())
    }

    pub fn dimension(&self, id: &str) -> Option<&ClassDimension> {
        self.by_id.get(id).map(|&i| &self.dimensions[i])
    }

    /// Dimensions in the order the API listed them.
    pub fn dimensions(&self) -> impl Iterator<Item = &ClassDimension> {
        self.dimensions.iter()
    }

    pub fn len(&self) -> usize {
        self.dimensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dimensions.is_empty()
    }
}
