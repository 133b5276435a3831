//! Animal records and listing pages
//!
//! Records are open-schema JSON objects. Only `id`, `friends` and `born_at`
//! carry meaning to the pipeline; every other field is passed through as-is.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const FIELD_ID: &str = "id";
pub const FIELD_FRIENDS: &str = "friends";
pub const FIELD_BORN_AT: &str = "born_at";

/// One animal, raw or transformed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(field.into(), value)
    }

    pub fn id(&self) -> Option<&Value> {
        self.get(FIELD_ID)
    }

    /// The id rendered for log lines, `<none>` when absent
    pub fn id_label(&self) -> String {
        self.id().map(id_segment).unwrap_or_else(|| "<none>".to_string())
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

/// One response from the listing endpoint
///
/// A missing `items` key reads as an empty page.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub items: Vec<ListingItem>,
    #[serde(default)]
    pub total_pages: Option<u32>,
}

/// Listing stub; only the id is used
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ListingItem {
    pub id: Value,
}

/// Render an opaque id as a URL path segment. Strings are used verbatim.
pub fn id_segment(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
