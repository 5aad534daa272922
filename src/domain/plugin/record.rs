//! Domain records and their enriched form

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The unit of analysis (an email, note, task, ...). Immutable as received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainRecord {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl DomainRecord {
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            fields: Map::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn field_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// All top-level string fields, in key order
    pub fn text_fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .filter_map(|(k, v)| v.as_str().map(|s| (k.as_str(), s)))
    }
}

/// A shallow copy of a record with an enrichment namespace merged in.
///
/// Serialized as `{"record": {..}, "enrichment": {..}}` so that record fields
/// never share a JSON object with the enrichment namespace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRecord {
    pub record: DomainRecord,
    #[serde(default)]
    pub enrichment: Map<String, Value>,
}

impl EnrichedRecord {
    pub fn from_record(record: &DomainRecord) -> Self {
        Self {
            record: record.clone(),
            enrichment: Map::new(),
        }
    }

    /// Shallow-merge a plugin namespace. Existing keys are overwritten.
    pub fn merge(&mut self, namespace: &Map<String, Value>) {
        for (key, value) in namespace {
            self.enrichment.insert(key.clone(), value.clone());
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.enrichment.get(key)
    }
}
