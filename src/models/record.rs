//! Records flowing through the ingestion pipeline.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// One partition file: `{ "cves": [...] }`.
///
/// Entries stay untyped so a single malformed entry cannot fail the file.
#[derive(Debug, Default, Deserialize)]
pub struct RawPartition {
    #[serde(default)]
    pub cves: Vec<Value>,
}

/// A CVE entry as it appears on disk, with each field still raw JSON.
/// Absent fields are `Value::Null`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    pub id: Value,
    pub embedding_input: Value,
    pub metadata: Value,
}

impl From<Map<String, Value>> for RawRecord {
    fn from(mut entry: Map<String, Value>) -> Self {
        Self {
            id: entry.remove("id").unwrap_or_default(),
            embedding_input: entry.remove("embedding_input").unwrap_or_default(),
            metadata: entry.remove("metadata").unwrap_or_default(),
        }
    }
}

/// Result of reading one raw field with an expected shape.
#[derive(Debug, Clone, PartialEq)]
pub enum Field<T> {
    Present(T),
    Absent,
    /// Present but of a type the pipeline cannot use.
    Mistyped(&'static str),
}

impl<T> Field<T> {
    pub fn present(self) -> Option<T> {
        match self {
            Field::Present(value) => Some(value),
            Field::Absent | Field::Mistyped(_) => None,
        }
    }
}

/// JSON type name, for log lines.
pub fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl RawRecord {
    /// Strings verbatim, numbers as their JSON text.
    pub fn id(&self) -> Field<String> {
        match &self.id {
            Value::Null => Field::Absent,
            Value::String(s) => Field::Present(s.clone()),
            Value::Number(n) => Field::Present(n.to_string()),
            other => Field::Mistyped(json_kind(other)),
        }
    }

    pub fn embedding_input(&self) -> Field<String> {
        match &self.embedding_input {
            Value::Null => Field::Absent,
            Value::String(s) => Field::Present(s.clone()),
            other => Field::Mistyped(json_kind(other)),
        }
    }

    pub fn metadata(&self) -> Field<&Map<String, Value>> {
        match &self.metadata {
            Value::Null => Field::Absent,
            Value::Object(map) => Field::Present(map),
            other => Field::Mistyped(json_kind(other)),
        }
    }
}

/// A metadata value the vector store accepts.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetadataValue {
    String(String),
    Number(Number),
    Bool(bool),
    StringList(Vec<String>),
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<Vec<String>> for MetadataValue {
    fn from(value: Vec<String>) -> Self {
        Self::StringList(value)
    }
}

/// Flat metadata: no nested objects, no nulls, no empty or mixed lists.
pub type SanitizedMetadata = BTreeMap<String, MetadataValue>;

/// A loaded record. `id` and `embedding_input` are not validated here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineRecord {
    pub id: Option<String>,
    pub embedding_input: Option<String>,
    pub metadata: SanitizedMetadata,
}

impl PipelineRecord {
    /// Returns the id and text when both are present and non-empty.
    pub fn required_fields(&self) -> Option<(&str, &str)> {
        let id = self.id.as_deref().filter(|s| !s.is_empty())?;
        let text = self.embedding_input.as_deref().filter(|s| !s.is_empty())?;
        Some((id, text))
    }
}

/// The unit written to the vector store. Overwrites any entry with the same id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpsertUnit {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: SanitizedMetadata,
}
