//! Shared domain types

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{LibrosError, Result};

/// One spreadsheet row: column header to scalar cell value, in column order.
///
/// Column sets vary between source files, so no schema is assumed. Empty cells
/// are absent rather than stored as `null`.
pub type Record = Map<String, Value>;

/// Parse a JSON artifact (an array of objects) into records.
pub fn records_from_json(bytes: &[u8]) -> Result<Vec<Record>> {
    let value: Value = serde_json::from_slice(bytes)?;

    let Value::Array(items) = value else {
        return Err(LibrosError::parse("artifact must be a JSON array"));
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(record) => Ok(record),
            other => Err(LibrosError::parse(format!(
                "artifact entry {} is not an object (found {})",
                index,
                json_kind(&other)
            ))),
        })
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A "blob finalized" notification from the object store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectFinalizedEvent {
    /// Bucket holding the object
    pub bucket: String,
    /// Full object path inside the bucket
    pub name: String,
    /// Declared content type, if the uploader set one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

impl ObjectFinalizedEvent {
    pub fn new(
        bucket: impl Into<String>,
        name: impl Into<String>,
        content_type: Option<&str>,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            name: name.into(),
            content_type: content_type.map(str::to_string),
        }
    }

    /// Last path segment of the object name
    pub fn basename(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }

    /// Directory part of the object name, without trailing slash (empty at bucket root)
    pub fn dirname(&self) -> &str {
        match self.name.rfind('/') {
            Some(idx) => &self.name[..idx],
            None => "",
        }
    }
}
