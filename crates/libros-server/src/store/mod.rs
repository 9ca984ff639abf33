//! Document store
//!
//! A collection-of-documents store with atomic batched writes. Documents are flat
//! JSON objects addressed by `(collection, id)`. The read side supports exactly the
//! two shapes the search API needs:
//!
//! - scan a collection in id order
//! - range-filter one string field (`lower <= value <= upper`), ordered by that
//!   field and then by id
//!
//! Both resume strictly after a cursor snapshot and stop at a limit.
//!
//! Ordering is byte order of the UTF-8 strings in every implementation.

use async_trait::async_trait;
use libros_common::types::Record;
use serde_json::Value;
use thiserror::Error;

pub mod memory;
pub mod postgres;

pub use memory::MemoryDocumentStore;
pub use postgres::PgDocumentStore;

/// Default ceiling on operations per atomic unit
pub const DEFAULT_MAX_BATCH_OPS: usize = 500;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Write batch is full ({max} operations)")]
    BatchFull { max: usize },

    #[error("Cursor document '{0}' cannot be used for this ordering")]
    InvalidCursor(String),

    #[error("Commit failed: {0}")]
    CommitFailed(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// A stored document as read back from a collection.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSnapshot {
    pub id: String,
    pub data: Record,
}

impl DocumentSnapshot {
    pub fn new(id: impl Into<String>, data: Record) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }

    /// The document as a JSON object with `id` first, followed by its fields.
    pub fn to_json(&self) -> Value {
        let mut object = Record::with_capacity(self.data.len() + 1);
        object.insert("id".to_string(), Value::String(self.id.clone()));
        for (key, value) in &self.data {
            if key != "id" {
                object.insert(key.clone(), value.clone());
            }
        }
        Value::Object(object)
    }

    /// String value of `field`, if present and a string
    pub fn str_field(&self, field: &str) -> Option<&str> {
        self.data.get(field).and_then(Value::as_str)
    }
}

/// A full-overwrite write of one document.
#[derive(Debug, Clone, PartialEq)]
pub struct SetOperation {
    pub collection: String,
    pub id: String,
    pub data: Record,
}

/// Writes staged for one atomic commit.
#[derive(Debug, Clone)]
pub struct WriteBatch {
    max_ops: usize,
    ops: Vec<SetOperation>,
}

impl WriteBatch {
    pub fn new(max_ops: usize) -> Self {
        Self {
            max_ops,
            ops: Vec::new(),
        }
    }

    /// Stage a set (overwrite) of `collection/id`. Fails once the unit ceiling is reached.
    pub fn set(
        &mut self,
        collection: impl Into<String>,
        id: impl Into<String>,
        data: Record,
    ) -> StoreResult<()> {
        if self.ops.len() >= self.max_ops {
            return Err(StoreError::BatchFull { max: self.max_ops });
        }

        self.ops.push(SetOperation {
            collection: collection.into(),
            id: id.into(),
            data,
        });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn operations(&self) -> &[SetOperation] {
        &self.ops
    }

    pub fn into_operations(self) -> Vec<SetOperation> {
        self.ops
    }
}

/// Inclusive string range on a single field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRange {
    pub field: String,
    pub lower: String,
    pub upper: String,
}

impl FieldRange {
    pub fn contains(&self, value: &str) -> bool {
        self.lower.as_str() <= value && value <= self.upper.as_str()
    }
}

/// A keyset-paginated read over one collection.
#[derive(Debug, Clone)]
pub struct DocumentQuery {
    pub collection: String,
    pub range: Option<FieldRange>,
    pub start_after: Option<DocumentSnapshot>,
    pub limit: usize,
}

impl DocumentQuery {
    /// All documents of `collection` in id order
    pub fn by_id(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            range: None,
            start_after: None,
            limit: usize::MAX,
        }
    }

    /// Documents whose `field` is a string within `[lower, upper]`, ordered by that field
    pub fn field_range(
        collection: impl Into<String>,
        field: impl Into<String>,
        lower: impl Into<String>,
        upper: impl Into<String>,
    ) -> Self {
        Self {
            collection: collection.into(),
            range: Some(FieldRange {
                field: field.into(),
                lower: lower.into(),
                upper: upper.into(),
            }),
            start_after: None,
            limit: usize::MAX,
        }
    }

    pub fn start_after(mut self, cursor: DocumentSnapshot) -> Self {
        self.start_after = Some(cursor);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Ordering key of the cursor under this query: `(field value, id)` for range
    /// queries, `("", id)` for id scans.
    pub fn cursor_key(&self) -> StoreResult<Option<(String, String)>> {
        let Some(cursor) = &self.start_after else {
            return Ok(None);
        };

        match &self.range {
            None => Ok(Some((String::new(), cursor.id.clone()))),
            Some(range) => cursor
                .str_field(&range.field)
                .map(|value| Some((value.to_string(), cursor.id.clone())))
                .ok_or_else(|| StoreError::InvalidCursor(cursor.id.clone())),
        }
    }
}

/// Document store operations used by the batch loader and the search API.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Maximum number of operations one [`WriteBatch`] may hold
    fn max_batch_ops(&self) -> usize;

    fn batch(&self) -> WriteBatch {
        WriteBatch::new(self.max_batch_ops())
    }

    /// Apply every operation of `batch` or none of them. Returns the number applied.
    async fn commit(&self, batch: WriteBatch) -> StoreResult<usize>;

    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<DocumentSnapshot>>;

    /// Names of all non-empty collections, sorted
    async fn list_collections(&self) -> StoreResult<Vec<String>>;

    async fn query(&self, query: &DocumentQuery) -> StoreResult<Vec<DocumentSnapshot>>;

    /// Cheap round trip used by the health endpoint
    async fn ping(&self) -> StoreResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_write_batch_ceiling() {
        let mut batch = WriteBatch::new(2);
        batch.set("libro_234", "a", Record::new()).unwrap();
        batch.set("libro_234", "b", Record::new()).unwrap();

        let err = batch.set("libro_234", "c", Record::new()).unwrap_err();
        assert!(matches!(err, StoreError::BatchFull { max: 2 }));
        assert_eq!(batch.len(), 2);
    }

    #[test]
    fn test_snapshot_to_json_puts_id_first() {
        let snapshot = DocumentSnapshot::new("doc_0", record(json!({"Nombre": "X", "id": "ignored"})));
        let value = snapshot.to_json();

        let keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["id", "Nombre"]);
        assert_eq!(value["id"], json!("doc_0"));
    }

    #[test]
    fn test_cursor_key_for_range_requires_string_field() {
        let cursor = DocumentSnapshot::new("doc_1", record(json!({"Nombre": 5})));
        let query = DocumentQuery::field_range("c", "Nombre", "A", "B").start_after(cursor);

        assert!(matches!(query.cursor_key(), Err(StoreError::InvalidCursor(_))));
    }

    #[test]
    fn test_cursor_key_for_id_scan() {
        let cursor = DocumentSnapshot::new("doc_1", Record::new());
        let query = DocumentQuery::by_id("c").start_after(cursor);

        assert_eq!(
            query.cursor_key().unwrap(),
            Some((String::new(), "doc_1".to_string()))
        );
    }

    #[test]
    fn test_field_range_contains_is_inclusive() {
        let range = FieldRange {
            field: "f".to_string(),
            lower: "AB".to_string(),
            upper: "AB\u{10FFFF}".to_string(),
        };

        assert!(range.contains("AB"));
        assert!(range.contains("ABC"));
        assert!(range.contains("AB123"));
        assert!(!range.contains("AA"));
        assert!(!range.contains("AC"));
    }
}
