//! Batch loader
//!
//! Writes an artifact's records into one collection. Records are split into chunks
//! of at most [`DocumentStore::max_batch_ops`] and each chunk is committed as its own
//! atomic unit. A failed chunk is retried in place; once its attempts are used up
//! the load stops, leaving earlier chunks committed. Ids are stable and every write
//! is a full overwrite, so redelivering the whole artifact afterwards is safe.

use libros_common::types::Record;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use super::retry::RetryPolicy;
use crate::store::{DocumentStore, StoreError};

/// Commit attempts per chunk before the load is abandoned
pub const DEFAULT_CHUNK_ATTEMPTS: u32 = 3;

#[derive(Error, Debug)]
#[error("Load into '{collection}' stopped after committing {committed} of {total} documents: {source}")]
pub struct LoadError {
    pub collection: String,
    pub committed: usize,
    pub total: usize,
    #[source]
    pub source: StoreError,
}

/// Id of the record at `index`: its own non-empty `id`, else `doc_<index>`.
pub fn document_id(record: &Record, index: usize) -> String {
    match record.get("id") {
        Some(Value::String(id)) if !id.is_empty() => id.clone(),
        Some(Value::Number(n)) if n.as_f64() != Some(0.0) => n.to_string(),
        _ => format!("doc_{}", index),
    }
}

pub struct BatchLoader {
    store: Arc<dyn DocumentStore>,
    retry: RetryPolicy,
    max_attempts: u32,
}

impl BatchLoader {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            retry: RetryPolicy::new(2, Duration::from_millis(200))
                .maximum_interval(Duration::from_secs(5)),
            max_attempts: DEFAULT_CHUNK_ATTEMPTS,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy, max_attempts: u32) -> Self {
        self.retry = retry;
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Load `records` into `collection`, returning the number of documents written.
    #[instrument(skip(self, records), fields(total = records.len()))]
    pub async fn load(&self, collection: &str, records: Vec<Record>) -> Result<usize, LoadError> {
        let total = records.len();
        let chunk_size = self.store.max_batch_ops().max(1);
        let mut committed = 0;

        let abort = |committed: usize, source: StoreError| LoadError {
            collection: collection.to_string(),
            committed,
            total,
            source,
        };

        for (chunk_index, chunk) in records.chunks(chunk_size).enumerate() {
            let mut batch = self.store.batch();
            for (offset, record) in chunk.iter().enumerate() {
                let index = chunk_index * chunk_size + offset;
                batch
                    .set(collection, document_id(record, index), record.clone())
                    .map_err(|e| abort(committed, e))?;
            }

            let mut attempt = 1;
            let written = loop {
                match self.store.commit(batch.clone()).await {
                    Ok(written) => break written,
                    Err(e) if attempt < self.max_attempts => {
                        let wait = self.retry.retry_interval(attempt);
                        warn!(
                            chunk = chunk_index,
                            attempt,
                            error = %e,
                            "Chunk commit failed, retrying in {:?}",
                            wait
                        );
                        tokio::time::sleep(wait).await;
                        attempt += 1;
                    },
                    Err(e) => return Err(abort(committed, e)),
                }
            };

            committed += written;
            debug!(chunk = chunk_index, written, committed, "Chunk committed");
        }

        info!(committed, "Collection loaded");
        Ok(committed)
    }
}
