use async_trait::async_trait;
use libros_common::types::Record;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use super::{
    DocumentQuery, DocumentSnapshot, DocumentStore, StoreError, StoreResult, WriteBatch,
    DEFAULT_MAX_BATCH_OPS,
};

type Collections = BTreeMap<String, BTreeMap<String, Record>>;

#[derive(Debug, Clone, Copy)]
struct CommitFailure {
    skip: usize,
    remaining: usize,
    after_ops: usize,
}

#[derive(Default)]
struct Inner {
    collections: Collections,
    failure: Option<CommitFailure>,
    failing_reads: bool,
    commits: usize,
}

impl Inner {
    fn readable(&self) -> StoreResult<()> {
        if self.failing_reads {
            return Err(StoreError::Unavailable("injected read failure".to_string()));
        }
        Ok(())
    }
}

/// `BTreeMap`-backed document store.
///
/// Commits are applied to a copy of the data and swapped in only when every
/// operation succeeded, so an injected failure never leaves part of a unit visible.
pub struct MemoryDocumentStore {
    max_batch_ops: usize,
    inner: Mutex<Inner>,
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BATCH_OPS)
    }
}

impl MemoryDocumentStore {
    pub fn new(max_batch_ops: usize) -> Self {
        Self {
            max_batch_ops,
            inner: Mutex::new(Inner::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Make the next `count` commits fail after applying `after_ops` of their operations.
    pub fn fail_commits(&self, count: usize, after_ops: usize) {
        self.fail_commits_after(0, count, after_ops);
    }

    /// Like [`Self::fail_commits`], but let `successes` commits through first.
    pub fn fail_commits_after(&self, successes: usize, count: usize, after_ops: usize) {
        self.lock().failure = Some(CommitFailure {
            skip: successes,
            remaining: count,
            after_ops,
        });
    }

    /// Make every read fail until turned off again
    pub fn fail_reads(&self, enabled: bool) {
        self.lock().failing_reads = enabled;
    }

    /// Number of successful commits so far
    pub fn commit_count(&self) -> usize {
        self.lock().commits
    }

    pub fn document_count(&self, collection: &str) -> usize {
        self.lock()
            .collections
            .get(collection)
            .map(BTreeMap::len)
            .unwrap_or(0)
    }

    /// Insert documents directly, bypassing batching (test fixtures)
    pub fn seed(&self, collection: &str, documents: impl IntoIterator<Item = (String, Record)>) {
        let mut inner = self.lock();
        let target = inner.collections.entry(collection.to_string()).or_default();
        target.extend(documents);
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    fn max_batch_ops(&self) -> usize {
        self.max_batch_ops
    }

    async fn commit(&self, batch: WriteBatch) -> StoreResult<usize> {
        if batch.len() > self.max_batch_ops {
            return Err(StoreError::BatchFull {
                max: self.max_batch_ops,
            });
        }

        let mut inner = self.lock();

        let fail_after = match inner.failure.as_mut() {
            Some(failure) if failure.skip > 0 => {
                failure.skip -= 1;
                None
            },
            Some(failure) if failure.remaining > 0 => {
                failure.remaining -= 1;
                Some(failure.after_ops)
            },
            _ => None,
        };

        let mut staged = inner.collections.clone();
        let count = batch.len();

        for (applied, op) in batch.into_operations().into_iter().enumerate() {
            if fail_after == Some(applied) {
                return Err(StoreError::CommitFailed(format!(
                    "injected failure after {} of {} operations",
                    applied, count
                )));
            }
            staged.entry(op.collection).or_default().insert(op.id, op.data);
        }

        if fail_after.is_some() {
            return Err(StoreError::CommitFailed(
                "injected failure at commit".to_string(),
            ));
        }

        inner.collections = staged;
        inner.commits += 1;

        Ok(count)
    }

    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<DocumentSnapshot>> {
        let inner = self.lock();
        inner.readable()?;

        Ok(inner
            .collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|data| DocumentSnapshot::new(id, data.clone())))
    }

    async fn list_collections(&self) -> StoreResult<Vec<String>> {
        let inner = self.lock();
        inner.readable()?;

        Ok(inner
            .collections
            .iter()
            .filter(|(_, docs)| !docs.is_empty())
            .map(|(name, _)| name.clone())
            .collect())
    }

    async fn query(&self, query: &DocumentQuery) -> StoreResult<Vec<DocumentSnapshot>> {
        let cursor = query.cursor_key()?;
        let inner = self.lock();
        inner.readable()?;

        let Some(docs) = inner.collections.get(&query.collection) else {
            return Ok(Vec::new());
        };

        let mut matches: Vec<(String, DocumentSnapshot)> = match &query.range {
            None => docs
                .iter()
                .map(|(id, data)| (String::new(), DocumentSnapshot::new(id, data.clone())))
                .collect(),
            Some(range) => docs
                .iter()
                .filter_map(|(id, data)| {
                    let value = data.get(&range.field)?.as_str()?;
                    range
                        .contains(value)
                        .then(|| (value.to_string(), DocumentSnapshot::new(id, data.clone())))
                })
                .collect(),
        };

        matches.sort_by(|(a_key, a), (b_key, b)| a_key.cmp(b_key).then_with(|| a.id.cmp(&b.id)));

        Ok(matches
            .into_iter()
            .filter(|(key, doc)| match &cursor {
                Some((cursor_key, cursor_id)) => {
                    (key.as_str(), doc.id.as_str()) > (cursor_key.as_str(), cursor_id.as_str())
                },
                None => true,
            })
            .take(query.limit)
            .map(|(_, doc)| doc)
            .collect())
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
