use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use super::{BlobError, BlobResult, BlobStore};

#[derive(Debug, Clone)]
pub struct StoredBlob {
    pub data: Vec<u8>,
    pub content_type: Option<String>,
}

#[derive(Default)]
struct Inner {
    objects: BTreeMap<(String, String), StoredBlob>,
    failing_uploads: BTreeSet<String>,
}

/// In-process blob store used by tests and local replays.
#[derive(Default)]
pub struct MemoryBlobStore {
    inner: Mutex<Inner>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn put(&self, bucket: &str, key: &str, data: Vec<u8>, content_type: Option<&str>) {
        self.lock().objects.insert(
            (bucket.to_string(), key.to_string()),
            StoredBlob {
                data,
                content_type: content_type.map(str::to_string),
            },
        );
    }

    pub fn get(&self, bucket: &str, key: &str) -> Option<StoredBlob> {
        self.lock()
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    pub fn contains(&self, bucket: &str, key: &str) -> bool {
        self.get(bucket, key).is_some()
    }

    /// Keys present in `bucket`, in byte order
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.lock()
            .objects
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, key)| key.clone())
            .collect()
    }

    /// Make every upload to `key` fail until cleared
    pub fn fail_uploads_to(&self, key: &str) {
        self.lock().failing_uploads.insert(key.to_string());
    }

    pub fn clear_failures(&self) {
        self.lock().failing_uploads.clear();
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn download(&self, bucket: &str, key: &str, dest: &Path) -> BlobResult<u64> {
        let blob = self
            .get(bucket, key)
            .ok_or_else(|| BlobError::not_found(bucket, key))?;

        tokio::fs::write(dest, &blob.data).await?;
        Ok(blob.data.len() as u64)
    }

    async fn upload(
        &self,
        bucket: &str,
        source: &Path,
        key: &str,
        content_type: &str,
    ) -> BlobResult<()> {
        if self.lock().failing_uploads.contains(key) {
            return Err(BlobError::Backend(format!("injected upload failure for {}", key)));
        }

        let data = tokio::fs::read(source).await?;
        self.put(bucket, key, data, Some(content_type));
        Ok(())
    }

    async fn delete(&self, bucket: &str, key: &str) -> BlobResult<()> {
        self.lock()
            .objects
            .remove(&(bucket.to_string(), key.to_string()));
        Ok(())
    }

    async fn content_type(&self, bucket: &str, key: &str) -> BlobResult<Option<String>> {
        self.get(bucket, key)
            .map(|blob| blob.content_type)
            .ok_or_else(|| BlobError::not_found(bucket, key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upload_download_delete() {
        let store = MemoryBlobStore::new();
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("in.json");
        tokio::fs::write(&source, b"[]").await.unwrap();

        store
            .upload("bucket", &source, "out/libro_001.json", "application/json")
            .await
            .unwrap();

        let stored = store.get("bucket", "out/libro_001.json").unwrap();
        assert_eq!(stored.content_type.as_deref(), Some("application/json"));

        let dest = dir.path().join("copy.json");
        let bytes = store
            .download("bucket", "out/libro_001.json", &dest)
            .await
            .unwrap();
        assert_eq!(bytes, 2);

        store.delete("bucket", "out/libro_001.json").await.unwrap();
        assert!(!store.contains("bucket", "out/libro_001.json"));
    }

    #[tokio::test]
    async fn test_download_missing_object() {
        let store = MemoryBlobStore::new();
        let dir = tempfile::tempdir().unwrap();

        let err = store
            .download("bucket", "missing.xlsx", &dir.path().join("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, BlobError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_injected_upload_failure() {
        let store = MemoryBlobStore::new();
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("in.json");
        tokio::fs::write(&source, b"[]").await.unwrap();

        store.fail_uploads_to("libro_002.json");
        let result = store
            .upload("bucket", &source, "libro_002.json", "application/json")
            .await;
        assert!(matches!(result, Err(BlobError::Backend(_))));

        store.clear_failures();
        assert!(store
            .upload("bucket", &source, "libro_002.json", "application/json")
            .await
            .is_ok());
    }
}
