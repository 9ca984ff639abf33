//! Blob storage
//!
//! The pipeline treats object storage as a plain blob container: download to a local
//! file, upload a local file, delete, and read back an object's content type. [`S3BlobStore`] talks to any S3-compatible
//! service; [`MemoryBlobStore`] backs the tests.

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

pub mod config;
pub mod memory;
pub mod s3;

pub use memory::MemoryBlobStore;
pub use s3::S3BlobStore;

pub type BlobResult<T> = Result<T, BlobError>;

#[derive(Error, Debug)]
pub enum BlobError {
    #[error("Object s3://{bucket}/{key} not found")]
    NotFound { bucket: String, key: String },

    #[error("Local file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Blob store request failed: {0}")]
    Backend(String),
}

impl BlobError {
    pub fn not_found(bucket: &str, key: &str) -> Self {
        Self::NotFound {
            bucket: bucket.to_string(),
            key: key.to_string(),
        }
    }
}

/// Object storage operations used by the ingestion pipeline.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Download `bucket/key` into `dest`, returning the number of bytes written.
    async fn download(&self, bucket: &str, key: &str, dest: &Path) -> BlobResult<u64>;

    /// Upload the local file `source` to `bucket/key`.
    async fn upload(
        &self,
        bucket: &str,
        source: &Path,
        key: &str,
        content_type: &str,
    ) -> BlobResult<()>;

    async fn delete(&self, bucket: &str, key: &str) -> BlobResult<()>;

    /// Content type stored with `bucket/key`, for notifications that do not carry one.
    async fn content_type(&self, bucket: &str, key: &str) -> BlobResult<Option<String>>;
}
