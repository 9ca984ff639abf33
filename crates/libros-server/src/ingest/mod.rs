//! Spreadsheet ingestion pipeline
//!
//! Two independent triggers fire on every finalized object in a bucket:
//!
//! - **spreadsheet**: download an `.xlsx`, read its first sheet, partition the rows by
//!   the "Libro" segment of the route code and upload one JSON artifact per partition
//!   next to the source object
//! - **artifact**: download a `.json` artifact and load its records into the collection
//!   named after the file, in atomic chunks
//!
//! The artifacts written by the first trigger fire the second one.
//!
//! # Modules
//!
//! - **guard**: per-trigger admission rules that keep the pipeline from re-reading its own output
//! - **extract**: first-sheet spreadsheet reader
//! - **partition**: route code parsing and grouping
//! - **artifact**: artifact naming and (de)serialization
//! - **loader**: chunked atomic writes into the document store
//! - **orchestrator**: the per-event state machine for both triggers
//! - **events**: storage notification parsing
//! - **host**: timeout and redelivery policy around the orchestrator

use libros_common::LibrosError;
use std::fmt;
use thiserror::Error;

pub mod artifact;
pub mod events;
pub mod extract;
pub mod guard;
pub mod host;
pub mod loader;
pub mod orchestrator;
pub mod partition;
pub mod retry;

pub use events::{parse_notification, EventParseError};
pub use extract::{extract_records, ExtractError};
pub use guard::{GuardDecision, IdempotencyGuard, RejectReason};
pub use host::{DeliveryOutcome, DeliveryReport, EventHost, HostPolicy};
pub use loader::{BatchLoader, LoadError};
pub use orchestrator::{IngestOutcome, IngestionPipeline, LoadReport, PartitionReport};
pub use partition::{PartitionAssigner, PartitionKey, Partitions};
pub use retry::RetryPolicy;

use crate::storage::BlobError;

/// The two trigger registrations on a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    Spreadsheet,
    Artifact,
}

impl Trigger {
    pub const ALL: [Trigger; 2] = [Trigger::Spreadsheet, Trigger::Artifact];

    pub fn as_str(&self) -> &'static str {
        match self {
            Trigger::Spreadsheet => "spreadsheet",
            Trigger::Artifact => "artifact",
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of one pipeline invocation.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Blob store error: {0}")]
    Blob(#[from] BlobError),

    #[error("Spreadsheet extraction failed: {0}")]
    Extract(#[from] ExtractError),

    #[error("Invalid artifact: {0}")]
    Artifact(#[from] LibrosError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("Scratch directory error: {0}")]
    Scratch(#[source] std::io::Error),

    #[error("Failed to upload {} of {} partition artifacts: {}", .failed.len(), .failed.len() + .uploaded, .failed.join(", "))]
    PartialUpload { failed: Vec<String>, uploaded: usize },

    #[error("Worker task failed: {0}")]
    Task(String),
}

impl IngestError {
    /// Whether redelivering the same event may succeed.
    ///
    /// Transient I/O (blob transfers, store commits, scratch files) is retryable;
    /// malformed input and missing source objects are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            IngestError::Blob(BlobError::NotFound { .. }) => false,
            IngestError::Blob(_) => true,
            IngestError::Extract(_) => false,
            IngestError::Artifact(LibrosError::Io(_)) => true,
            IngestError::Artifact(_) => false,
            IngestError::Load(_) => true,
            IngestError::Scratch(_) => true,
            IngestError::PartialUpload { .. } => true,
            IngestError::Task(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_classification() {
        assert!(!IngestError::Blob(BlobError::not_found("b", "k")).is_retryable());
        assert!(IngestError::Blob(BlobError::Backend("timeout".into())).is_retryable());
        assert!(!IngestError::Artifact(LibrosError::parse("not an array")).is_retryable());
        assert!(!IngestError::Extract(ExtractError::NoSheets).is_retryable());
        assert!(IngestError::PartialUpload {
            failed: vec!["001".into()],
            uploaded: 2
        }
        .is_retryable());
    }

    #[test]
    fn test_partial_upload_message() {
        let err = IngestError::PartialUpload {
            failed: vec!["001".into(), "002".into()],
            uploaded: 3,
        };
        assert_eq!(
            err.to_string(),
            "Failed to upload 2 of 5 partition artifacts: 001, 002"
        );
    }
}
