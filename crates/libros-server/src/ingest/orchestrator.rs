//! Per-event ingestion state machine
//!
//! Spreadsheet trigger:
//! content type lookup (when the notification has none), guard, download, extract, partition, then for every partition write the
//! artifact, upload it and remove the local copy; finally (optionally) delete the
//! source spreadsheet.
//!
//! Artifact trigger:
//! guard, download, parse, load in chunks, delete the artifact blob.
//!
//! Every invocation works inside its own scratch directory, which is removed when
//! the invocation returns or is dropped.

use libros_common::types::ObjectFinalizedEvent;
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tracing::{debug, info, instrument, warn};

use super::{
    artifact::{
        artifact_file_name, artifact_object_key, collection_name, read_artifact, write_artifact,
    },
    extract::extract_records,
    guard::{GuardDecision, IdempotencyGuard, RejectReason},
    loader::BatchLoader,
    partition::PartitionAssigner,
    IngestError, Trigger,
};
use crate::config::{PipelineConfig, ARTIFACT_CONTENT_TYPE};
use crate::storage::{BlobError, BlobStore};
use crate::store::DocumentStore;

/// Result of a spreadsheet invocation that got past the guard.
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionReport {
    pub records: usize,
    pub dropped: usize,
    /// Uploaded artifacts, as the events their arrival produces
    pub artifacts: Vec<ObjectFinalizedEvent>,
    pub source_deleted: bool,
}

/// Result of an artifact invocation that got past the guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub collection: String,
    pub committed: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    Skipped(RejectReason),
    Partitioned(PartitionReport),
    Loaded(LoadReport),
}

pub struct IngestionPipeline {
    blobs: Arc<dyn BlobStore>,
    config: PipelineConfig,
    guard: IdempotencyGuard,
    assigner: PartitionAssigner,
    loader: BatchLoader,
}

impl IngestionPipeline {
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        store: Arc<dyn DocumentStore>,
        config: PipelineConfig,
    ) -> Self {
        Self::with_loader(blobs, BatchLoader::new(store), config)
    }

    pub fn with_loader(
        blobs: Arc<dyn BlobStore>,
        loader: BatchLoader,
        config: PipelineConfig,
    ) -> Self {
        Self {
            blobs,
            guard: IdempotencyGuard::new(&config.processed_prefix, &config.artifact_prefix),
            assigner: PartitionAssigner::new(&config.code_column),
            loader,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub async fn handle(
        &self,
        trigger: Trigger,
        event: &ObjectFinalizedEvent,
    ) -> Result<IngestOutcome, IngestError> {
        match trigger {
            Trigger::Spreadsheet => self.handle_spreadsheet(event).await,
            Trigger::Artifact => self.handle_artifact(event).await,
        }
    }

    #[instrument(skip(self, event), fields(bucket = %event.bucket, name = %event.name))]
    pub async fn handle_spreadsheet(
        &self,
        event: &ObjectFinalizedEvent,
    ) -> Result<IngestOutcome, IngestError> {
        let event = self.with_stored_content_type(event).await?;
        let event: &ObjectFinalizedEvent = &event;

        if let GuardDecision::Reject(reason) = self.guard.check_spreadsheet(event) {
            info!(%reason, "Spreadsheet trigger ignored object");
            return Ok(IngestOutcome::Skipped(reason));
        }

        let scratch = self.scratch_dir()?;
        let source = local_path(scratch.path(), event, "source.xlsx");

        let bytes = self.blobs.download(&event.bucket, &event.name, &source).await?;
        debug!(bytes, path = %source.display(), "Spreadsheet downloaded");

        let records = tokio::task::spawn_blocking(move || extract_records(&source))
            .await
            .map_err(|e| IngestError::Task(e.to_string()))??;
        let total = records.len();

        let partitions = self.assigner.assign(records);
        if partitions.dropped > 0 {
            warn!(
                dropped = partitions.dropped,
                total,
                column = %self.config.code_column,
                "Rows without a usable route code were left out of every partition"
            );
        }
        info!(
            partitions = partitions.groups.len(),
            records = partitions.record_count(),
            "Spreadsheet partitioned"
        );

        let mut artifacts = Vec::with_capacity(partitions.groups.len());
        let mut failed = Vec::new();

        for (libro, group) in &partitions.groups {
            let file_name = artifact_file_name(&self.config.artifact_prefix, libro);
            let key = artifact_object_key(event, &file_name);

            match self.emit_artifact(scratch.path(), &event.bucket, &file_name, &key, group).await {
                Ok(()) => {
                    debug!(partition = %libro, key = %key, count = group.len(), "Artifact uploaded");
                    artifacts.push(ObjectFinalizedEvent::new(
                        &event.bucket,
                        key,
                        Some(ARTIFACT_CONTENT_TYPE),
                    ));
                },
                Err(e) => {
                    warn!(partition = %libro, key = %key, error = %e, "Artifact upload failed");
                    failed.push(libro.clone());
                },
            }
        }

        if !failed.is_empty() {
            return Err(IngestError::PartialUpload {
                failed,
                uploaded: artifacts.len(),
            });
        }

        let source_deleted = if self.config.delete_source {
            self.blobs.delete(&event.bucket, &event.name).await?;
            info!("Source spreadsheet deleted");
            true
        } else {
            false
        };

        Ok(IngestOutcome::Partitioned(PartitionReport {
            records: partitions.record_count(),
            dropped: partitions.dropped,
            artifacts,
            source_deleted,
        }))
    }

    /// Write, upload and remove the local copy of one partition artifact.
    async fn emit_artifact(
        &self,
        scratch: &Path,
        bucket: &str,
        file_name: &str,
        key: &str,
        records: &[libros_common::types::Record],
    ) -> Result<(), IngestError> {
        let path = scratch.join(file_name);
        write_artifact(&path, records).await?;
        self.blobs.upload(bucket, &path, key, ARTIFACT_CONTENT_TYPE).await?;

        if let Err(e) = tokio::fs::remove_file(&path).await {
            debug!(error = %e, path = %path.display(), "Could not remove local artifact");
        }
        Ok(())
    }

    #[instrument(skip(self, event), fields(bucket = %event.bucket, name = %event.name))]
    pub async fn handle_artifact(
        &self,
        event: &ObjectFinalizedEvent,
    ) -> Result<IngestOutcome, IngestError> {
        if let GuardDecision::Reject(reason) = self.guard.check_artifact(event) {
            debug!(%reason, "Artifact trigger ignored object");
            return Ok(IngestOutcome::Skipped(reason));
        }

        let scratch = self.scratch_dir()?;
        let local = local_path(scratch.path(), event, "artifact.json");

        self.blobs.download(&event.bucket, &event.name, &local).await?;
        let records = read_artifact(&local).await?;

        let collection = collection_name(event);
        let committed = self.loader.load(&collection, records).await?;

        self.blobs.delete(&event.bucket, &event.name).await?;
        info!(collection = %collection, committed, "Artifact loaded and removed");

        Ok(IngestOutcome::Loaded(LoadReport {
            collection,
            committed,
        }))
    }

    /// S3 notifications omit the content type; read it from the object instead.
    /// A vanished object resolves to no content type, which the guard rejects.
    async fn with_stored_content_type<'a>(
        &self,
        event: &'a ObjectFinalizedEvent,
    ) -> Result<Cow<'a, ObjectFinalizedEvent>, IngestError> {
        if event.content_type.is_some() {
            return Ok(Cow::Borrowed(event));
        }

        let content_type = match self.blobs.content_type(&event.bucket, &event.name).await {
            Ok(content_type) => content_type,
            Err(BlobError::NotFound { .. }) => None,
            Err(e) => return Err(e.into()),
        };
        debug!(content_type = ?content_type, "Content type read from object metadata");

        Ok(Cow::Owned(ObjectFinalizedEvent {
            content_type,
            ..event.clone()
        }))
    }

    fn scratch_dir(&self) -> Result<TempDir, IngestError> {
        std::fs::create_dir_all(&self.config.scratch_dir).map_err(IngestError::Scratch)?;
        tempfile::Builder::new()
            .prefix("libros-")
            .tempdir_in(&self.config.scratch_dir)
            .map_err(IngestError::Scratch)
    }
}

/// Local download target inside the scratch directory, named after the object.
fn local_path(scratch: &Path, event: &ObjectFinalizedEvent, fallback: &str) -> PathBuf {
    match event.basename() {
        "" | "." | ".." => scratch.join(fallback),
        name => scratch.join(name),
    }
}
