//! Event host
//!
//! Runs pipeline invocations the way a managed trigger runtime would: each
//! delivery gets a wall-clock timeout, and a trigger with a retry policy is
//! redelivered after retryable failures and timeouts. The pipeline itself never
//! retries a whole invocation; it only reports what went wrong.
//!
//! Background deliveries are tracked so the server can drain them before exiting.

use libros_common::types::ObjectFinalizedEvent;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;
use tracing::{error, info, warn};

use super::{
    orchestrator::{IngestOutcome, IngestionPipeline},
    retry::RetryPolicy,
    Trigger,
};
use crate::config::HostConfig;

/// Timeout and redelivery settings of one trigger registration.
#[derive(Debug, Clone)]
pub struct HostPolicy {
    pub timeout: Duration,
    /// `None` disables redelivery
    pub retry: Option<RetryPolicy>,
    /// Total deliveries, including the first
    pub max_attempts: u32,
}

impl HostPolicy {
    /// Spreadsheet trigger: no redelivery; failures are logged only.
    pub fn spreadsheet(config: &HostConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.spreadsheet_timeout_secs),
            retry: None,
            max_attempts: 1,
        }
    }

    pub fn artifact(config: &HostConfig) -> Self {
        let retry = config.artifact_retry.then(|| {
            RetryPolicy::new(2, Duration::from_millis(config.retry_initial_ms))
                .maximum_interval(Duration::from_secs(60))
        });

        Self {
            timeout: Duration::from_secs(config.artifact_timeout_secs),
            max_attempts: if retry.is_some() { config.max_attempts.max(1) } else { 1 },
            retry,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryOutcome {
    Completed(IngestOutcome),
    Failed { error: String, retryable: bool },
    TimedOut,
}

/// What happened to one event on one trigger.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryReport {
    pub trigger: Trigger,
    pub event: ObjectFinalizedEvent,
    pub attempts: u32,
    pub outcome: DeliveryOutcome,
}

impl DeliveryReport {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, DeliveryOutcome::Completed(_))
    }

    /// Artifacts uploaded by a successful spreadsheet delivery
    pub fn emitted_artifacts(&self) -> &[ObjectFinalizedEvent] {
        match &self.outcome {
            DeliveryOutcome::Completed(IngestOutcome::Partitioned(report)) => &report.artifacts,
            _ => &[],
        }
    }
}

#[derive(Clone)]
pub struct EventHost {
    pipeline: Arc<IngestionPipeline>,
    spreadsheet: HostPolicy,
    artifact: HostPolicy,
    /// Shared by every clone
    tracker: TaskTracker,
}

impl EventHost {
    pub fn new(pipeline: Arc<IngestionPipeline>, config: &HostConfig) -> Self {
        Self::with_policies(
            pipeline,
            HostPolicy::spreadsheet(config),
            HostPolicy::artifact(config),
        )
    }

    pub fn with_policies(
        pipeline: Arc<IngestionPipeline>,
        spreadsheet: HostPolicy,
        artifact: HostPolicy,
    ) -> Self {
        Self {
            pipeline,
            spreadsheet,
            artifact,
            tracker: TaskTracker::new(),
        }
    }

    pub fn policy(&self, trigger: Trigger) -> &HostPolicy {
        match trigger {
            Trigger::Spreadsheet => &self.spreadsheet,
            Trigger::Artifact => &self.artifact,
        }
    }

    /// Deliver `event` to one trigger, applying its timeout and retry policy.
    pub async fn deliver(&self, trigger: Trigger, event: ObjectFinalizedEvent) -> DeliveryReport {
        let policy = self.policy(trigger);
        let mut attempts = 0;

        loop {
            attempts += 1;

            let result =
                tokio::time::timeout(policy.timeout, self.pipeline.handle(trigger, &event)).await;

            let (outcome, retryable) = match result {
                Ok(Ok(outcome)) => {
                    return DeliveryReport {
                        trigger,
                        event,
                        attempts,
                        outcome: DeliveryOutcome::Completed(outcome),
                    };
                },
                Ok(Err(e)) => {
                    let retryable = e.is_retryable();
                    (
                        DeliveryOutcome::Failed {
                            error: e.to_string(),
                            retryable,
                        },
                        retryable,
                    )
                },
                Err(_) => (DeliveryOutcome::TimedOut, true),
            };

            match &policy.retry {
                Some(retry) if retryable && attempts < policy.max_attempts => {
                    let wait = retry.retry_interval(attempts);
                    warn!(
                        %trigger,
                        bucket = %event.bucket,
                        name = %event.name,
                        attempts,
                        outcome = ?outcome,
                        "Delivery failed, redelivering in {:?}",
                        wait
                    );
                    tokio::time::sleep(wait).await;
                },
                _ => {
                    error!(
                        %trigger,
                        bucket = %event.bucket,
                        name = %event.name,
                        attempts,
                        outcome = ?outcome,
                        "Delivery failed"
                    );
                    return DeliveryReport {
                        trigger,
                        event,
                        attempts,
                        outcome,
                    };
                },
            }
        }
    }

    /// Deliver `event` to both triggers concurrently, as a bucket with two
    /// registrations would.
    pub async fn deliver_all(&self, event: ObjectFinalizedEvent) -> Vec<DeliveryReport> {
        let (spreadsheet, artifact) = futures::join!(
            self.deliver(Trigger::Spreadsheet, event.clone()),
            self.deliver(Trigger::Artifact, event),
        );
        vec![spreadsheet, artifact]
    }

    /// Deliver events in the background, one task per event.
    pub fn spawn(&self, events: Vec<ObjectFinalizedEvent>) -> Vec<JoinHandle<Vec<DeliveryReport>>> {
        events
            .into_iter()
            .map(|event| {
                let host = self.clone();
                self.tracker.spawn(async move {
                    let reports = host.deliver_all(event).await;
                    for report in reports.iter().filter(|r| r.is_success()) {
                        if let DeliveryOutcome::Completed(outcome) = &report.outcome {
                            if !matches!(outcome, IngestOutcome::Skipped(_)) {
                                info!(
                                    trigger = %report.trigger,
                                    name = %report.event.name,
                                    attempts = report.attempts,
                                    "Delivery completed"
                                );
                            }
                        }
                    }
                    reports
                })
            })
            .collect()
    }

    /// Background deliveries still running
    pub fn pending(&self) -> usize {
        self.tracker.len()
    }

    /// Wait up to `timeout` for background deliveries to finish.
    ///
    /// Returns `false` when some were still running at the deadline; those are
    /// abandoned with the process.
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        self.tracker.close();

        let pending = self.tracker.len();
        if pending > 0 {
            info!(pending, "Waiting for background deliveries to finish");
        }

        match tokio::time::timeout(timeout, self.tracker.wait()).await {
            Ok(()) => true,
            Err(_) => {
                warn!(pending = self.tracker.len(), "Background deliveries still running at shutdown");
                false
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PipelineConfig, ARTIFACT_CONTENT_TYPE};
    use crate::ingest::loader::BatchLoader;
    use crate::storage::MemoryBlobStore;
    use crate::store::MemoryDocumentStore;

    struct Fixture {
        _scratch: tempfile::TempDir,
        blobs: Arc<MemoryBlobStore>,
        store: Arc<MemoryDocumentStore>,
        pipeline: Arc<IngestionPipeline>,
    }

    fn fixture() -> Fixture {
        let scratch = tempfile::tempdir().unwrap();
        let blobs = Arc::new(MemoryBlobStore::new());
        let store = Arc::new(MemoryDocumentStore::default());
        let loader = BatchLoader::new(store.clone()).with_retry(RetryPolicy::new(1, Duration::ZERO), 1);
        let config = PipelineConfig {
            scratch_dir: scratch.path().to_path_buf(),
            ..PipelineConfig::default()
        };
        let pipeline = Arc::new(IngestionPipeline::with_loader(blobs.clone(), loader, config));
        Fixture {
            _scratch: scratch,
            blobs,
            store,
            pipeline,
        }
    }

    fn fast_artifact_policy(max_attempts: u32) -> HostPolicy {
        HostPolicy {
            timeout: Duration::from_secs(5),
            retry: Some(RetryPolicy::new(1, Duration::ZERO)),
            max_attempts,
        }
    }

    fn artifact_event() -> ObjectFinalizedEvent {
        ObjectFinalizedEvent::new("b", "libro_234.json", Some(ARTIFACT_CONTENT_TYPE))
    }

    #[test]
    fn test_policies_from_config() {
        let config = HostConfig::default();

        let spreadsheet = HostPolicy::spreadsheet(&config);
        assert_eq!(spreadsheet.timeout, Duration::from_secs(300));
        assert!(spreadsheet.retry.is_none());

        let artifact = HostPolicy::artifact(&config);
        assert_eq!(artifact.timeout, Duration::from_secs(540));
        assert_eq!(artifact.max_attempts, 3);
        assert!(artifact.retry.is_some());

        let disabled = HostPolicy::artifact(&HostConfig {
            artifact_retry: false,
            ..HostConfig::default()
        });
        assert_eq!(disabled.max_attempts, 1);
    }

    #[tokio::test]
    async fn test_artifact_redelivered_after_commit_failure() {
        let f = fixture();
        f.blobs.put("b", "libro_234.json", br#"[{"a": 1}]"#.to_vec(), None);
        f.store.fail_commits(1, 0);

        let host = EventHost::with_policies(
            f.pipeline.clone(),
            HostPolicy::spreadsheet(&HostConfig::default()),
            fast_artifact_policy(3),
        );
        let report = host.deliver(Trigger::Artifact, artifact_event()).await;

        assert!(report.is_success());
        assert_eq!(report.attempts, 2);
        assert_eq!(f.store.document_count("libro_234"), 1);
    }

    #[tokio::test]
    async fn test_permanent_failure_is_not_redelivered() {
        let f = fixture();
        f.blobs.put("b", "libro_234.json", b"[1, 2]".to_vec(), None);

        let host = EventHost::with_policies(
            f.pipeline.clone(),
            HostPolicy::spreadsheet(&HostConfig::default()),
            fast_artifact_policy(3),
        );
        let report = host.deliver(Trigger::Artifact, artifact_event()).await;

        assert_eq!(report.attempts, 1);
        assert!(matches!(
            report.outcome,
            DeliveryOutcome::Failed { retryable: false, .. }
        ));
    }

    #[tokio::test]
    async fn test_attempts_are_bounded() {
        let f = fixture();
        f.blobs.put("b", "libro_234.json", br#"[{"a": 1}]"#.to_vec(), None);
        f.store.fail_commits(usize::MAX, 0);

        let host = EventHost::with_policies(
            f.pipeline.clone(),
            HostPolicy::spreadsheet(&HostConfig::default()),
            fast_artifact_policy(3),
        );
        let report = host.deliver(Trigger::Artifact, artifact_event()).await;

        assert_eq!(report.attempts, 3);
        assert!(matches!(
            report.outcome,
            DeliveryOutcome::Failed { retryable: true, .. }
        ));
        assert!(f.blobs.contains("b", "libro_234.json"));
    }

    #[tokio::test]
    async fn test_shutdown_drains_background_deliveries() {
        let f = fixture();
        f.blobs.put("b", "libro_234.json", br#"[{"a": 1}]"#.to_vec(), None);

        let host = EventHost::new(f.pipeline.clone(), &HostConfig::default());
        let handles = host.clone().spawn(vec![artifact_event()]);
        assert_eq!(handles.len(), 1);
        drop(handles);

        assert!(host.shutdown(Duration::from_secs(5)).await);
        assert_eq!(host.pending(), 0);
        assert_eq!(f.store.document_count("libro_234"), 1);
        assert!(!f.blobs.contains("b", "libro_234.json"));
    }

    #[tokio::test]
    async fn test_shutdown_gives_up_at_deadline() {
        let f = fixture();
        f.blobs.put("b", "libro_234.json", br#"[{"a": 1}]"#.to_vec(), None);
        f.store.fail_commits(usize::MAX, 0);

        let slow_retry = HostPolicy {
            timeout: Duration::from_secs(5),
            retry: Some(RetryPolicy::new(1, Duration::from_secs(60))),
            max_attempts: 3,
        };
        let host = EventHost::with_policies(
            f.pipeline.clone(),
            HostPolicy::spreadsheet(&HostConfig::default()),
            slow_retry,
        );
        drop(host.spawn(vec![artifact_event()]));

        assert!(!host.shutdown(Duration::from_millis(50)).await);
        assert_eq!(host.pending(), 1);
        assert_eq!(f.store.document_count("libro_234"), 0);
    }

    #[tokio::test]
    async fn test_deliver_all_routes_to_both_triggers() {
        let f = fixture();
        f.blobs.put("b", "libro_234.json", br#"[{"a": 1}]"#.to_vec(), None);

        let host = EventHost::new(f.pipeline.clone(), &HostConfig::default());
        let reports = host.deliver_all(artifact_event()).await;

        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].trigger, Trigger::Spreadsheet);
        assert!(matches!(
            reports[0].outcome,
            DeliveryOutcome::Completed(IngestOutcome::Skipped(_))
        ));
        assert!(matches!(
            reports[1].outcome,
            DeliveryOutcome::Completed(IngestOutcome::Loaded(_))
        ));
    }
}
