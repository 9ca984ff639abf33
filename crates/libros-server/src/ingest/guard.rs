//! Admission rules for the two triggers.
//!
//! Pipeline output lands in the same bucket as its input and fires the same
//! "object finalized" notifications, so each trigger has to recognize what it
//! must not touch. Rejection has no side effects.

use libros_common::types::ObjectFinalizedEvent;
use std::fmt;

use super::Trigger;
use crate::config::SPREADSHEET_CONTENT_TYPE;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// Declared content type is missing or not the spreadsheet MIME type
    NotSpreadsheet { content_type: Option<String> },
    /// Basename carries the processed or the artifact prefix
    AlreadyProcessed,
    /// Basename does not end in `.json`
    NotJson,
    /// Basename is `.json` alone, which names no collection
    EmptyCollectionName,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::NotSpreadsheet { content_type } => write!(
                f,
                "not an .xlsx spreadsheet (content type {})",
                content_type.as_deref().unwrap_or("<none>")
            ),
            RejectReason::AlreadyProcessed => f.write_str("already processed"),
            RejectReason::NotJson => f.write_str("not a .json artifact"),
            RejectReason::EmptyCollectionName => f.write_str("artifact name has no collection stem"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Proceed,
    Reject(RejectReason),
}

impl GuardDecision {
    pub fn should_process(&self) -> bool {
        matches!(self, GuardDecision::Proceed)
    }
}

/// Spreadsheets whose basename starts with either prefix are pipeline output
/// (or were marked done by an operator) and are never extracted again.
#[derive(Debug, Clone)]
pub struct IdempotencyGuard {
    processed_prefix: String,
    artifact_prefix: String,
}

impl IdempotencyGuard {
    pub fn new(processed_prefix: impl Into<String>, artifact_prefix: impl Into<String>) -> Self {
        Self {
            processed_prefix: processed_prefix.into(),
            artifact_prefix: artifact_prefix.into(),
        }
    }

    fn is_marked(&self, basename: &str) -> bool {
        [&self.processed_prefix, &self.artifact_prefix]
            .into_iter()
            .any(|prefix| !prefix.is_empty() && basename.starts_with(prefix.as_str()))
    }

    pub fn check(&self, trigger: Trigger, event: &ObjectFinalizedEvent) -> GuardDecision {
        match trigger {
            Trigger::Spreadsheet => self.check_spreadsheet(event),
            Trigger::Artifact => self.check_artifact(event),
        }
    }

    /// Accept only `.xlsx` content whose basename carries neither prefix.
    pub fn check_spreadsheet(&self, event: &ObjectFinalizedEvent) -> GuardDecision {
        let is_spreadsheet = event
            .content_type
            .as_deref()
            .is_some_and(|ct| ct.contains(SPREADSHEET_CONTENT_TYPE));

        if !is_spreadsheet {
            return GuardDecision::Reject(RejectReason::NotSpreadsheet {
                content_type: event.content_type.clone(),
            });
        }

        if self.is_marked(event.basename()) {
            return GuardDecision::Reject(RejectReason::AlreadyProcessed);
        }

        GuardDecision::Proceed
    }

    /// Accept any object whose basename is `<stem>.json` with a non-empty stem.
    pub fn check_artifact(&self, event: &ObjectFinalizedEvent) -> GuardDecision {
        match event.basename().strip_suffix(".json") {
            Some("") => GuardDecision::Reject(RejectReason::EmptyCollectionName),
            Some(_) => GuardDecision::Proceed,
            None => GuardDecision::Reject(RejectReason::NotJson),
        }
    }
}
