//! Exponential backoff shared by the event host and the batch loader.

use std::time::Duration;

/// Backoff parameters for redelivering a failed unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Multiplier applied to `initial_interval` for every past attempt
    pub backoff_coefficient: u32,
    /// Wait before the first retry
    pub initial_interval: Duration,
    /// Upper bound on any single wait
    pub maximum_interval: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            backoff_coefficient: 2,
            initial_interval: Duration::from_millis(500),
            maximum_interval: Some(Duration::from_secs(30)),
        }
    }
}

impl RetryPolicy {
    pub fn new(backoff_coefficient: u32, initial_interval: Duration) -> Self {
        Self {
            backoff_coefficient,
            initial_interval,
            maximum_interval: None,
        }
    }

    pub fn maximum_interval(mut self, interval: Duration) -> Self {
        self.maximum_interval = Some(interval);
        self
    }

    /// Wait before retrying after the given (1-based) failed attempt.
    pub fn retry_interval(&self, attempt: u32) -> Duration {
        let factor = self
            .backoff_coefficient
            .saturating_pow(attempt.saturating_sub(1));
        let candidate = self.initial_interval.saturating_mul(factor);

        match self.maximum_interval {
            Some(max) => candidate.min(max),
            None => candidate,
        }
    }
}
