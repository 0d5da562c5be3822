//! Retry decisions with exponential backoff and jitter.

use std::time::Duration;

use rand::rngs::OsRng;
use rand::Rng;

use crate::error::{PipelineError, PipelineErrorKind};

/// Outcome of a retry decision: wait and re-attempt, or surface the failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry(Duration),
    Stop,
}

/// Immutable retry configuration; one instance may be shared across calls.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first. 1 disables retrying.
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub exponential_base: f64,
    /// Perturbs each delay by up to ±10% to avoid synchronized retry storms.
    pub jitter: bool,
    pub retryable_kinds: Vec<PipelineErrorKind>,
    pub retryable_statuses: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            exponential_base: 2.0,
            jitter: true,
            retryable_kinds: vec![PipelineErrorKind::Transient, PipelineErrorKind::Timeout],
            retryable_statuses: vec![429, 502, 503, 504],
        }
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub fn is_retryable(&self, error: &PipelineError) -> bool {
        if let Some(status) = error.status() {
            return self.retryable_statuses.contains(&status);
        }
        self.retryable_kinds.contains(&error.kind())
    }

    /// Backoff delay for a 0-based attempt number:
    /// `min(max_delay, initial_delay * base^attempt)`, then jitter.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let scale = self.exponential_base.powi(attempt as i32);
        let seconds = self.initial_delay.as_secs_f64() * scale;
        let capped = seconds.min(self.max_delay.as_secs_f64());

        if self.jitter {
            // OsRng rather than a seeded PRNG: independent processes must not
            // converge on the same retry schedule.
            let factor: f64 = OsRng.gen_range(0.90..=1.10);
            Duration::from_secs_f64(capped * factor)
        } else {
            Duration::from_secs_f64(capped)
        }
    }

    /// Pure decision for the given failed attempt (0-based). Exhausted or
    /// non-retryable failures yield [`RetryDecision::Stop`] and the caller
    /// surfaces the last error verbatim.
    pub fn decide(&self, attempt: u32, error: &PipelineError) -> RetryDecision {
        if attempt.saturating_add(1) >= self.max_attempts || !self.is_retryable(error) {
            return RetryDecision::Stop;
        }
        RetryDecision::Retry(self.delay_for_attempt(attempt))
    }
}
