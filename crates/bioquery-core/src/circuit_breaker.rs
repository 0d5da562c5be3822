use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::error::{PipelineError, PipelineErrorKind};

/// Runtime circuit state for one destination's upstream calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

/// Circuit breaker thresholds and timers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Counted failures while Closed before the circuit opens.
    pub failure_threshold: u32,
    /// Time since the last failure before an Open circuit allows a probe.
    pub recovery_timeout: Duration,
    /// Consecutive Half-Open successes required to close the circuit.
    pub success_threshold: u32,
    /// Error kinds that affect the failure counter.
    pub counted_kinds: Vec<PipelineErrorKind>,
    /// Kinds carved out of `counted_kinds`; these pass through unaffected.
    pub excluded_kinds: Vec<PipelineErrorKind>,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(60),
            success_threshold: 2,
            counted_kinds: vec![
                PipelineErrorKind::Transient,
                PipelineErrorKind::Timeout,
                PipelineErrorKind::UpstreamStatus,
            ],
            excluded_kinds: Vec::new(),
        }
    }
}

impl CircuitBreakerConfig {
    fn counts(&self, kind: PipelineErrorKind) -> bool {
        self.counted_kinds.contains(&kind) && !self.excluded_kinds.contains(&kind)
    }
}

/// Fail-fast rejection returned while the circuit is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenCircuit {
    /// Time since the failure that keeps the circuit open.
    pub since_last_failure: Option<Duration>,
}

#[derive(Debug)]
struct CircuitInner {
    state: CircuitState,
    failure_count: u32,
    success_count: u32,
    last_failure_at: Option<Instant>,
    last_state_change: Instant,
}

impl Default for CircuitInner {
    fn default() -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            success_count: 0,
            last_failure_at: None,
            last_state_change: Instant::now(),
        }
    }
}

impl CircuitInner {
    fn transition(&mut self, state: CircuitState) {
        self.state = state;
        self.last_state_change = Instant::now();
    }
}

/// Thread-safe circuit breaker for one destination.
///
/// The lock is held only for state transitions, never across a network call.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    inner: Mutex<CircuitInner>,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(CircuitInner::default()),
        }
    }

    /// Gate check before invoking the underlying operation.
    ///
    /// An Open circuit whose recovery timeout has elapsed flips to Half-Open
    /// here, so the caller's request becomes the trial call.
    pub fn allow_request(&self) -> Result<(), OpenCircuit> {
        let mut inner = self
            .inner
            .lock()
            .expect("circuit breaker lock is not poisoned");
        match inner.state {
            CircuitState::Closed | CircuitState::HalfOpen => Ok(()),
            CircuitState::Open => {
                let since_last_failure = inner.last_failure_at.map(|at| at.elapsed());
                let can_probe = since_last_failure
                    .map(|elapsed| elapsed >= self.config.recovery_timeout)
                    .unwrap_or(true);

                if can_probe {
                    inner.success_count = 0;
                    inner.transition(CircuitState::HalfOpen);
                    Ok(())
                } else {
                    Err(OpenCircuit { since_last_failure })
                }
            }
        }
    }

    pub fn record_success(&self) {
        let mut inner = self
            .inner
            .lock()
            .expect("circuit breaker lock is not poisoned");
        match inner.state {
            CircuitState::HalfOpen => {
                inner.success_count = inner.success_count.saturating_add(1);
                if inner.success_count >= self.config.success_threshold {
                    inner.failure_count = 0;
                    inner.success_count = 0;
                    inner.transition(CircuitState::Closed);
                    tracing::debug!("circuit closed after successful probes");
                }
            }
            CircuitState::Closed => {
                inner.failure_count = 0;
            }
            // A success while Open can only come from a call admitted before
            // the circuit tripped; the probe path resets state explicitly.
            CircuitState::Open => {}
        }
    }

    /// Records a failed attempt. Errors outside the counted predicate pass
    /// through without affecting the state machine.
    pub fn record_failure(&self, error: &PipelineError) {
        if !self.config.counts(error.kind()) {
            return;
        }

        let mut inner = self
            .inner
            .lock()
            .expect("circuit breaker lock is not poisoned");
        inner.last_failure_at = Some(Instant::now());

        match inner.state {
            CircuitState::HalfOpen => {
                inner.success_count = 0;
                inner.transition(CircuitState::Open);
                tracing::warn!("circuit reopened: probe failed");
            }
            CircuitState::Closed => {
                inner.failure_count = inner.failure_count.saturating_add(1);
                if inner.failure_count >= self.config.failure_threshold {
                    inner.transition(CircuitState::Open);
                    tracing::warn!(
                        failures = inner.failure_count,
                        "circuit opened after consecutive failures"
                    );
                }
            }
            CircuitState::Open => {}
        }
    }

    pub fn state(&self) -> CircuitState {
        self.inner
            .lock()
            .expect("circuit breaker lock is not poisoned")
            .state
    }

    pub fn failure_count(&self) -> u32 {
        self.inner
            .lock()
            .expect("circuit breaker lock is not poisoned")
            .failure_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transient() -> PipelineError {
        PipelineError::TransientNetwork {
            destination: String::from("example.test"),
            message: String::from("connection refused"),
        }
    }

    fn config(failure_threshold: u32, recovery_ms: u64, success_threshold: u32) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold,
            recovery_timeout: Duration::from_millis(recovery_ms),
            success_threshold,
            ..CircuitBreakerConfig::default()
        }
    }

    #[test]
    fn opens_after_threshold_counted_failures() {
        let breaker = CircuitBreaker::new(config(2, 10, 1));

        assert_eq!(breaker.state(), CircuitState::Closed);
        breaker.record_failure(&transient());
        assert_eq!(breaker.state(), CircuitState::Closed);
        breaker.record_failure(&transient());
        assert_eq!(breaker.state(), CircuitState::Open);
        assert!(breaker.allow_request().is_err());
    }

    #[test]
    fn success_while_closed_resets_failure_count() {
        let breaker = CircuitBreaker::new(config(3, 10, 1));

        breaker.record_failure(&transient());
        breaker.record_failure(&transient());
        breaker.record_success();
        assert_eq!(breaker.failure_count(), 0);

        breaker.record_failure(&transient());
        breaker.record_failure(&transient());
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[test]
    fn uncounted_kinds_do_not_trip_the_circuit() {
        let breaker = CircuitBreaker::new(config(1, 10, 1));
        let parsing = PipelineError::ResultParsing {
            destination: String::from("example.test"),
            message: String::from("truncated json"),
        };

        breaker.record_failure(&parsing);
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.failure_count(), 0);
    }

    #[test]
    fn open_rejection_carries_failure_age() {
        let breaker = CircuitBreaker::new(config(1, 60_000, 1));
        breaker.record_failure(&transient());

        let rejection = breaker.allow_request().expect_err("circuit should be open");
        assert!(rejection.since_last_failure.is_some());
    }

    #[test]
    fn half_open_probe_then_close_after_success_threshold() {
        let breaker = CircuitBreaker::new(config(1, 1, 2));
        breaker.record_failure(&transient());
        assert_eq!(breaker.state(), CircuitState::Open);

        std::thread::sleep(Duration::from_millis(2));
        assert!(breaker.allow_request().is_ok());
        assert_eq!(breaker.state(), CircuitState::HalfOpen);

        breaker.record_success();
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        breaker.record_success();
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.failure_count(), 0);
    }

    #[test]
    fn half_open_failure_reopens_immediately() {
        let breaker = CircuitBreaker::new(config(1, 50, 2));
        breaker.record_failure(&transient());

        std::thread::sleep(Duration::from_millis(60));
        assert!(breaker.allow_request().is_ok());
        assert_eq!(breaker.state(), CircuitState::HalfOpen);

        breaker.record_failure(&transient());
        assert_eq!(breaker.state(), CircuitState::Open);
        assert!(breaker.allow_request().is_err());
    }
}
