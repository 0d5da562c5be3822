//! Per-destination token-bucket throttling for outbound requests.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Sustained rate and burst capacity for one destination.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimit {
    /// Tokens refilled per second.
    pub per_second: f64,
    /// Maximum tokens the bucket holds.
    pub burst: u32,
}

impl RateLimit {
    pub const fn new(per_second: f64, burst: u32) -> Self {
        Self { per_second, burst }
    }
}

impl Default for RateLimit {
    fn default() -> Self {
        Self {
            per_second: 3.0,
            burst: 3,
        }
    }
}

/// Blocking token bucket scoped to one destination key.
///
/// `acquire` suspends the caller until a token is available instead of
/// rejecting; tokens are never refunded for the wait.
#[derive(Clone)]
pub struct DestinationLimiter {
    limiter: Arc<DirectRateLimiter>,
    limit: RateLimit,
}

impl DestinationLimiter {
    pub fn new(limit: RateLimit) -> Self {
        Self {
            limiter: Arc::new(RateLimiter::direct(quota_from_limit(limit))),
            limit,
        }
    }

    /// Consumes one token, suspending until the bucket can provide it.
    pub async fn acquire(&self) {
        self.limiter.until_ready().await;
    }

    /// Non-blocking probe used by tests and health reporting.
    pub fn try_acquire(&self) -> bool {
        self.limiter.check().is_ok()
    }

    pub const fn limit(&self) -> RateLimit {
        self.limit
    }
}

fn quota_from_limit(limit: RateLimit) -> Quota {
    let burst = NonZeroU32::new(limit.burst.max(1)).expect("burst is at least one");

    // One token every 1/rate seconds, floored so a zero/negative rate cannot
    // produce a zero-length period.
    let seconds_per_token = (1.0 / limit.per_second.max(0.001)).max(0.001);
    let period = Duration::from_secs_f64(seconds_per_token);

    Quota::with_period(period)
        .expect("period is always greater than zero")
        .allow_burst(burst)
}
