//! Process-wide resilience state, keyed by destination.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::cache::CacheStore;
use crate::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
use crate::rate_limit::{DestinationLimiter, RateLimit};

/// Owns the per-destination circuit breakers and rate limiters plus the
/// shared response cache.
///
/// Constructed once at startup and passed by `Arc`; there are no ambient
/// globals. Breakers and limiters are created lazily on first use and live
/// for the registry's lifetime. The map locks are held only for lookup or
/// insert, never across an await point.
pub struct ResilienceRegistry {
    breakers: Mutex<HashMap<String, Arc<CircuitBreaker>>>,
    limiters: Mutex<HashMap<String, Arc<DestinationLimiter>>>,
    cache: CacheStore,
    breaker_config: CircuitBreakerConfig,
    default_rate: RateLimit,
    rate_overrides: HashMap<String, RateLimit>,
}

impl Default for ResilienceRegistry {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default(), RateLimit::default())
    }
}

impl ResilienceRegistry {
    pub fn new(breaker_config: CircuitBreakerConfig, default_rate: RateLimit) -> Self {
        Self {
            breakers: Mutex::new(HashMap::new()),
            limiters: Mutex::new(HashMap::new()),
            cache: CacheStore::new(),
            breaker_config,
            default_rate,
            rate_overrides: HashMap::new(),
        }
    }

    /// Destination-specific rate override, e.g. a higher sustained rate for
    /// literature sources than for a government API.
    pub fn with_rate_override(mut self, destination: impl Into<String>, limit: RateLimit) -> Self {
        self.rate_overrides.insert(destination.into(), limit);
        self
    }

    pub fn breaker(&self, destination: &str) -> Arc<CircuitBreaker> {
        let mut breakers = self
            .breakers
            .lock()
            .expect("breaker registry lock is not poisoned");
        breakers
            .entry(destination.to_owned())
            .or_insert_with(|| Arc::new(CircuitBreaker::new(self.breaker_config.clone())))
            .clone()
    }

    pub fn limiter(&self, destination: &str) -> Arc<DestinationLimiter> {
        let mut limiters = self
            .limiters
            .lock()
            .expect("limiter registry lock is not poisoned");
        limiters
            .entry(destination.to_owned())
            .or_insert_with(|| {
                let limit = self
                    .rate_overrides
                    .get(destination)
                    .copied()
                    .unwrap_or(self.default_rate);
                Arc::new(DestinationLimiter::new(limit))
            })
            .clone()
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }
}
