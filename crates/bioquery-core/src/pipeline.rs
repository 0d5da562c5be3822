//! The outbound request orchestrator.
//!
//! Composes the cache, rate limiter, circuit breaker, and retry policy
//! around a single HTTP call, in that order:
//!
//! 1. offline short-circuit (cache is the only data source)
//! 2. cache read
//! 3. rate-limit token acquisition (may suspend the caller)
//! 4. circuit-breaker gate
//! 5. the network call, retried per policy; breaker accounting happens on
//!    every attempt, not only the final one
//! 6. write-through to the cache on HTTP 200
//!
//! Within a TTL window, repeated calls for the same canonical request are
//! idempotent: no network I/O and no limiter or breaker interaction.

use std::env;
use std::sync::Arc;

use crate::cache::{cache_key, CacheTtl};
use crate::error::PipelineError;
use crate::http_client::{HttpClient, HttpErrorKind, HttpRequest};
use crate::registry::ResilienceRegistry;
use crate::retry::{RetryDecision, RetryPolicy};

const BODY_EXCERPT_LEN: usize = 200;

/// Pipeline-wide configuration consumed from the environment.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    /// When set, the cache is the only data source; a miss is a hard error
    /// and no network I/O ever happens.
    pub offline: bool,
}

impl PipelineConfig {
    pub fn from_env() -> Self {
        let offline = env::var("BIOQUERY_OFFLINE")
            .map(|value| matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);
        Self { offline }
    }
}

/// Single entry point every domain client calls instead of issuing raw HTTP.
pub struct RequestPipeline {
    http: Arc<dyn HttpClient>,
    registry: Arc<ResilienceRegistry>,
    config: PipelineConfig,
}

impl RequestPipeline {
    pub fn new(http: Arc<dyn HttpClient>, registry: Arc<ResilienceRegistry>) -> Self {
        Self {
            http,
            registry,
            config: PipelineConfig::default(),
        }
    }

    pub fn with_config(
        http: Arc<dyn HttpClient>,
        registry: Arc<ResilienceRegistry>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            http,
            registry,
            config,
        }
    }

    pub fn registry(&self) -> &Arc<ResilienceRegistry> {
        &self.registry
    }

    pub const fn is_offline(&self) -> bool {
        self.config.offline
    }

    /// Executes one upstream request through the full resilience stack and
    /// returns the raw response body.
    pub async fn execute(
        &self,
        request: HttpRequest,
        destination: &str,
        cache_ttl: CacheTtl,
        policy: &RetryPolicy,
    ) -> Result<String, PipelineError> {
        let key = cache_key(request.method, &request.url, &request.params);

        if self.config.offline {
            if !cache_ttl.is_bypass() {
                if let Some(body) = self.registry.cache().get(&key).await {
                    tracing::debug!(destination, "offline cache hit");
                    return Ok(body);
                }
            }
            return Err(PipelineError::OfflineMiss {
                destination: destination.to_owned(),
            });
        }

        if !cache_ttl.is_bypass() {
            if let Some(body) = self.registry.cache().get(&key).await {
                tracing::debug!(destination, "cache hit");
                return Ok(body);
            }
        }

        self.registry.limiter(destination).acquire().await;
        let breaker = self.registry.breaker(destination);

        let mut attempt: u32 = 0;
        loop {
            breaker
                .allow_request()
                .map_err(|open| PipelineError::CircuitOpen {
                    destination: destination.to_owned(),
                    since_last_failure: open.since_last_failure,
                })?;

            match self.attempt_once(&request, destination).await {
                Ok(response) => {
                    breaker.record_success();
                    // Only a 200 is cache-eligible; other 2xx bodies are
                    // returned but never stored.
                    if response.status == 200 && !cache_ttl.is_bypass() {
                        self.registry
                            .cache()
                            .put(key, response.body.clone(), cache_ttl)
                            .await;
                    }
                    return Ok(response.body);
                }
                Err(error) => {
                    breaker.record_failure(&error);
                    match policy.decide(attempt, &error) {
                        RetryDecision::Retry(delay) => {
                            tracing::debug!(
                                destination,
                                attempt,
                                delay_ms = delay.as_millis() as u64,
                                error = %error,
                                "retrying after backoff"
                            );
                            tokio::time::sleep(delay).await;
                            attempt += 1;
                        }
                        RetryDecision::Stop => {
                            tracing::warn!(destination, attempt, error = %error, "request failed");
                            return Err(error);
                        }
                    }
                }
            }
        }
    }

    async fn attempt_once(
        &self,
        request: &HttpRequest,
        destination: &str,
    ) -> Result<crate::http_client::HttpResponse, PipelineError> {
        let response = self
            .http
            .execute(request.clone())
            .await
            .map_err(|error| match error.kind() {
                HttpErrorKind::Timeout => PipelineError::Timeout {
                    destination: destination.to_owned(),
                    message: error.message().to_owned(),
                },
                HttpErrorKind::Connect | HttpErrorKind::Other => PipelineError::TransientNetwork {
                    destination: destination.to_owned(),
                    message: error.message().to_owned(),
                },
            })?;

        if response.is_success() {
            return Ok(response);
        }

        let mut body_excerpt = response.body;
        body_excerpt.truncate(BODY_EXCERPT_LEN);
        Err(PipelineError::UpstreamStatus {
            destination: destination.to_owned(),
            status: response.status,
            body_excerpt,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::{HttpError, HttpResponse};
    use std::collections::VecDeque;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Plays back a scripted sequence of transport outcomes and counts calls.
    struct ScriptedClient {
        responses: Mutex<VecDeque<Result<HttpResponse, HttpError>>>,
        calls: AtomicU32,
    }

    impl ScriptedClient {
        fn new(responses: Vec<Result<HttpResponse, HttpError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                calls: AtomicU32::new(0),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl HttpClient for ScriptedClient {
        fn execute<'a>(
            &'a self,
            _request: HttpRequest,
        ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self
                .responses
                .lock()
                .expect("script lock is not poisoned")
                .pop_front()
                .unwrap_or_else(|| Ok(HttpResponse::ok_json("{}")));
            Box::pin(async move { next })
        }
    }

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_delay: std::time::Duration::from_millis(1),
            jitter: false,
            ..RetryPolicy::default()
        }
    }

    fn pipeline_with(
        client: Arc<ScriptedClient>,
        offline: bool,
    ) -> RequestPipeline {
        RequestPipeline::with_config(
            client,
            Arc::new(ResilienceRegistry::default()),
            PipelineConfig { offline },
        )
    }

    #[tokio::test]
    async fn cached_response_skips_the_network() {
        let client = Arc::new(ScriptedClient::new(vec![Ok(HttpResponse::ok_json("first"))]));
        let pipeline = pipeline_with(client.clone(), false);
        let request = HttpRequest::get("https://example.test/search").with_param("gene", "BRAF");

        let first = pipeline
            .execute(request.clone(), "example.test", CacheTtl::Seconds(60), &fast_policy(1))
            .await
            .expect("first call succeeds");
        let second = pipeline
            .execute(request, "example.test", CacheTtl::Seconds(60), &fast_policy(1))
            .await
            .expect("second call is served from cache");

        assert_eq!(first, "first");
        assert_eq!(second, "first");
        assert_eq!(client.calls(), 1);
    }

    #[tokio::test]
    async fn retries_retryable_status_then_succeeds() {
        let client = Arc::new(ScriptedClient::new(vec![
            Ok(HttpResponse::with_status(503, "unavailable")),
            Ok(HttpResponse::ok_json("recovered")),
        ]));
        let pipeline = pipeline_with(client.clone(), false);

        let body = pipeline
            .execute(
                HttpRequest::get("https://example.test/search"),
                "example.test",
                CacheTtl::Bypass,
                &fast_policy(3),
            )
            .await
            .expect("second attempt succeeds");

        assert_eq!(body, "recovered");
        assert_eq!(client.calls(), 2);
    }

    #[tokio::test]
    async fn non_retryable_status_fails_on_first_attempt() {
        let client = Arc::new(ScriptedClient::new(vec![Ok(HttpResponse::with_status(
            404, "not found",
        ))]));
        let pipeline = pipeline_with(client.clone(), false);

        let error = pipeline
            .execute(
                HttpRequest::get("https://example.test/search"),
                "example.test",
                CacheTtl::Bypass,
                &fast_policy(3),
            )
            .await
            .expect_err("404 must not be retried");

        assert_eq!(error.status(), Some(404));
        assert_eq!(client.calls(), 1);
    }

    #[tokio::test]
    async fn exhausted_retries_surface_the_last_error() {
        let client = Arc::new(ScriptedClient::new(vec![
            Err(HttpError::timeout("t1")),
            Err(HttpError::timeout("t2")),
            Err(HttpError::timeout("t3")),
        ]));
        let pipeline = pipeline_with(client.clone(), false);

        let error = pipeline
            .execute(
                HttpRequest::get("https://example.test/search"),
                "example.test",
                CacheTtl::Bypass,
                &fast_policy(3),
            )
            .await
            .expect_err("all attempts time out");

        assert_eq!(client.calls(), 3);
        assert!(matches!(error, PipelineError::Timeout { ref message, .. } if message == "t3"));
    }

    #[tokio::test]
    async fn offline_miss_is_a_hard_error_without_network() {
        let client = Arc::new(ScriptedClient::new(vec![Ok(HttpResponse::ok_json("x"))]));
        let pipeline = pipeline_with(client.clone(), true);

        let error = pipeline
            .execute(
                HttpRequest::get("https://example.test/search"),
                "example.test",
                CacheTtl::Seconds(60),
                &fast_policy(3),
            )
            .await
            .expect_err("offline miss must fail");

        assert!(matches!(error, PipelineError::OfflineMiss { .. }));
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn offline_mode_serves_previously_cached_payloads() {
        let client = Arc::new(ScriptedClient::new(vec![Ok(HttpResponse::ok_json("warm"))]));
        let registry = Arc::new(ResilienceRegistry::default());
        let online = RequestPipeline::new(client.clone(), registry.clone());
        let request = HttpRequest::get("https://example.test/search");

        online
            .execute(request.clone(), "example.test", CacheTtl::Seconds(60), &fast_policy(1))
            .await
            .expect("warm the cache");

        let offline = RequestPipeline::with_config(
            client.clone(),
            registry,
            PipelineConfig { offline: true },
        );
        let body = offline
            .execute(request, "example.test", CacheTtl::Seconds(60), &fast_policy(1))
            .await
            .expect("offline hit");

        assert_eq!(body, "warm");
        assert_eq!(client.calls(), 1);
    }

    #[tokio::test]
    async fn open_circuit_fails_fast_without_invoking_transport() {
        let failures: Vec<Result<HttpResponse, HttpError>> =
            (0..5).map(|i| Err(HttpError::connect(format!("refused {i}")))).collect();
        let client = Arc::new(ScriptedClient::new(failures));
        let registry = Arc::new(
            ResilienceRegistry::new(
                crate::circuit_breaker::CircuitBreakerConfig {
                    failure_threshold: 2,
                    ..Default::default()
                },
                crate::rate_limit::RateLimit::new(1000.0, 1000),
            ),
        );
        let pipeline = RequestPipeline::new(client.clone(), registry);
        let request = HttpRequest::get("https://example.test/search");

        // Two non-retrying failures trip the breaker.
        for _ in 0..2 {
            let _ = pipeline
                .execute(request.clone(), "example.test", CacheTtl::Bypass, &fast_policy(1))
                .await;
        }
        assert_eq!(client.calls(), 2);

        let error = pipeline
            .execute(request, "example.test", CacheTtl::Bypass, &fast_policy(1))
            .await
            .expect_err("breaker is open");

        assert!(matches!(error, PipelineError::CircuitOpen { .. }));
        assert_eq!(client.calls(), 2, "open circuit must not invoke the transport");
    }

    #[tokio::test]
    async fn breaker_counts_every_retry_attempt() {
        let client = Arc::new(ScriptedClient::new(vec![
            Err(HttpError::connect("r1")),
            Err(HttpError::connect("r2")),
            Err(HttpError::connect("r3")),
        ]));
        let registry = Arc::new(ResilienceRegistry::new(
            crate::circuit_breaker::CircuitBreakerConfig {
                failure_threshold: 3,
                ..Default::default()
            },
            crate::rate_limit::RateLimit::new(1000.0, 1000),
        ));
        let pipeline = RequestPipeline::new(client.clone(), registry.clone());

        let _ = pipeline
            .execute(
                HttpRequest::get("https://example.test/search"),
                "example.test",
                CacheTtl::Bypass,
                &fast_policy(3),
            )
            .await;

        // One logical call, three underlying attempts, all counted.
        assert_eq!(client.calls(), 3);
        assert_eq!(
            registry.breaker("example.test").state(),
            crate::circuit_breaker::CircuitState::Open
        );
    }
}
