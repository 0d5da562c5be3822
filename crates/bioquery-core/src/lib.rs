//! # Bioquery Core
//!
//! Resilient request pipeline and unified query engine for biomedical search
//! aggregation.
//!
//! ## Overview
//!
//! This crate provides the foundational components for bioquery:
//!
//! - **Resilience primitives**: per-destination circuit breaker, blocking
//!   token-bucket rate limiter, retry-with-backoff, TTL response cache
//! - **Request pipeline** composing those primitives around every outbound
//!   HTTP call
//! - **Unified query language**: field registry, parser, schema discovery
//! - **Query router** mapping parsed queries onto a parallel fan-out plan
//! - **Aggregator** executing the plan concurrently with deterministic
//!   merging and partial-failure tolerance
//! - **Reference adapters** for PubMed, ClinicalTrials.gov, and
//!   MyVariant.info
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Domain back-ends (PubMed, ClinicalTrials.gov, MyVariant) |
//! | [`aggregate`] | Concurrent plan execution and result merging |
//! | [`backend`] | Search back-end contract |
//! | [`cache`] | TTL response cache |
//! | [`circuit_breaker`] | Per-destination circuit breaker |
//! | [`domain`] | Canonical result model |
//! | [`error`] | Error taxonomy |
//! | [`http_client`] | HTTP transport abstraction |
//! | [`pipeline`] | Outbound request orchestrator |
//! | [`query`] | Field-based query language |
//! | [`rate_limit`] | Token-bucket rate limiting |
//! | [`registry`] | Per-destination resilience state |
//! | [`retry`] | Retry policy and backoff |
//! | [`routing`] | Query-to-plan routing |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use bioquery_core::{
//!     ClinicalTrialsBackend, MyVariantBackend, PubmedBackend, SearchEngine,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = SearchEngine::new(vec![
//!         Arc::new(PubmedBackend::default()),
//!         Arc::new(ClinicalTrialsBackend::default()),
//!         Arc::new(MyVariantBackend::default()),
//!     ]);
//!
//!     let result = engine.search("gene:BRAF AND trials.phase:3").await?;
//!     for item in &result.items {
//!         println!("[{}] {}", item.source, item.title);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Transient failures are retried per [`retry::RetryPolicy`] and counted by
//! the circuit breaker; per-domain search failures surface as diagnostics on
//! the aggregate result; only malformed queries and router misconfiguration
//! fail hard.

pub mod adapters;
pub mod aggregate;
pub mod backend;
pub mod cache;
pub mod circuit_breaker;
pub mod domain;
pub mod error;
pub mod http_client;
pub mod pipeline;
pub mod query;
pub mod rate_limit;
pub mod registry;
pub mod retry;
pub mod routing;

// Re-export commonly used types at crate root for convenience

// Adapter implementations
pub use adapters::{ClinicalTrialsBackend, MyVariantBackend, PubmedBackend};

// Aggregation
pub use aggregate::{Aggregator, SearchEngine};

// Back-end contract
pub use backend::{SearchBackend, SearchFuture, SearchParams};

// Caching
pub use cache::{cache_key, CacheStore, CacheTtl};

// Circuit breaker
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState, OpenCircuit};

// Canonical result model
pub use domain::{
    AggregatedResult, DomainDiagnostic, PublicationTier, ResultItem, SearchDomain,
};

// Error taxonomy
pub use error::{EngineError, PipelineError, PipelineErrorKind, QueryError, SearchError};

// HTTP client types
pub use http_client::{
    HttpClient, HttpError, HttpErrorKind, HttpMethod, HttpRequest, HttpResponse, NoopHttpClient,
    ReqwestHttpClient,
};

// Request pipeline
pub use pipeline::{PipelineConfig, RequestPipeline};

// Query language
pub use query::{
    parse, schema, FieldDefinition, FieldOperator, FieldType, ParsedQuery, QueryDomain,
    QuerySchema, QueryTerm,
};

// Rate limiting
pub use rate_limit::{DestinationLimiter, RateLimit};

// Resilience registry
pub use registry::ResilienceRegistry;

// Retry logic
pub use retry::{RetryDecision, RetryPolicy};

// Routing
pub use routing::{CoordinationStrategy, PlanEntry, QueryRouter, RoutingPlan};
