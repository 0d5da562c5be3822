use std::time::Duration;

use thiserror::Error;

use crate::domain::SearchDomain;

/// Classification used by the retry policy and circuit-breaker predicates.
///
/// Retryability and failure accounting always read this kind, never the
/// formatted message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineErrorKind {
    /// Connection-level failure (DNS, refused, reset, body read).
    Transient,
    /// The request exceeded its per-call timeout.
    Timeout,
    /// The upstream answered a non-success HTTP status.
    UpstreamStatus,
    /// The destination's circuit is open; the call was never attempted.
    CircuitOpen,
    /// Offline mode with no cached response for the request.
    OfflineMiss,
    /// The upstream payload could not be parsed.
    ResultParsing,
}

/// Failure surfaced by the outbound request pipeline.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("connection to '{destination}' failed: {message}")]
    TransientNetwork { destination: String, message: String },

    #[error("request to '{destination}' timed out: {message}")]
    Timeout { destination: String, message: String },

    #[error("'{destination}' answered status {status}: {body_excerpt}")]
    UpstreamStatus {
        destination: String,
        status: u16,
        body_excerpt: String,
    },

    #[error("circuit for '{destination}' is open{}", open_suffix(.since_last_failure))]
    CircuitOpen {
        destination: String,
        /// Time since the failure that keeps the circuit open, when known.
        since_last_failure: Option<Duration>,
    },

    #[error("offline mode: no cached response for '{destination}' request")]
    OfflineMiss { destination: String },

    #[error("failed to parse '{destination}' payload: {message}")]
    ResultParsing { destination: String, message: String },
}

fn open_suffix(since: &Option<Duration>) -> String {
    match since {
        Some(elapsed) => format!(" (last failure {}s ago)", elapsed.as_secs()),
        None => String::new(),
    }
}

impl PipelineError {
    pub const fn kind(&self) -> PipelineErrorKind {
        match self {
            Self::TransientNetwork { .. } => PipelineErrorKind::Transient,
            Self::Timeout { .. } => PipelineErrorKind::Timeout,
            Self::UpstreamStatus { .. } => PipelineErrorKind::UpstreamStatus,
            Self::CircuitOpen { .. } => PipelineErrorKind::CircuitOpen,
            Self::OfflineMiss { .. } => PipelineErrorKind::OfflineMiss,
            Self::ResultParsing { .. } => PipelineErrorKind::ResultParsing,
        }
    }

    /// HTTP status carried by this error, when any.
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::UpstreamStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn destination(&self) -> &str {
        match self {
            Self::TransientNetwork { destination, .. }
            | Self::Timeout { destination, .. }
            | Self::UpstreamStatus { destination, .. }
            | Self::CircuitOpen { destination, .. }
            | Self::OfflineMiss { destination, .. }
            | Self::ResultParsing { destination, .. } => destination,
        }
    }
}

/// Malformed caller-supplied query. Never retried, surfaced directly.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("query cannot be empty")]
    EmptyQuery,

    #[error("unterminated quote in query: '{query}'")]
    UnterminatedQuote { query: String },

    #[error("unknown search domain '{value}', expected one of articles, trials, variants")]
    UnknownDomain { value: String },
}

/// Failure of one domain back-end during aggregate execution.
///
/// Only ever surfaced per-domain in aggregate results, except
/// [`SearchError::UnregisteredDomain`] which is a hard routing failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SearchError {
    #[error("{domain} search failed: {source}")]
    Pipeline {
        domain: SearchDomain,
        source: PipelineError,
    },

    #[error("{domain} response was malformed: {message}")]
    MalformedResponse {
        domain: SearchDomain,
        message: String,
    },

    #[error("routing plan references unregistered domain '{domain}'")]
    UnregisteredDomain { domain: SearchDomain },

    #[error("{domain} search task failed: {message}")]
    TaskFailed {
        domain: SearchDomain,
        message: String,
    },
}

impl SearchError {
    pub const fn domain(&self) -> SearchDomain {
        match self {
            Self::Pipeline { domain, .. }
            | Self::MalformedResponse { domain, .. }
            | Self::UnregisteredDomain { domain }
            | Self::TaskFailed { domain, .. } => *domain,
        }
    }
}

/// Hard failure of the unified search entry point.
///
/// Partial back-end failures never produce this; they are reported as
/// per-domain diagnostics on the aggregate result.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Routing(#[from] SearchError),
}
