//! Reference back-end adapters for the three search domains.
//!
//! Each adapter owns its field projection and payload normalization and
//! routes all I/O through the [`RequestPipeline`](crate::pipeline::RequestPipeline).
//! Built without a pipeline, an adapter serves deterministic fixture data so
//! the whole stack can run offline in tests and demos.

mod clinicaltrials;
mod myvariant;
mod pubmed;

pub use clinicaltrials::ClinicalTrialsBackend;
pub use myvariant::MyVariantBackend;
pub use pubmed::PubmedBackend;

use serde_json::Value;

use crate::backend::SearchParams;

/// Joins a string-or-array parameter into one space-separated query value.
pub(crate) fn param_text(params: &SearchParams, key: &str) -> Option<String> {
    match params.get(key)? {
        Value::String(value) => Some(value.clone()),
        Value::Array(values) => {
            let joined = values
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(" ");
            (!joined.is_empty()).then_some(joined)
        }
        other => Some(other.to_string()),
    }
}
