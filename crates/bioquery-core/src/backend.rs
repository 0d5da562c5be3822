use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;

use serde_json::Value;

use crate::domain::{ResultItem, SearchDomain};
use crate::error::SearchError;
use crate::query::ParsedQuery;

/// Back-end parameter map in the shape the concrete API expects. Sorted keys
/// keep routing plans deterministic and comparable in tests.
pub type SearchParams = BTreeMap<String, Value>;

pub type SearchFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Vec<ResultItem>, SearchError>> + Send + 'a>>;

/// Contract every domain back-end implements to join the router and
/// aggregator.
///
/// The core never sees the HTTP shape of a concrete external API: a back-end
/// owns its field projection and its search call, and returns normalized
/// items or a typed error.
pub trait SearchBackend: Send + Sync {
    fn domain(&self) -> SearchDomain;

    /// Projects a parsed query into this back-end's parameter shape,
    /// including the cross-domain fields that imply this domain.
    fn map_fields(&self, query: &ParsedQuery) -> SearchParams;

    fn search<'a>(&'a self, params: SearchParams) -> SearchFuture<'a>;
}

/// Appends a string to an array-valued parameter, creating it on first use.
pub(crate) fn push_param_value(params: &mut SearchParams, key: &str, value: impl Into<String>) {
    let value = Value::String(value.into());
    match params.get_mut(key) {
        Some(Value::Array(values)) => {
            if !values.contains(&value) {
                values.push(value);
            }
        }
        _ => {
            params.insert(key.to_owned(), Value::Array(vec![value]));
        }
    }
}
