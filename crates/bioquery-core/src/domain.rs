//! Canonical result model shared by every search back-end.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::Date;

use crate::error::QueryError;

/// Closed set of search domains the engine aggregates over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchDomain {
    Articles,
    Trials,
    Variants,
}

impl SearchDomain {
    /// Deterministic merge order for aggregate results.
    pub const ALL: [Self; 3] = [Self::Articles, Self::Trials, Self::Variants];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Articles => "articles",
            Self::Trials => "trials",
            Self::Variants => "variants",
        }
    }
}

impl Display for SearchDomain {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchDomain {
    type Err = QueryError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "articles" => Ok(Self::Articles),
            "trials" => Ok(Self::Trials),
            "variants" => Ok(Self::Variants),
            other => Err(QueryError::UnknownDomain {
                value: other.to_owned(),
            }),
        }
    }
}

/// Two-valued publication rank used as the primary merge sort key.
///
/// Peer-reviewed items sort before preprints regardless of date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublicationTier {
    PeerReviewed,
    Preprint,
}

/// Normalized result item every back-end payload is shaped into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultItem {
    pub id: String,
    pub title: String,
    pub snippet: String,
    pub url: String,
    pub source: SearchDomain,
    pub tier: PublicationTier,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    /// Publication or last-update date, used as the secondary sort key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<Date>,
}

impl ResultItem {
    /// Natural external key for deduplication: DOI when present (articles),
    /// otherwise the per-domain identifier passes through.
    pub fn dedup_key(&self) -> String {
        match &self.doi {
            Some(doi) if !doi.is_empty() => format!("doi:{}", doi.to_ascii_lowercase()),
            _ => format!("{}:{}", self.source, self.id),
        }
    }
}

/// Per-domain failure context attached to an aggregate response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomainDiagnostic {
    pub domain: SearchDomain,
    pub error: String,
}

/// Merged output of one aggregate search.
///
/// Always produced, even when every domain failed; failures appear as
/// diagnostics, never as a hard error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AggregatedResult {
    pub items: Vec<ResultItem>,
    pub diagnostics: Vec<DomainDiagnostic>,
}

impl AggregatedResult {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
