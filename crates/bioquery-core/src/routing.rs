//! Maps a parsed query onto a fan-out routing plan.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, OnceLock};

use regex::Regex;

use crate::backend::{push_param_value, SearchBackend, SearchParams};
use crate::domain::SearchDomain;
use crate::error::SearchError;
use crate::query::{ParsedQuery, QueryDomain};

/// How plan entries are coordinated. No sequential dependency between
/// domains is supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinationStrategy {
    Parallel,
}

/// One back-end invocation within a routing plan.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanEntry {
    pub domain: SearchDomain,
    pub params: SearchParams,
}

/// Fan-out execution plan, built once per query and consumed once by the
/// aggregator.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutingPlan {
    /// Entries in [`SearchDomain::ALL`] order.
    pub entries: Vec<PlanEntry>,
    pub strategy: CoordinationStrategy,
}

impl RoutingPlan {
    pub fn domains(&self) -> Vec<SearchDomain> {
        self.entries.iter().map(|entry| entry.domain).collect()
    }

    pub fn entry(&self, domain: SearchDomain) -> Option<&PlanEntry> {
        self.entries.iter().find(|entry| entry.domain == domain)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Routes parsed queries to the registered domain back-ends.
pub struct QueryRouter {
    backends: HashMap<SearchDomain, Arc<dyn SearchBackend>>,
}

impl QueryRouter {
    pub fn new(backends: Vec<Arc<dyn SearchBackend>>) -> Self {
        let backends = backends
            .into_iter()
            .map(|backend| (backend.domain(), backend))
            .collect();
        Self { backends }
    }

    /// Builds the routing plan for a parsed query.
    ///
    /// A referenced domain without a registered back-end is a hard
    /// misconfiguration error; per-domain runtime failures are handled later
    /// by the aggregator.
    pub fn route(&self, query: &ParsedQuery) -> Result<RoutingPlan, SearchError> {
        let referenced = referenced_domains(query);

        let mut entries = Vec::with_capacity(referenced.len());
        for domain in SearchDomain::ALL {
            if !referenced.contains(&domain) {
                continue;
            }
            let backend = self
                .backends
                .get(&domain)
                .ok_or(SearchError::UnregisteredDomain { domain })?;

            let mut params = backend.map_fields(query);
            if domain == SearchDomain::Articles {
                // Best-effort enrichment: protein-change tokens in the raw
                // text become article keywords. Not a contract; see the
                // heuristic's doc comment.
                for token in mutation_tokens(&query.raw) {
                    push_param_value(&mut params, "keywords", token);
                }
            }

            entries.push(PlanEntry { domain, params });
        }

        Ok(RoutingPlan {
            entries,
            strategy: CoordinationStrategy::Parallel,
        })
    }
}

/// A domain is referenced when it has direct domain-specific fields or when a
/// cross-domain field implies it.
fn referenced_domains(query: &ParsedQuery) -> BTreeSet<SearchDomain> {
    let mut referenced = BTreeSet::new();

    for domain in query.domain_fields.keys() {
        if let Some(search_domain) = domain.search_domain() {
            referenced.insert(search_domain);
        }
    }

    for field in query.cross_fields.keys() {
        for domain in cross_field_implications(field) {
            referenced.insert(*domain);
        }
    }

    referenced
}

fn cross_field_implications(field: &str) -> &'static [SearchDomain] {
    match field {
        "gene" => &[
            SearchDomain::Articles,
            SearchDomain::Trials,
            SearchDomain::Variants,
        ],
        "disease" => &[SearchDomain::Articles, SearchDomain::Trials],
        "variant" => &[SearchDomain::Articles, SearchDomain::Variants],
        _ => &[],
    }
}

/// Scans raw query text for protein-change tokens (letter, digits, then a
/// letter or `*`, e.g. `V600E`, `T790M`, `R175*`).
///
/// A precision/recall heuristic, not a guarantee: it has no documented
/// false-positive bound and may miss unconventional notations.
pub(crate) fn mutation_tokens(raw: &str) -> Vec<String> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| {
        // `\b` cannot follow `*`, so the terminal letter and stop codon
        // cases are spelled out separately.
        Regex::new(r"\b[A-Z]\d+(?:\*|[A-Z]\b)").expect("mutation pattern is a valid regex")
    });

    let mut seen = BTreeSet::new();
    pattern
        .find_iter(raw)
        .map(|m| m.as_str().to_owned())
        .filter(|token| seen.insert(token.clone()))
        .collect()
}
