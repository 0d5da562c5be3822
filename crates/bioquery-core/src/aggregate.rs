//! Concurrent plan execution and deterministic result merging.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use tokio::task::JoinSet;

use crate::backend::SearchBackend;
use crate::domain::{AggregatedResult, DomainDiagnostic, ResultItem, SearchDomain};
use crate::error::{EngineError, SearchError};
use crate::query::{parse, ParsedQuery};
use crate::routing::{QueryRouter, RoutingPlan};

/// Executes routing plans with fan-out/fan-in semantics.
///
/// Each back-end failure is captured per domain; one domain's failure never
/// aborts the others and never raises to the caller.
pub struct Aggregator {
    backends: HashMap<SearchDomain, Arc<dyn SearchBackend>>,
}

impl Aggregator {
    pub fn new(backends: Vec<Arc<dyn SearchBackend>>) -> Self {
        let backends = backends
            .into_iter()
            .map(|backend| (backend.domain(), backend))
            .collect();
        Self { backends }
    }

    /// Runs every plan entry concurrently and returns the per-domain
    /// outcomes, keyed and ordered by domain.
    pub async fn run(
        &self,
        plan: RoutingPlan,
    ) -> BTreeMap<SearchDomain, Result<Vec<ResultItem>, SearchError>> {
        let mut tasks = JoinSet::new();
        let mut outcomes = BTreeMap::new();
        let mut spawned = Vec::new();

        for entry in plan.entries {
            let Some(backend) = self.backends.get(&entry.domain).cloned() else {
                outcomes.insert(
                    entry.domain,
                    Err(SearchError::UnregisteredDomain {
                        domain: entry.domain,
                    }),
                );
                continue;
            };
            spawned.push(entry.domain);
            tasks.spawn(async move {
                let result = backend.search(entry.params).await;
                (entry.domain, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((domain, result)) => {
                    if let Err(error) = &result {
                        tracing::warn!(%domain, error = %error, "domain search failed");
                    }
                    outcomes.insert(domain, result);
                }
                // A panicked task loses its domain tag; the diff against
                // `spawned` below recovers it.
                Err(join_error) => {
                    tracing::warn!(error = %join_error, "search task aborted");
                }
            }
        }

        // Every spawned domain must report an outcome; a task that panicked
        // never delivered one, so record the failure in its place.
        for domain in spawned {
            outcomes.entry(domain).or_insert_with(|| {
                Err(SearchError::TaskFailed {
                    domain,
                    message: String::from("search task panicked before completing"),
                })
            });
        }

        outcomes
    }

    /// Runs the plan and merges per-domain results: deduplicate by natural
    /// key (first occurrence wins), then sort peer-reviewed before preprint,
    /// newest first, with stable ties.
    pub async fn execute(&self, plan: RoutingPlan) -> AggregatedResult {
        let outcomes = self.run(plan).await;
        merge(outcomes)
    }
}

fn merge(
    outcomes: BTreeMap<SearchDomain, Result<Vec<ResultItem>, SearchError>>,
) -> AggregatedResult {
    let mut items = Vec::new();
    let mut diagnostics = Vec::new();
    let mut seen = HashSet::new();

    // BTreeMap iteration gives a deterministic domain order regardless of
    // task completion order.
    for (domain, outcome) in outcomes {
        match outcome {
            Ok(domain_items) => {
                for item in domain_items {
                    if seen.insert(item.dedup_key()) {
                        items.push(item);
                    }
                }
            }
            Err(error) => diagnostics.push(DomainDiagnostic {
                domain,
                error: error.to_string(),
            }),
        }
    }

    items.sort_by_key(|item| (item.tier, Reverse(item.date)));

    AggregatedResult { items, diagnostics }
}

/// Top-level unified search: parse, route, aggregate.
pub struct SearchEngine {
    router: QueryRouter,
    aggregator: Aggregator,
}

impl SearchEngine {
    pub fn new(backends: Vec<Arc<dyn SearchBackend>>) -> Self {
        Self {
            router: QueryRouter::new(backends.clone()),
            aggregator: Aggregator::new(backends),
        }
    }

    pub fn route(&self, query: &ParsedQuery) -> Result<RoutingPlan, SearchError> {
        self.router.route(query)
    }

    /// Runs the full query path. Only a malformed query or router
    /// misconfiguration fails hard; back-end failures surface as diagnostics
    /// on the result.
    pub async fn search(&self, query: &str) -> Result<AggregatedResult, EngineError> {
        let parsed = parse(query)?;
        let plan = self.router.route(&parsed)?;
        Ok(self.aggregator.execute(plan).await)
    }
}
