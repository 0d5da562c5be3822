//! Behavior-driven tests for concurrent aggregation and result merging
//!
//! These tests verify HOW per-domain outcomes become one deterministic,
//! deduplicated, ranked result set that tolerates partial failure.

use bioquery_core::{
    Aggregator, ClinicalTrialsBackend, CoordinationStrategy, MyVariantBackend, ParsedQuery,
    PlanEntry, PubmedBackend, PublicationTier, ResultItem, RoutingPlan, SearchBackend,
    SearchDomain, SearchEngine, SearchError, SearchFuture, SearchParams,
};
use bioquery_tests::Arc;
use time::macros::date;
use time::Date;

/// Back-end double answering a canned outcome for its domain.
struct CannedBackend {
    domain: SearchDomain,
    outcome: Result<Vec<ResultItem>, String>,
}

impl CannedBackend {
    fn ok(domain: SearchDomain, items: Vec<ResultItem>) -> Arc<dyn SearchBackend> {
        Arc::new(Self {
            domain,
            outcome: Ok(items),
        })
    }

    fn failing(domain: SearchDomain, message: &str) -> Arc<dyn SearchBackend> {
        Arc::new(Self {
            domain,
            outcome: Err(message.to_owned()),
        })
    }
}

impl SearchBackend for CannedBackend {
    fn domain(&self) -> SearchDomain {
        self.domain
    }

    fn map_fields(&self, _query: &ParsedQuery) -> SearchParams {
        SearchParams::new()
    }

    fn search<'a>(&'a self, _params: SearchParams) -> SearchFuture<'a> {
        let outcome = match &self.outcome {
            Ok(items) => Ok(items.clone()),
            Err(message) => Err(SearchError::MalformedResponse {
                domain: self.domain,
                message: message.clone(),
            }),
        };
        Box::pin(async move { outcome })
    }
}

fn item(
    domain: SearchDomain,
    id: &str,
    tier: PublicationTier,
    doi: Option<&str>,
    date: Option<Date>,
) -> ResultItem {
    ResultItem {
        id: id.to_owned(),
        title: format!("result {id}"),
        snippet: String::new(),
        url: format!("https://example.test/{id}"),
        source: domain,
        tier,
        doi: doi.map(str::to_owned),
        date,
    }
}

fn plan_for(domains: &[SearchDomain]) -> RoutingPlan {
    RoutingPlan {
        entries: domains
            .iter()
            .map(|&domain| PlanEntry {
                domain,
                params: SearchParams::new(),
            })
            .collect(),
        strategy: CoordinationStrategy::Parallel,
    }
}

// =============================================================================
// Aggregation: Merging and ranking
// =============================================================================

#[tokio::test]
async fn when_two_domains_report_the_same_doi_only_the_first_survives() {
    // Given: An article and a trial record describing the same publication
    let aggregator = Aggregator::new(vec![
        CannedBackend::ok(
            SearchDomain::Articles,
            vec![item(
                SearchDomain::Articles,
                "a1",
                PublicationTier::PeerReviewed,
                Some("10.1000/dup"),
                Some(date!(2023 - 05 - 01)),
            )],
        ),
        CannedBackend::ok(
            SearchDomain::Trials,
            vec![item(
                SearchDomain::Trials,
                "t1",
                PublicationTier::PeerReviewed,
                Some("10.1000/DUP"),
                Some(date!(2024 - 01 - 01)),
            )],
        ),
    ]);

    // When: Both domains are aggregated
    let result = aggregator
        .execute(plan_for(&[SearchDomain::Articles, SearchDomain::Trials]))
        .await;

    // Then: DOI comparison is case-insensitive and the earlier domain wins
    assert_eq!(result.items.len(), 1);
    assert_eq!(result.items[0].source, SearchDomain::Articles);
}

#[tokio::test]
async fn when_ranking_peer_reviewed_beats_a_newer_preprint() {
    let aggregator = Aggregator::new(vec![CannedBackend::ok(
        SearchDomain::Articles,
        vec![
            item(
                SearchDomain::Articles,
                "preprint",
                PublicationTier::Preprint,
                None,
                Some(date!(2024 - 06 - 01)),
            ),
            item(
                SearchDomain::Articles,
                "reviewed",
                PublicationTier::PeerReviewed,
                None,
                Some(date!(2022 - 01 - 01)),
            ),
        ],
    )]);

    let result = aggregator.execute(plan_for(&[SearchDomain::Articles])).await;

    assert_eq!(result.items[0].id, "reviewed");
    assert_eq!(result.items[1].id, "preprint");
}

#[tokio::test]
async fn when_ranking_within_a_tier_newest_first_and_undated_last() {
    let aggregator = Aggregator::new(vec![CannedBackend::ok(
        SearchDomain::Articles,
        vec![
            item(
                SearchDomain::Articles,
                "undated",
                PublicationTier::PeerReviewed,
                None,
                None,
            ),
            item(
                SearchDomain::Articles,
                "older",
                PublicationTier::PeerReviewed,
                None,
                Some(date!(2021 - 03 - 01)),
            ),
            item(
                SearchDomain::Articles,
                "newer",
                PublicationTier::PeerReviewed,
                None,
                Some(date!(2024 - 03 - 01)),
            ),
        ],
    )]);

    let result = aggregator.execute(plan_for(&[SearchDomain::Articles])).await;

    let order: Vec<&str> = result.items.iter().map(|item| item.id.as_str()).collect();
    assert_eq!(order, vec!["newer", "older", "undated"]);
}

// =============================================================================
// Aggregation: Partial failure
// =============================================================================

#[tokio::test]
async fn when_one_domain_fails_the_others_still_return_results() {
    let aggregator = Aggregator::new(vec![
        CannedBackend::ok(
            SearchDomain::Articles,
            vec![item(
                SearchDomain::Articles,
                "a1",
                PublicationTier::PeerReviewed,
                None,
                None,
            )],
        ),
        CannedBackend::failing(SearchDomain::Trials, "upstream exploded"),
    ]);

    let result = aggregator
        .execute(plan_for(&[SearchDomain::Articles, SearchDomain::Trials]))
        .await;

    assert_eq!(result.items.len(), 1);
    assert_eq!(result.diagnostics.len(), 1);
    assert_eq!(result.diagnostics[0].domain, SearchDomain::Trials);
    assert!(result.diagnostics[0].error.contains("upstream exploded"));
}

#[tokio::test]
async fn when_every_domain_fails_the_response_is_still_well_formed() {
    let aggregator = Aggregator::new(vec![
        CannedBackend::failing(SearchDomain::Articles, "down"),
        CannedBackend::failing(SearchDomain::Trials, "down"),
        CannedBackend::failing(SearchDomain::Variants, "down"),
    ]);

    let result = aggregator
        .execute(plan_for(&[
            SearchDomain::Articles,
            SearchDomain::Trials,
            SearchDomain::Variants,
        ]))
        .await;

    // No Err escapes; the caller gets an empty set plus one diagnostic per
    // failed domain.
    assert!(result.items.is_empty());
    assert_eq!(result.diagnostics.len(), 3);
}

// =============================================================================
// Aggregation: End-to-end engine flow
// =============================================================================

#[tokio::test]
async fn when_the_engine_searches_a_gene_all_domains_contribute() {
    // Given: The full engine over fixture back-ends
    let engine = SearchEngine::new(vec![
        Arc::new(PubmedBackend::default()) as Arc<dyn SearchBackend>,
        Arc::new(ClinicalTrialsBackend::default()),
        Arc::new(MyVariantBackend::default()),
    ]);

    // When: A cross-domain gene query runs
    let result = engine.search("gene:BRAF").await.expect("search succeeds");

    // Then: Every domain contributed and nothing failed
    assert!(result.diagnostics.is_empty());
    for domain in SearchDomain::ALL {
        assert!(
            result.items.iter().any(|item| item.source == domain),
            "missing results for {domain}"
        );
    }
    // Preprints sink below peer-reviewed results.
    let last = result.items.last().expect("non-empty");
    assert_eq!(last.tier, PublicationTier::Preprint);
}

#[tokio::test]
async fn when_the_engine_gets_a_malformed_query_it_fails_fast() {
    let engine = SearchEngine::new(vec![
        Arc::new(PubmedBackend::default()) as Arc<dyn SearchBackend>,
        Arc::new(ClinicalTrialsBackend::default()),
        Arc::new(MyVariantBackend::default()),
    ]);

    let error = engine.search("   ").await.expect_err("empty query");
    assert!(matches!(
        error,
        bioquery_core::EngineError::Query(bioquery_core::QueryError::EmptyQuery)
    ));
}
