//! PubMed/PubTator3 article search backend.

use std::sync::Arc;

use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::{Date, OffsetDateTime};

use crate::adapters::param_text;
use crate::backend::{push_param_value, SearchBackend, SearchFuture, SearchParams};
use crate::cache::CacheTtl;
use crate::domain::{PublicationTier, ResultItem, SearchDomain};
use crate::error::SearchError;
use crate::http_client::HttpRequest;
use crate::pipeline::RequestPipeline;
use crate::query::{ParsedQuery, QueryDomain};
use crate::retry::RetryPolicy;

const DESTINATION: &str = "www.ncbi.nlm.nih.gov";
const SEARCH_URL: &str = "https://www.ncbi.nlm.nih.gov/research/pubtator3-api/search/";
/// Literature moves slowly; an hour of caching is safe.
const CACHE_TTL: CacheTtl = CacheTtl::Seconds(3600);

/// Article search over the PubTator3 literature API.
///
/// Without a pipeline the backend serves deterministic fixtures.
#[derive(Default)]
pub struct PubmedBackend {
    pipeline: Option<Arc<RequestPipeline>>,
    retry: RetryPolicy,
}

impl PubmedBackend {
    pub fn with_pipeline(pipeline: Arc<RequestPipeline>) -> Self {
        Self {
            pipeline: Some(pipeline),
            retry: RetryPolicy::default(),
        }
    }
}

impl SearchBackend for PubmedBackend {
    fn domain(&self) -> SearchDomain {
        SearchDomain::Articles
    }

    fn map_fields(&self, query: &ParsedQuery) -> SearchParams {
        let mut params = SearchParams::new();

        if let Some(gene) = query.cross_field("gene") {
            push_param_value(&mut params, "genes", gene);
        }
        if let Some(disease) = query.cross_field("disease") {
            push_param_value(&mut params, "diseases", disease);
        }
        if let Some(variant) = query.cross_field("variant") {
            push_param_value(&mut params, "variants", variant);
        }

        if let Some(fields) = query.domain_fields.get(&QueryDomain::Articles) {
            for (short_name, value) in fields {
                match *short_name {
                    "keyword" => push_param_value(&mut params, "keywords", value.clone()),
                    "author" => {
                        params.insert(String::from("author"), Value::String(value.clone()));
                    }
                    "journal" => {
                        params.insert(String::from("journal"), Value::String(value.clone()));
                    }
                    "date" => {
                        params.insert(String::from("pub_date"), Value::String(value.clone()));
                    }
                    _ => {}
                }
            }
        }

        params
    }

    fn search<'a>(&'a self, params: SearchParams) -> SearchFuture<'a> {
        Box::pin(async move {
            let Some(pipeline) = &self.pipeline else {
                return Ok(fixture_items(&params));
            };

            let text = search_text(&params);
            let request = HttpRequest::get(SEARCH_URL)
                .with_param("text", text)
                .with_param("page_size", "25");

            let body = pipeline
                .execute(request, DESTINATION, CACHE_TTL, &self.retry)
                .await
                .map_err(|source| SearchError::Pipeline {
                    domain: SearchDomain::Articles,
                    source,
                })?;

            parse_articles(&body)
        })
    }
}

/// Combined full-text search expression from the projected parameters.
fn search_text(params: &SearchParams) -> String {
    let mut parts = Vec::new();
    for key in ["genes", "variants", "diseases", "keywords"] {
        if let Some(text) = param_text(params, key) {
            parts.push(text);
        }
    }
    for key in ["author", "journal"] {
        if let Some(text) = param_text(params, key) {
            parts.push(text);
        }
    }
    parts.join(" ")
}

fn parse_articles(body: &str) -> Result<Vec<ResultItem>, SearchError> {
    let payload: Value = serde_json::from_str(body).map_err(|e| SearchError::MalformedResponse {
        domain: SearchDomain::Articles,
        message: format!("invalid json: {e}"),
    })?;

    let results = payload["results"]
        .as_array()
        .ok_or_else(|| SearchError::MalformedResponse {
            domain: SearchDomain::Articles,
            message: String::from("missing 'results' array"),
        })?;

    let mut items = Vec::with_capacity(results.len());
    for entry in results {
        let Some(pmid) = entry["pmid"]
            .as_u64()
            .map(|id| id.to_string())
            .or_else(|| entry["pmid"].as_str().map(str::to_owned))
        else {
            // Entries without a PMID cannot be linked; skip rather than fail
            // the whole page.
            continue;
        };

        let journal = entry["journal"].as_str().unwrap_or_default();
        items.push(ResultItem {
            url: format!("https://pubmed.ncbi.nlm.nih.gov/{pmid}/"),
            id: pmid,
            title: entry["title"].as_str().unwrap_or_default().to_owned(),
            snippet: entry["text_hl"]
                .as_str()
                .or_else(|| entry["abstract"].as_str())
                .unwrap_or_default()
                .to_owned(),
            source: SearchDomain::Articles,
            tier: tier_for_journal(journal),
            doi: entry["doi"].as_str().map(str::to_owned),
            date: parse_date(entry["date"].as_str()),
        });
    }

    Ok(items)
}

fn tier_for_journal(journal: &str) -> PublicationTier {
    let lowered = journal.to_ascii_lowercase();
    if lowered.contains("biorxiv") || lowered.contains("medrxiv") {
        PublicationTier::Preprint
    } else {
        PublicationTier::PeerReviewed
    }
}

/// PubTator3 dates arrive as RFC 3339 timestamps or bare `YYYY-MM-DD`.
fn parse_date(value: Option<&str>) -> Option<Date> {
    let value = value?;
    if let Ok(timestamp) = OffsetDateTime::parse(value, &Rfc3339) {
        return Some(timestamp.date());
    }
    let format = time::macros::format_description!("[year]-[month]-[day]");
    Date::parse(value, &format).ok()
}

fn fixture_items(params: &SearchParams) -> Vec<ResultItem> {
    let topic = param_text(params, "genes")
        .or_else(|| param_text(params, "diseases"))
        .or_else(|| param_text(params, "keywords"))
        .unwrap_or_else(|| String::from("biomedicine"));

    vec![
        ResultItem {
            id: String::from("38100000"),
            title: format!("Targeted therapy advances in {topic}"),
            snippet: format!("A peer-reviewed study of {topic}."),
            url: String::from("https://pubmed.ncbi.nlm.nih.gov/38100000/"),
            source: SearchDomain::Articles,
            tier: PublicationTier::PeerReviewed,
            doi: Some(String::from("10.1000/bq.38100000")),
            date: Some(time::macros::date!(2023 - 11 - 02)),
        },
        ResultItem {
            id: String::from("38100001"),
            title: format!("Preliminary findings on {topic}"),
            snippet: format!("A preprint describing {topic}."),
            url: String::from("https://pubmed.ncbi.nlm.nih.gov/38100001/"),
            source: SearchDomain::Articles,
            tier: PublicationTier::Preprint,
            doi: Some(String::from("10.1101/bq.38100001")),
            date: Some(time::macros::date!(2024 - 02 - 17)),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::parse;

    #[test]
    fn maps_cross_fields_into_article_shape() {
        let backend = PubmedBackend::default();
        let parsed = parse("gene:BRAF disease:melanoma articles.journal:Nature").expect("valid");

        let params = backend.map_fields(&parsed);
        assert_eq!(params.get("genes"), Some(&serde_json::json!(["BRAF"])));
        assert_eq!(params.get("diseases"), Some(&serde_json::json!(["melanoma"])));
        assert_eq!(params.get("journal"), Some(&serde_json::json!("Nature")));
    }

    #[test]
    fn parses_pubtator_payload() {
        let body = r#"{
            "results": [
                {
                    "pmid": 38123456,
                    "title": "BRAF V600E in melanoma",
                    "journal": "Nature Medicine",
                    "doi": "10.1038/nm.1234",
                    "date": "2023-06-15T00:00:00Z",
                    "text_hl": "BRAF mutations drive..."
                },
                {
                    "pmid": 38123457,
                    "title": "Early data",
                    "journal": "bioRxiv",
                    "date": "2024-01-05"
                },
                {"title": "no pmid, skipped"}
            ]
        }"#;

        let items = parse_articles(body).expect("payload parses");
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, "38123456");
        assert_eq!(items[0].tier, PublicationTier::PeerReviewed);
        assert_eq!(items[0].doi.as_deref(), Some("10.1038/nm.1234"));
        assert_eq!(items[0].date, Some(time::macros::date!(2023 - 06 - 15)));
        assert_eq!(items[1].tier, PublicationTier::Preprint);
    }

    #[test]
    fn malformed_payload_is_a_typed_error() {
        let error = parse_articles("not json").expect_err("must fail");
        assert!(matches!(error, SearchError::MalformedResponse { .. }));
    }

    #[tokio::test]
    async fn fixture_mode_returns_deterministic_items() {
        let backend = PubmedBackend::default();
        let parsed = parse("gene:BRAF").expect("valid");
        let params = backend.map_fields(&parsed);

        let items = backend.search(params).await.expect("fixture search");
        assert_eq!(items.len(), 2);
        assert!(items[0].title.contains("BRAF"));
    }
}
