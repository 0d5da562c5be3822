//! MyVariant.info genetic-variant search backend.

use std::sync::Arc;

use serde_json::Value;

use crate::adapters::param_text;
use crate::backend::{SearchBackend, SearchFuture, SearchParams};
use crate::cache::CacheTtl;
use crate::domain::{PublicationTier, ResultItem, SearchDomain};
use crate::error::SearchError;
use crate::http_client::HttpRequest;
use crate::pipeline::RequestPipeline;
use crate::query::{ParsedQuery, QueryDomain};
use crate::retry::RetryPolicy;

const DESTINATION: &str = "myvariant.info";
const SEARCH_URL: &str = "https://myvariant.info/v1/query";
/// Variant annotations are effectively static.
const CACHE_TTL: CacheTtl = CacheTtl::Seconds(86_400);

/// Variant search over the MyVariant.info query API.
///
/// Without a pipeline the backend serves deterministic fixtures.
#[derive(Default)]
pub struct MyVariantBackend {
    pipeline: Option<Arc<RequestPipeline>>,
    retry: RetryPolicy,
}

impl MyVariantBackend {
    pub fn with_pipeline(pipeline: Arc<RequestPipeline>) -> Self {
        Self {
            pipeline: Some(pipeline),
            retry: RetryPolicy::default(),
        }
    }
}

impl SearchBackend for MyVariantBackend {
    fn domain(&self) -> SearchDomain {
        SearchDomain::Variants
    }

    fn map_fields(&self, query: &ParsedQuery) -> SearchParams {
        let mut params = SearchParams::new();

        // MyVariant takes scalar filters, unlike the literature APIs.
        if let Some(gene) = query.cross_field("gene") {
            params.insert(String::from("gene"), Value::String(gene.to_owned()));
        }
        if let Some(variant) = query.cross_field("variant") {
            params.insert(String::from("variant"), Value::String(variant.to_owned()));
        }

        if let Some(fields) = query.domain_fields.get(&QueryDomain::Variants) {
            for (short_name, value) in fields {
                match *short_name {
                    "significance" => {
                        params.insert(String::from("significance"), Value::String(value.clone()));
                    }
                    "rsid" => {
                        params.insert(String::from("rsid"), Value::String(value.clone()));
                    }
                    "frequency" => {
                        params.insert(String::from("frequency"), Value::String(value.clone()));
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

            let request = HttpRequest::get(SEARCH_URL)
                .with_param("q", lucene_query(&params))
                .with_param("size", "25")
                .with_param("fields", "dbsnp.rsid,clinvar,dbnsfp.genename");

            let body = pipeline
                .execute(request, DESTINATION, CACHE_TTL, &self.retry)
                .await
                .map_err(|source| SearchError::Pipeline {
                    domain: SearchDomain::Variants,
                    source,
                })?;

            parse_variants(&body)
        })
    }
}

/// Builds the Lucene-style query string MyVariant expects.
fn lucene_query(params: &SearchParams) -> String {
    let mut clauses = Vec::new();
    if let Some(gene) = param_text(params, "gene") {
        clauses.push(format!("dbnsfp.genename:{gene}"));
    }
    if let Some(rsid) = param_text(params, "rsid") {
        clauses.push(format!("dbsnp.rsid:{rsid}"));
    }
    if let Some(significance) = param_text(params, "significance") {
        clauses.push(format!("clinvar.rcv.clinical_significance:{significance}"));
    }
    if let Some(variant) = param_text(params, "variant") {
        clauses.push(variant);
    }
    if clauses.is_empty() {
        String::from("*")
    } else {
        clauses.join(" AND ")
    }
}

fn parse_variants(body: &str) -> Result<Vec<ResultItem>, SearchError> {
    let payload: Value = serde_json::from_str(body).map_err(|e| SearchError::MalformedResponse {
        domain: SearchDomain::Variants,
        message: format!("invalid json: {e}"),
    })?;

    let hits = payload["hits"]
        .as_array()
        .ok_or_else(|| SearchError::MalformedResponse {
            domain: SearchDomain::Variants,
            message: String::from("missing 'hits' array"),
        })?;

    let mut items = Vec::with_capacity(hits.len());
    for hit in hits {
        let Some(id) = hit["_id"].as_str() else {
            continue;
        };

        let rsid = hit["dbsnp"]["rsid"].as_str();
        let significance = hit["clinvar"]["rcv"]["clinical_significance"]
            .as_str()
            .or_else(|| hit["clinvar"]["rcv"][0]["clinical_significance"].as_str());

        let snippet = match (rsid, significance) {
            (Some(rsid), Some(significance)) => format!("{rsid}: {significance}"),
            (Some(rsid), None) => rsid.to_owned(),
            (None, Some(significance)) => significance.to_owned(),
            (None, None) => String::new(),
        };

        items.push(ResultItem {
            id: id.to_owned(),
            title: hit["dbnsfp"]["genename"]
                .as_str()
                .map(|gene| format!("{gene} {id}"))
                .unwrap_or_else(|| id.to_owned()),
            snippet,
            url: format!("https://myvariant.info/v1/variant/{id}"),
            source: SearchDomain::Variants,
            tier: PublicationTier::PeerReviewed,
            doi: None,
            date: None,
        });
    }

    Ok(items)
}

fn fixture_items(params: &SearchParams) -> Vec<ResultItem> {
    let gene = param_text(params, "gene").unwrap_or_else(|| String::from("BRAF"));

    vec![ResultItem {
        id: String::from("chr7:g.140453136A>T"),
        title: format!("{gene} chr7:g.140453136A>T"),
        snippet: String::from("rs113488022: Pathogenic"),
        url: String::from("https://myvariant.info/v1/variant/chr7:g.140453136A>T"),
        source: SearchDomain::Variants,
        tier: PublicationTier::PeerReviewed,
        doi: None,
        date: None,
    }]
}
