//! ClinicalTrials.gov study search backend (v2 API).

use std::sync::Arc;

use serde_json::Value;
use time::Date;

use crate::adapters::param_text;
use crate::backend::{push_param_value, SearchBackend, SearchFuture, SearchParams};
use crate::cache::CacheTtl;
use crate::domain::{PublicationTier, ResultItem, SearchDomain};
use crate::error::SearchError;
use crate::http_client::HttpRequest;
use crate::pipeline::RequestPipeline;
use crate::query::{ParsedQuery, QueryDomain};
use crate::retry::RetryPolicy;

const DESTINATION: &str = "clinicaltrials.gov";
const SEARCH_URL: &str = "https://clinicaltrials.gov/api/v2/studies";
/// Trial registrations update daily at most; cache briefly.
const CACHE_TTL: CacheTtl = CacheTtl::Seconds(900);

/// Trial search over the ClinicalTrials.gov v2 API.
///
/// Without a pipeline the backend serves deterministic fixtures.
#[derive(Default)]
pub struct ClinicalTrialsBackend {
    pipeline: Option<Arc<RequestPipeline>>,
    retry: RetryPolicy,
}

impl ClinicalTrialsBackend {
    pub fn with_pipeline(pipeline: Arc<RequestPipeline>) -> Self {
        Self {
            pipeline: Some(pipeline),
            retry: RetryPolicy::default(),
        }
    }
}

impl SearchBackend for ClinicalTrialsBackend {
    fn domain(&self) -> SearchDomain {
        SearchDomain::Trials
    }

    fn map_fields(&self, query: &ParsedQuery) -> SearchParams {
        let mut params = SearchParams::new();

        // Genes have no dedicated trial filter; they ride along as free-text
        // terms. Diseases map onto the condition filter.
        if let Some(gene) = query.cross_field("gene") {
            push_param_value(&mut params, "other_terms", gene);
        }
        if let Some(disease) = query.cross_field("disease") {
            push_param_value(&mut params, "conditions", disease);
        }

        if let Some(fields) = query.domain_fields.get(&QueryDomain::Trials) {
            for (short_name, value) in fields {
                match *short_name {
                    "condition" => push_param_value(&mut params, "conditions", value.clone()),
                    "intervention" => {
                        push_param_value(&mut params, "interventions", value.clone());
                    }
                    "phase" => {
                        params.insert(String::from("phase"), Value::String(value.clone()));
                    }
                    "status" => {
                        params.insert(
                            String::from("recruiting_status"),
                            Value::String(value.clone()),
                        );
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

            let body = pipeline
                .execute(build_request(&params), DESTINATION, CACHE_TTL, &self.retry)
                .await
                .map_err(|source| SearchError::Pipeline {
                    domain: SearchDomain::Trials,
                    source,
                })?;

            parse_studies(&body)
        })
    }
}

/// Maps the projected parameters onto the v2 query surface.
fn build_request(params: &SearchParams) -> HttpRequest {
    let mut request = HttpRequest::get(SEARCH_URL)
        .with_param("format", "json")
        .with_param("pageSize", "25");
    if let Some(conditions) = param_text(params, "conditions") {
        request = request.with_param("query.cond", conditions);
    }
    if let Some(terms) = param_text(params, "other_terms") {
        request = request.with_param("query.term", terms);
    }
    if let Some(interventions) = param_text(params, "interventions") {
        request = request.with_param("query.intr", interventions);
    }
    if let Some(status) = param_text(params, "recruiting_status") {
        request = request.with_param("filter.overallStatus", status.to_ascii_uppercase());
    }
    // Phase is an aggregator facet in v2, not a query.* term.
    if let Some(phase) = param_text(params, "phase") {
        request = request.with_param("aggFilters", format!("phase:{phase}"));
    }
    request
}

fn parse_studies(body: &str) -> Result<Vec<ResultItem>, SearchError> {
    let payload: Value = serde_json::from_str(body).map_err(|e| SearchError::MalformedResponse {
        domain: SearchDomain::Trials,
        message: format!("invalid json: {e}"),
    })?;

    let studies = payload["studies"]
        .as_array()
        .ok_or_else(|| SearchError::MalformedResponse {
            domain: SearchDomain::Trials,
            message: String::from("missing 'studies' array"),
        })?;

    let mut items = Vec::with_capacity(studies.len());
    for study in studies {
        let protocol = &study["protocolSection"];
        let Some(nct_id) = protocol["identificationModule"]["nctId"].as_str() else {
            continue;
        };

        items.push(ResultItem {
            id: nct_id.to_owned(),
            title: protocol["identificationModule"]["briefTitle"]
                .as_str()
                .unwrap_or_default()
                .to_owned(),
            snippet: protocol["descriptionModule"]["briefSummary"]
                .as_str()
                .unwrap_or_default()
                .to_owned(),
            url: format!("https://clinicaltrials.gov/study/{nct_id}"),
            source: SearchDomain::Trials,
            tier: PublicationTier::PeerReviewed,
            doi: None,
            date: parse_study_date(protocol),
        });
    }

    Ok(items)
}

fn parse_study_date(protocol: &Value) -> Option<Date> {
    let value = protocol["statusModule"]["lastUpdatePostDateStruct"]["date"]
        .as_str()
        .or_else(|| protocol["statusModule"]["lastUpdatePostDate"].as_str())?;
    let format = time::macros::format_description!("[year]-[month]-[day]");
    Date::parse(value, &format).ok()
}

fn fixture_items(params: &SearchParams) -> Vec<ResultItem> {
    let condition = param_text(params, "conditions")
        .or_else(|| param_text(params, "other_terms"))
        .unwrap_or_else(|| String::from("solid tumors"));

    vec![ResultItem {
        id: String::from("NCT05012345"),
        title: format!("Phase 3 study of targeted therapy in {condition}"),
        snippet: format!("Randomized controlled trial for {condition}."),
        url: String::from("https://clinicaltrials.gov/study/NCT05012345"),
        source: SearchDomain::Trials,
        tier: PublicationTier::PeerReviewed,
        doi: None,
        date: Some(time::macros::date!(2024 - 01 - 20)),
    }]
}
