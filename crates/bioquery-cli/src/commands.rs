//! Command dispatch: builds the search engine and runs the requested
//! operation.

use std::process::ExitCode;
use std::sync::Arc;

use bioquery_core::{
    parse, schema, ClinicalTrialsBackend, MyVariantBackend, PipelineConfig, PubmedBackend,
    RateLimit, ReqwestHttpClient, RequestPipeline, ResilienceRegistry, SearchBackend, SearchEngine,
};

use crate::cli::{Cli, Command};
use crate::error::CliError;
use crate::output;

pub async fn run(cli: &Cli) -> Result<ExitCode, CliError> {
    match &cli.command {
        Command::Search(args) => search(cli, &args.query).await,
        Command::Plan(args) => plan(cli, &args.query),
        Command::Fields => {
            output::render_schema(&schema(), cli.format, cli.pretty)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn search(cli: &Cli, query: &str) -> Result<ExitCode, CliError> {
    let engine = build_engine(cli);
    let result = engine.search(query).await?;

    output::render_results(&result, cli.format, cli.pretty)?;

    // Partial failure is tolerated; only a fully empty result with failed
    // domains is reported as a distinct exit code.
    if result.items.is_empty() && !result.diagnostics.is_empty() {
        return Ok(ExitCode::from(3));
    }
    Ok(ExitCode::SUCCESS)
}

fn plan(cli: &Cli, query: &str) -> Result<ExitCode, CliError> {
    let engine = build_engine(cli);
    let parsed = parse(query).map_err(bioquery_core::EngineError::from)?;
    let plan = engine
        .route(&parsed)
        .map_err(bioquery_core::EngineError::from)?;

    output::render_plan(&plan, cli.format, cli.pretty)?;
    Ok(ExitCode::SUCCESS)
}

fn build_engine(cli: &Cli) -> SearchEngine {
    if cli.fixtures {
        return SearchEngine::new(vec![
            Arc::new(PubmedBackend::default()) as Arc<dyn SearchBackend>,
            Arc::new(ClinicalTrialsBackend::default()),
            Arc::new(MyVariantBackend::default()),
        ]);
    }

    let mut config = PipelineConfig::from_env();
    if cli.offline {
        config.offline = true;
    }

    // NCBI allows 3 req/s without an API key; ClinicalTrials.gov is stricter.
    let registry = Arc::new(
        ResilienceRegistry::default()
            .with_rate_override("www.ncbi.nlm.nih.gov", RateLimit::new(3.0, 3))
            .with_rate_override("clinicaltrials.gov", RateLimit::new(2.0, 2)),
    );
    let pipeline = Arc::new(RequestPipeline::with_config(
        Arc::new(ReqwestHttpClient::new()),
        registry,
        config,
    ));

    SearchEngine::new(vec![
        Arc::new(PubmedBackend::with_pipeline(pipeline.clone())) as Arc<dyn SearchBackend>,
        Arc::new(ClinicalTrialsBackend::with_pipeline(pipeline.clone())),
        Arc::new(MyVariantBackend::with_pipeline(pipeline)),
    ])
}
