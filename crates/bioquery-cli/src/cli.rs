//! CLI argument definitions for bioquery.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `search` | Run a unified field query across all registered domains |
//! | `plan` | Show the routing plan for a query without executing it |
//! | `fields` | List the queryable fields and their domains |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--format` | `table` | Output format (table, json) |
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--offline` | `false` | Serve only cached responses, never hit the network |
//! | `--fixtures` | `false` | Use deterministic fixture back-ends (no I/O at all) |
//!
//! # Examples
//!
//! ```bash
//! # Cross-domain gene search
//! bioquery search "gene:BRAF disease:melanoma"
//!
//! # Domain-scoped fields narrow a single back-end
//! bioquery search "gene:TP53 AND trials.phase:3" --format json --pretty
//!
//! # Inspect routing without touching the network
//! bioquery plan "variant:V600E"
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Unified biomedical search across literature, trials, and variants.
///
/// One field-based query language fans out to PubMed, ClinicalTrials.gov,
/// and MyVariant.info, with per-destination rate limiting, retries,
/// circuit breaking, and response caching.
#[derive(Debug, Parser)]
#[command(
    name = "bioquery",
    author,
    version,
    about = "Unified biomedical search CLI"
)]
pub struct Cli {
    /// Output format for results.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Serve only cached responses; a cache miss is an error, the network
    /// is never touched.
    #[arg(long, global = true, default_value_t = false)]
    pub offline: bool,

    /// Use deterministic fixture back-ends instead of live APIs.
    #[arg(long, global = true, default_value_t = false)]
    pub fixtures: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// ASCII table format for terminal display.
    Table,
    /// Single JSON object output.
    Json,
}

/// Available CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a unified field query across all registered domains.
    ///
    /// # Examples
    ///
    ///   bioquery search "gene:BRAF"
    ///   bioquery search "disease:melanoma AND trials.status:recruiting"
    Search(SearchArgs),

    /// Show the routing plan for a query without executing it.
    Plan(PlanArgs),

    /// List the queryable fields, their domains, and supported operators.
    Fields,
}

/// Arguments for the `search` command.
#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Field-based query, e.g. `gene:BRAF disease:"lung cancer"`.
    pub query: String,
}

/// Arguments for the `plan` command.
#[derive(Debug, Args)]
pub struct PlanArgs {
    /// Field-based query to route.
    pub query: String,
}
