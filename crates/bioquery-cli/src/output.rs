//! Output rendering for search results, routing plans, and the field
//! schema.

use bioquery_core::{AggregatedResult, QuerySchema, RoutingPlan};
use serde::Serialize;
use serde_json::json;

use crate::cli::OutputFormat;
use crate::error::CliError;

pub fn render_results(
    result: &AggregatedResult,
    format: OutputFormat,
    pretty: bool,
) -> Result<(), CliError> {
    match format {
        OutputFormat::Json => print_json(result, pretty)?,
        OutputFormat::Table => {
            if result.items.is_empty() {
                println!("no results");
            }
            for item in &result.items {
                let date = item
                    .date
                    .map(|date| date.to_string())
                    .unwrap_or_else(|| String::from("----------"));
                println!("[{:>8}] {date}  {}", item.source.to_string(), item.title);
                println!("            {}", item.url);
            }
            // Failed domains go to stderr so piped output stays clean.
            for diagnostic in &result.diagnostics {
                eprintln!("warning: {}: {}", diagnostic.domain, diagnostic.error);
            }
        }
    }
    Ok(())
}

pub fn render_plan(plan: &RoutingPlan, format: OutputFormat, pretty: bool) -> Result<(), CliError> {
    match format {
        OutputFormat::Json => {
            let entries: Vec<_> = plan
                .entries
                .iter()
                .map(|entry| {
                    json!({
                        "domain": entry.domain.as_str(),
                        "params": entry.params,
                    })
                })
                .collect();
            print_json(&json!({ "strategy": "parallel", "entries": entries }), pretty)?;
        }
        OutputFormat::Table => {
            if plan.is_empty() {
                println!("plan is empty: no domain referenced by the query");
            }
            for entry in &plan.entries {
                println!("{}:", entry.domain);
                for (key, value) in &entry.params {
                    println!("  {key} = {value}");
                }
            }
        }
    }
    Ok(())
}

pub fn render_schema(
    schema: &QuerySchema,
    format: OutputFormat,
    pretty: bool,
) -> Result<(), CliError> {
    match format {
        OutputFormat::Json => print_json(schema, pretty)?,
        OutputFormat::Table => {
            println!("{:<24} {:<10} {:<8}", "FIELD", "TYPE", "DOMAIN");
            for field in &schema.fields {
                println!(
                    "{:<24} {:<10} {:<8}",
                    field.name,
                    format!("{:?}", field.field_type).to_lowercase(),
                    format!("{:?}", field.domain).to_lowercase()
                );
            }
        }
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<(), CliError> {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{rendered}");
    Ok(())
}
