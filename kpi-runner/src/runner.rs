use std::fmt::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use kpi_common::{compare_reports, Orchestrator, Snapshot};
use serde_json::json;
use tracing::{info, warn};

use crate::config::{Config, OutputFormat};
use crate::ingest::{load_customers, load_orders};
use crate::report::{render_comparison, render_report};

/// Load both inputs, run both strategies and render the result in the configured format.
pub async fn run(config: &Config) -> anyhow::Result<String> {
    let customers = load_customers(Path::new(&config.customers_path))
        .with_context(|| format!("failed to load customers from {}", config.customers_path))?;
    let orders = load_orders(Path::new(&config.orders_path))
        .with_context(|| format!("failed to load orders from {}", config.orders_path))?;

    let snapshot = Arc::new(Snapshot::new(customers, orders));
    if snapshot.is_empty() {
        warn!("customers or orders are empty, every KPI will be empty");
    }

    let orchestrator = Orchestrator::new(config.store_config(), config.kpi_params());
    let outcome = orchestrator.run(snapshot).await;

    // The orchestrator has already logged why the query report is missing.
    let query = outcome.query.as_ref().ok();

    let mismatches = query
        .map(|query| compare_reports(&outcome.memory, query, config.sum_tolerance))
        .unwrap_or_default();
    for mismatch in &mismatches {
        warn!("{}", mismatch);
    }
    info!("compared strategies, {} mismatches", mismatches.len());

    let rendered = match config.output_format {
        OutputFormat::Text => {
            let mut out = render_report(&outcome.memory);
            if let Some(query) = query {
                let _ = writeln!(out, "\n{}", render_report(query));
                out.push_str(&render_comparison(
                    &outcome.memory.strategy,
                    &query.strategy,
                    &mismatches,
                ));
            }
            out
        }
        OutputFormat::Json => {
            let output = json!({
                "memory": &outcome.memory,
                "query": query,
                "query_error": outcome.query.as_ref().err().map(ToString::to_string),
                "mismatches": &mismatches,
            });
            serde_json::to_string_pretty(&output)?
        }
    };

    Ok(rendered)
}
