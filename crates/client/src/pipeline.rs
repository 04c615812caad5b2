//! End-to-end monitoring run shared by the MCP server and the CLI.

use discwatch_core::{
    AggregateOptions, Error, NullProgress, PageFetcher, PatternDefinition, ProductRecord, ProgressSink, RunRecord, aggregate,
    build_registry, flatten,
};

use crate::summarize::{RetryPolicy, TextGenerator, summarize_aggregates};

/// Validated input tables for one run.
#[derive(Debug, Clone)]
pub struct MonitorInputs {
    pub products: Vec<ProductRecord>,
    pub patterns: Vec<PatternDefinition>,
}

impl MonitorInputs {
    /// Load both tables from CSV files.
    pub fn load(products_path: &std::path::Path, patterns_path: &std::path::Path) -> Result<Self, Error> {
        Ok(Self {
            products: discwatch_core::workbook::load_products_path(products_path)?,
            patterns: discwatch_core::workbook::load_patterns_path(patterns_path)?,
        })
    }
}

/// Run-level options.
#[derive(Debug, Clone, Default)]
pub struct MonitorOptions {
    pub aggregate: AggregateOptions,
    pub retry: RetryPolicy,
}

/// Compile patterns, scrape and match every kept product, optionally summarize, and flatten.
///
/// Pattern errors abort before any page is fetched. The returned run is not yet stored.
pub async fn run_monitor(
    inputs: &MonitorInputs, fetcher: &dyn PageFetcher, generator: Option<&dyn TextGenerator>,
    options: &MonitorOptions, progress: &dyn ProgressSink,
) -> Result<RunRecord, Error> {
    let registry = build_registry(&inputs.patterns)?;
    if registry.is_empty() {
        tracing::warn!("pattern table is empty; every product will produce zero rows");
    }

    let mut aggregates = aggregate(&inputs.products, &registry, fetcher, &options.aggregate, progress).await;

    if let Some(generator) = generator {
        summarize_aggregates(generator, &mut aggregates, &options.retry, &NullProgress).await;
    }

    let rows = flatten(&aggregates);
    let run = RunRecord::new(&inputs.products, &inputs.patterns, aggregates.len(), rows);

    tracing::info!(run_id = %run.id, products = run.product_count, rows = run.rows.len(), "monitoring run complete");

    Ok(run)
}
