//! monitor_run tool implementation.
//!
//! Loads the product and pattern tables, scrapes every kept product, stores the flattened
//! report as a run and returns its summary with the facet values available for filtering.
//! When the store rejects the run, the rows are returned inline with the store error.

use std::path::PathBuf;

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use discwatch_client::{MonitorInputs, MonitorOptions, RetryPolicy, TextGenerator, run_monitor};
use discwatch_core::{
    AggregateOptions, AppConfig, CacheDb, Error, Facets, LogProgress, OutputRow, Pacing, PageFetcher, RunSummary,
};

use super::json_result;

/// Input parameters for the monitor_run tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MonitorRunParams {
    /// Path to the product table (CSV).
    pub products_path: String,

    /// Path to the pattern table (CSV).
    pub patterns_path: String,

    /// Summarize each product's page text with Gemini (requires DISCWATCH_GEMINI_API_KEY).
    #[serde(default)]
    pub summarize: bool,

    /// Drop products whose page links no PDF document. Defaults to the configured value.
    #[serde(default)]
    pub require_pdf: Option<bool>,

    /// Skip the randomized delay between product fetches.
    #[serde(default)]
    pub no_delay: bool,
}

/// Output structure for the monitor_run tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MonitorRunOutput {
    pub run: RunSummary,
    /// Rows whose page could not be fetched.
    pub fetch_errors: usize,
    pub facets: Facets,
    /// Whether the run can be read back by id.
    pub stored: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_error: Option<String>,
    /// The report rows, present only when the run was not stored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<Vec<OutputRow>>,
}

impl MonitorRunParams {
    fn paths(&self) -> Result<(PathBuf, PathBuf), Error> {
        if self.products_path.trim().is_empty() {
            return Err(Error::InvalidInput("products_path must not be empty".into()));
        }
        if self.patterns_path.trim().is_empty() {
            return Err(Error::InvalidInput("patterns_path must not be empty".into()));
        }
        Ok((PathBuf::from(self.products_path.trim()), PathBuf::from(self.patterns_path.trim())))
    }

    fn options(&self, config: &AppConfig) -> MonitorOptions {
        let mut aggregate = AggregateOptions::from_config(config);
        if self.no_delay {
            aggregate.pacing = Pacing::none();
        }
        if let Some(require_pdf) = self.require_pdf {
            aggregate.require_pdf = require_pdf;
        }
        MonitorOptions { aggregate, retry: RetryPolicy::from_config(config) }
    }
}

/// Implementation of the monitor_run tool.
///
/// The generator is only consulted when `summarize` is set; passing `None` in that case is
/// an input error.
pub async fn monitor_impl(
    db: &CacheDb, config: &AppConfig, fetcher: &dyn PageFetcher, generator: Option<&dyn TextGenerator>,
    params: MonitorRunParams,
) -> Result<CallToolResult, McpError> {
    let (products_path, patterns_path) = params.paths()?;

    let generator = match (params.summarize, generator) {
        (true, Some(generator)) => Some(generator),
        (true, None) => return Err(Error::InvalidInput("summarize requested but no Gemini API key is set".into()).into()),
        (false, _) => None,
    };

    let inputs = MonitorInputs::load(&products_path, &patterns_path)?;
    tracing::info!(
        products = inputs.products.len(),
        patterns = inputs.patterns.len(),
        summarize = params.summarize,
        "starting monitoring run"
    );

    let options = params.options(config);
    let run = run_monitor(&inputs, fetcher, generator, &options, &LogProgress).await?;
    let store_error = match db.insert_run(&run).await {
        Ok(()) => None,
        Err(e) => {
            tracing::warn!(run_id = %run.id, error = %e, "storing run failed; returning rows inline");
            Some(e.to_string())
        }
    };

    let output = MonitorRunOutput {
        run: run.summary(),
        fetch_errors: run.rows.iter().filter(|r| r.fetch_error.is_some()).count(),
        facets: Facets::collect(&run.rows),
        stored: store_error.is_none(),
        rows: store_error.is_some().then(|| run.rows.clone()),
        store_error,
    };

    json_result(&output)
}
