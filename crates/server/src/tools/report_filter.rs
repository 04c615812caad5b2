//! report_filter tool implementation.
//!
//! Narrows a stored run's rows by facet and reports which facet values remain selectable.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use discwatch_core::{CacheDb, Error, Facets, OutputRow, ReportFilter};

use super::json_result;

/// Input parameters for the report_filter tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ReportFilterParams {
    /// Id of a stored run (from monitor_run or run_list).
    pub run_id: String,

    /// Allowed values per facet; omitted facets admit everything.
    #[serde(default)]
    pub filter: ReportFilter,

    /// Maximum rows to return (default: all).
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Output structure for the report_filter tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ReportFilterOutput {
    pub run_id: String,
    /// Rows admitted by the filter before `limit` was applied.
    pub matched: usize,
    pub rows: Vec<OutputRow>,
    /// Facet values offered at each level under the current selections.
    pub facets: Facets,
}

/// Implementation of the report_filter tool.
pub async fn filter_impl(db: &CacheDb, params: ReportFilterParams) -> Result<CallToolResult, McpError> {
    if params.run_id.trim().is_empty() {
        return Err(Error::InvalidInput("run_id must not be empty".into()).into());
    }

    let run = db.require_run(params.run_id.trim()).await?;

    let mut rows = params.filter.apply(&run.rows);
    let matched = rows.len();
    if let Some(limit) = params.limit {
        rows.truncate(limit);
    }

    let facets = Facets::cascade(&run.rows, &params.filter);
    let output = ReportFilterOutput { run_id: run.id, matched, rows, facets };

    json_result(&output)
}
