//! run_list tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use discwatch_core::{CacheDb, RunSummary};

use crate::tools::json_result;

/// Parameters for the run_list tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RunListParams {
    /// Maximum runs to list, newest first (default: 20).
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    20
}

/// Output from the run_list tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RunListOutput {
    pub runs: Vec<RunSummary>,
}

/// Implementation of the run_list tool.
pub async fn list_impl(db: &CacheDb, params: RunListParams) -> Result<CallToolResult, McpError> {
    let runs = db.list_runs(params.limit).await?;
    json_result(&RunListOutput { runs })
}
