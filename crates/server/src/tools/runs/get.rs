//! run_get tool implementation.
//!
//! Retrieves a stored run with all of its report rows.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use discwatch_core::{CacheDb, RunRecord};

use crate::tools::json_result;

/// Parameters for the run_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RunGetParams {
    /// Id of the stored run to retrieve.
    pub run_id: String,
}

/// Output from the run_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RunGetOutput {
    pub run: RunRecord,
}

/// Implementation of the run_get tool.
pub async fn get_impl(db: &CacheDb, params: RunGetParams) -> Result<CallToolResult, McpError> {
    let run = db.require_run(params.run_id.trim()).await?;
    json_result(&RunGetOutput { run })
}
