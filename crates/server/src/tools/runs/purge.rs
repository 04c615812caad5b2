//! run_purge tool implementation.
//!
//! Purges stored runs by age or count.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use discwatch_core::{CacheDb, Error};

use crate::tools::json_result;

/// Parameters for the run_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RunPurgeParams {
    /// Purge runs created more than this many days ago.
    pub older_than_days: Option<u32>,

    /// Keep only the N most recently accessed runs (LRU purge).
    pub max_entries: Option<usize>,
}

/// Output from the run_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RunPurgeOutput {
    /// Number of runs deleted.
    pub deleted: u64,
}

/// Implementation of the run_purge tool.
pub async fn purge_impl(db: &CacheDb, params: RunPurgeParams) -> Result<CallToolResult, McpError> {
    if params.older_than_days.is_none() && params.max_entries.is_none() {
        return Err(Error::InvalidInput("At least one of older_than_days or max_entries must be specified".into()).into());
    }

    let mut deleted_total = 0u64;

    if let Some(days) = params.older_than_days {
        deleted_total += db.purge_runs_older_than(days).await?;
    }

    if let Some(max_entries) = params.max_entries {
        deleted_total += db.purge_lru_runs(max_entries).await?;
    }

    json_result(&RunPurgeOutput { deleted: deleted_total })
}
