//! report_export tool implementation.
//!
//! Writes a stored run's (optionally filtered) rows to `output_<date>.csv`, `.json` or `.xlsx`.

use std::path::PathBuf;

use chrono::Utc;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use discwatch_core::{AppConfig, CacheDb, Error, ExportFormat, ReportFilter, report};

use super::json_result;

/// Input parameters for the report_export tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ReportExportParams {
    /// Id of a stored run.
    pub run_id: String,

    /// Allowed values per facet; omitted facets admit everything.
    #[serde(default)]
    pub filter: ReportFilter,

    /// "csv" (default), "json" or "xlsx".
    #[serde(default)]
    pub format: ExportFormat,

    /// Output directory. Defaults to the configured export directory.
    #[serde(default)]
    pub dir: Option<String>,
}

/// Output structure for the report_export tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ReportExportOutput {
    pub path: String,
    pub rows: usize,
    pub format: ExportFormat,
}

/// Implementation of the report_export tool.
///
/// The file date is today's date in the configured UTC offset; a second export on the same
/// day overwrites the first.
pub async fn export_impl(
    db: &CacheDb, config: &AppConfig, params: ReportExportParams,
) -> Result<CallToolResult, McpError> {
    if params.run_id.trim().is_empty() {
        return Err(Error::InvalidInput("run_id must not be empty".into()).into());
    }

    let run = db.require_run(params.run_id.trim()).await?;
    let rows = params.filter.apply(&run.rows);

    let dir = params
        .dir
        .filter(|d| !d.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| config.export_dir.clone());
    let date = Utc::now().with_timezone(&config.utc_offset()).date_naive();

    let path = report::export(&rows, &dir, date, params.format)?;

    let output = ReportExportOutput { path: path.display().to_string(), rows: rows.len(), format: params.format };
    json_result(&output)
}
