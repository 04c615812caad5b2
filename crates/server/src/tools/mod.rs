//! MCP tool implementations.
//!
//! This module contains all tools exposed by the discwatch server.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

pub mod monitor_run;
pub mod report_export;
pub mod report_filter;
pub mod runs;

pub use monitor_run::{MonitorRunParams, monitor_impl};
pub use report_export::{ReportExportParams, export_impl};
pub use report_filter::{ReportFilterParams, filter_impl};

/// Wrap a tool output as pretty-printed JSON text content.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output).map_err(discwatch_core::Error::from)?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
pub(crate) fn output_json<T: serde::de::DeserializeOwned>(result: &CallToolResult) -> T {
    let content_val = serde_json::to_value(&result.content[0]).unwrap();
    let text = content_val
        .get("text")
        .and_then(|v| v.as_str())
        .expect("Expected text field in content");
    serde_json::from_str(text).unwrap()
}

#[cfg(test)]
pub(crate) fn sample_run() -> discwatch_core::RunRecord {
    use discwatch_core::OutputRow;

    let row = |group: &str, fi: &str, product: &str, set: &str, keyword: &str, found: bool| OutputRow {
        group: group.into(),
        abbreviation: fi.to_uppercase(),
        fi: fi.into(),
        fi_type: "commercial".into(),
        product: product.into(),
        product_type: "card".into(),
        url: format!("https://{fi}.test/{product}"),
        pdf: "none found".into(),
        timestamp: "2026-10-16 09:30:00".into(),
        keyword_set: set.into(),
        keyword: keyword.into(),
        sentences_found: if found { "found" } else { "not found" }.into(),
        sentences: if found { "16% per year".into() } else { format!("not found for topic '{keyword}'") },
        fetch_error: None,
        summary_relevant: None,
        summary: None,
    };

    discwatch_core::RunRecord::new(
        &[],
        &[],
        3,
        vec![
            row("Bank", "alpha", "Gold", "rates", "apr", true),
            row("Bank", "alpha", "Gold", "fees", "annual", false),
            row("Bank", "beta", "Classic", "rates", "apr", true),
            row("Non-bank", "gamma", "Flex", "rates", "apr", false),
        ],
    )
}
