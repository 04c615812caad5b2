//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use crate::tools::{
    MonitorRunParams, ReportExportParams, ReportFilterParams, export_impl, filter_impl, monitor_impl,
    runs::{RunGetParams, RunListParams, RunPurgeParams, get_impl, list_impl, purge_impl},
};

use discwatch_client::{GeminiClient, TextGenerator, WebPageFetcher};
use discwatch_core::{AppConfig, CacheDb, Error};
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};
use tokio::sync::{Mutex, OnceCell};

/// The main MCP server handler for discwatch.
#[derive(Clone)]
pub struct DiscwatchServer {
    tool_router: ToolRouter<Self>,
    db: CacheDb,
    config: Arc<AppConfig>,
    /// Built on first use so the browser only launches when a run is requested.
    fetcher: Arc<OnceCell<WebPageFetcher>>,
    /// Runs are processed one at a time.
    run_lock: Arc<Mutex<()>>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl DiscwatchServer {
    /// Create a new server handler over an opened run store.
    pub fn new(db: CacheDb, config: AppConfig) -> Self {
        Self {
            tool_router: Self::tool_router(),
            db,
            config: Arc::new(config),
            fetcher: Arc::new(OnceCell::new()),
            run_lock: Arc::new(Mutex::new(())),
        }
    }

    async fn fetcher(&self) -> Result<&WebPageFetcher, Error> {
        self.fetcher.get_or_try_init(|| WebPageFetcher::from_config(&self.config)).await
    }

    /// Scrape every kept product and store the report as a new run.
    #[tool(
        description = "Scrape every product flagged 'keep' in a product table (CSV), match the pattern table's regular expressions against each page, and store the flattened report as a run. Returns the run id, row counts and facet values. If the run store rejects the run, the rows are returned inline with the store error."
    )]
    async fn monitor_run(&self, params: Parameters<MonitorRunParams>) -> Result<CallToolResult, McpError> {
        let _guard = self.run_lock.lock().await;
        let fetcher = self.fetcher().await?;

        let generator = if params.0.summarize {
            Some(GeminiClient::from_app(&self.config).map_err(Error::from)?)
        } else {
            None
        };

        monitor_impl(
            &self.db,
            &self.config,
            fetcher,
            generator.as_ref().map(|g| g as &dyn TextGenerator),
            params.0,
        )
        .await
    }

    /// Filter a stored run's rows by facet.
    #[tool(
        description = "Filter a stored run's report rows by group, financial institution, product type, product and keyword set. Returns matching rows and the facet values still selectable."
    )]
    async fn report_filter(&self, params: Parameters<ReportFilterParams>) -> Result<CallToolResult, McpError> {
        filter_impl(&self.db, params.0).await
    }

    /// Export a stored run's rows to CSV or JSON.
    #[tool(description = "Export a stored run's (optionally filtered) report rows to output_<date>.csv or .json.")]
    async fn report_export(&self, params: Parameters<ReportExportParams>) -> Result<CallToolResult, McpError> {
        export_impl(&self.db, &self.config, params.0).await
    }

    /// Retrieve a stored run.
    #[tool(description = "Retrieve a stored run with all of its report rows.")]
    async fn run_get(&self, params: Parameters<RunGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(&self.db, params.0).await
    }

    /// List stored runs.
    #[tool(description = "List stored runs, newest first, without their rows.")]
    async fn run_list(&self, params: Parameters<RunListParams>) -> Result<CallToolResult, McpError> {
        list_impl(&self.db, params.0).await
    }

    /// Purge stored runs.
    #[tool(description = "Purge stored runs older than a number of days, or keep only the N most recently used.")]
    async fn run_purge(&self, params: Parameters<RunPurgeParams>) -> Result<CallToolResult, McpError> {
        purge_impl(&self.db, params.0).await
    }
}

impl ServerHandler for DiscwatchServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "discwatch".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(
                "Run monitor_run with a product table and a pattern table, then narrow the stored run with \
                 report_filter and write it out with report_export."
                    .into(),
            ),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
