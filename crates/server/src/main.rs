//! discwatch MCP server entry point.
//!
//! This is the main binary that boots the MCP server on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use anyhow::{Context, Result};
use discwatch_core::{AppConfig, CacheDb};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("loading configuration")?;
    let db = CacheDb::open(&config.db_path)
        .await
        .with_context(|| format!("opening run store at {}", config.db_path.display()))?;

    tracing::info!(
        db_path = %config.db_path.display(),
        render = config.render_enabled,
        "Starting discwatch server on stdio transport"
    );

    let store = db.clone();
    let handler = handler::DiscwatchServer::new(db, config);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    if let Err(e) = store.close().await {
        tracing::warn!(error = %e, "closing run store failed");
    }

    Ok(())
}
