//! Unified error types for discwatch.
//!
//! Configuration errors (tables, patterns, config) are fatal to a run and surface before any
//! fetching. Fetch errors are recovered per product by the aggregator.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

/// Unified error types for the discwatch pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., empty product table path).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// A pattern definition failed to compile.
    #[error("PATTERN_COMPILATION: set '{set}', topic '{topic}': {reason}")]
    PatternCompilation { set: String, topic: String, reason: String },

    /// A required column is absent from an input table.
    #[error("MISSING_COLUMN: table '{table}' has no '{column}' column")]
    MissingColumn { table: String, column: String },

    /// A row of an input table failed validation.
    #[error("INVALID_RECORD: table '{table}', row {row}: {reason}")]
    InvalidRecord { table: String, row: usize, reason: String },

    /// An input table could not be read or parsed.
    #[error("TABLE_ERROR: {0}")]
    Table(String),

    /// No run stored under the given id.
    #[error("RUN_NOT_FOUND: {0}")]
    RunNotFound(String),

    /// Database operation failed.
    #[error("STORE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("STORE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// Stored run payload could not be encoded or decoded.
    #[error("SERIALIZATION_ERROR: {0}")]
    Serialization(String),

    /// Report export failed.
    #[error("EXPORT_FAILED: {0}")]
    ExportFailed(String),

    /// Invalid URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// Fetch timeout.
    #[error("FETCH_TIMEOUT: {0}")]
    FetchTimeout(String),

    /// Fetch response too large.
    #[error("FETCH_TOO_LARGE: {0}")]
    FetchTooLarge(String),

    /// HTTP error response.
    #[error("HTTP_ERROR: {0}")]
    HttpError(String),

    /// Render failed.
    #[error("RENDER_FAILED: {0}")]
    RenderFailed(String),

    /// Summarization failed.
    #[error("SUMMARIZE_FAILED: {0}")]
    SummarizeFailed(String),
}

impl Error {
    /// Whether this error is a configuration error that must abort a run before fetching.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::PatternCompilation { .. }
                | Error::MissingColumn { .. }
                | Error::InvalidRecord { .. }
                | Error::Table(_)
                | Error::InvalidInput(_)
        )
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        Error::Table(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let code = match &err {
            Error::InvalidInput(_) => -32602,
            Error::PatternCompilation { .. } => -32020,
            Error::MissingColumn { .. } | Error::InvalidRecord { .. } | Error::Table(_) => -32021,
            Error::RunNotFound(_) => -32001,
            Error::Database(_) | Error::MigrationFailed(_) => -32002,
            Error::ExportFailed(_) => -32022,
            Error::Serialization(_) => -32603,
            Error::InvalidUrl(_) => -32003,
            Error::FetchTimeout(_) => -32006,
            Error::FetchTooLarge(_) => -32007,
            Error::HttpError(_) => -32008,
            Error::RenderFailed(_) => -32012,
            Error::SummarizeFailed(_) => -32023,
        };

        McpError { code: ErrorCode(code), message: err.to_string().into(), data: None }
    }
}
