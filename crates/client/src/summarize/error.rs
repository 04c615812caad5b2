//! Text generation error types.

use std::sync::Arc;

/// Errors from a text generation backend.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SummarizeError {
    /// No API key configured.
    #[error("missing API key: DISCWATCH_GEMINI_API_KEY not set")]
    MissingApiKey,

    /// Authentication failed (invalid API key).
    #[error("authentication failed: invalid API key")]
    AuthError,

    /// Rate limited by the backend.
    #[error("rate limited: too many requests")]
    RateLimited,

    /// HTTP error response.
    #[error("HTTP error: {status}")]
    HttpError { status: u16 },

    /// Request timeout.
    #[error("request timeout")]
    Timeout,

    /// Network error.
    #[error("network error: {0}")]
    Network(Arc<reqwest::Error>),

    /// Response parse error.
    #[error("parse error: {0}")]
    Parse(String),

    /// Response carried no generated text (e.g. blocked by a safety filter).
    #[error("empty response: {0}")]
    EmptyResponse(String),
}

impl SummarizeError {
    /// Whether another attempt could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            SummarizeError::RateLimited | SummarizeError::Timeout | SummarizeError::Network(_) => true,
            SummarizeError::HttpError { status } => *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for SummarizeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() { SummarizeError::Timeout } else { SummarizeError::Network(Arc::new(err)) }
    }
}

impl From<SummarizeError> for discwatch_core::Error {
    fn from(err: SummarizeError) -> Self {
        discwatch_core::Error::SummarizeFailed(err.to_string())
    }
}
