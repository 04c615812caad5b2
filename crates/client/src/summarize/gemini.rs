//! Gemini `generateContent` client.
//!
//! - **Endpoint**: `{base_url}/models/{model}:generateContent`
//! - **Authentication**: API key passed as the `key` query parameter.
//! - **Rate limiting**: at least 1s between requests from one client.

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::header;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use discwatch_core::AppConfig;

use super::TextGenerator;
use super::error::SummarizeError;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const DEFAULT_MODEL: &str = "gemini-1.5-flash";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Minimum interval between requests.
const MIN_REQUEST_INTERVAL: Duration = Duration::from_secs(1);

/// Gemini client configuration.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    /// Model name (default: gemini-1.5-flash).
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
    pub user_agent: String,
    pub min_interval: Duration,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: "discwatch/0.1".to_string(),
            min_interval: MIN_REQUEST_INTERVAL,
        }
    }
}

impl GeminiConfig {
    /// Build from application config; fails when no API key is configured.
    pub fn from_app(config: &AppConfig) -> Result<Self, SummarizeError> {
        let api_key = config.require_gemini_api_key().map_err(|_| SummarizeError::MissingApiKey)?.to_string();

        Ok(Self {
            api_key,
            model: config.gemini_model.clone(),
            user_agent: config.user_agent.clone(),
            ..Default::default()
        })
    }
}

/// Rate limiter to enforce request intervals.
#[derive(Debug)]
struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval: Duration) -> Self {
        Self { last_request: Mutex::new(None), min_interval }
    }

    /// Wait until `min_interval` has passed since the previous request.
    async fn acquire(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: [RequestContent<'a>; 1],
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: [RequestPart<'a>; 1],
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

impl GenerateResponse {
    fn into_text(self) -> Result<String, SummarizeError> {
        let block_reason = self.prompt_feedback.and_then(|f| f.block_reason);

        let Some(candidate) = self.candidates.into_iter().next() else {
            let reason = block_reason.unwrap_or_else(|| "no candidates".to_string());
            return Err(SummarizeError::EmptyResponse(reason));
        };

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect::<Vec<_>>().join(""))
            .unwrap_or_default();

        if text.trim().is_empty() {
            let reason = candidate.finish_reason.unwrap_or_else(|| "no text".to_string());
            return Err(SummarizeError::EmptyResponse(reason));
        }

        Ok(text)
    }
}

/// Gemini API client.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    config: GeminiConfig,
    rate_limiter: Arc<RateLimiter>,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self, SummarizeError> {
        if config.api_key.is_empty() {
            return Err(SummarizeError::MissingApiKey);
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .use_rustls_tls()
            .build()
            .map_err(|e| SummarizeError::Network(Arc::new(e)))?;

        let rate_limiter = Arc::new(RateLimiter::new(config.min_interval));
        Ok(Self { http, config, rate_limiter })
    }

    pub fn from_app(config: &AppConfig) -> Result<Self, SummarizeError> {
        Self::new(GeminiConfig::from_app(config)?)
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }
}

#[async_trait::async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, SummarizeError> {
        self.rate_limiter.acquire().await;

        let start = Instant::now();
        let url = format!("{}/models/{}:generateContent", self.config.base_url, self.config.model);
        let body = GenerateRequest { contents: [RequestContent { parts: [RequestPart { text: prompt }] }] };

        let response = self
            .http
            .post(&url)
            .query(&[("key", self.config.api_key.as_str())])
            .header(header::ACCEPT, "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        tracing::debug!(model = %self.config.model, %status, "generateContent response");

        if status == 401 || status == 403 {
            return Err(SummarizeError::AuthError);
        }

        if status == 429 {
            return Err(SummarizeError::RateLimited);
        }

        if status.is_client_error() || status.is_server_error() {
            return Err(SummarizeError::HttpError { status: status.as_u16() });
        }

        let bytes = response.bytes().await?;
        let parsed: GenerateResponse =
            serde_json::from_slice(&bytes).map_err(|e| SummarizeError::Parse(e.to_string()))?;
        let text = parsed.into_text()?;

        tracing::debug!(elapsed_ms = start.elapsed().as_millis() as u64, chars = text.len(), "generated summary chunk");

        Ok(text)
    }
}
