//! Optional generative summary of each product's page text.
//!
//! Text is split into fixed-size chunks, each chunk is summarized with a bounded retry loop,
//! and chunk summaries are joined. Short texts are skipped. Each product gets two summaries:
//! one of the page blocks that matched a pattern and one of the whole page. A failure after the
//! last retry is recorded as the summary text; it never aborts the run.

pub mod error;
pub mod gemini;

pub use error::SummarizeError;
pub use gemini::{GeminiClient, GeminiConfig};

use std::time::Duration;

use discwatch_core::{AppConfig, ProductAggregate, ProgressSink};

/// Texts with this many characters or fewer are not worth summarizing.
pub const MIN_SUMMARY_CHARS: usize = 90;

/// Maximum characters sent per generation request.
pub const CHUNK_CHARS: usize = 8000;

/// Summary text for products without enough text.
pub const NO_TEXT_MESSAGE: &str = "No text found.";

/// Relevant-text summary for products whose matching blocks are too short.
pub const NO_RELEVANT_TEXT_MESSAGE: &str = "No relevant text found.";

/// A text generation backend.
#[async_trait::async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, SummarizeError>;
}

/// Bounded exponential backoff for generation requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, base_delay: Duration::from_secs(1), max_delay: Duration::from_secs(10) }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &AppConfig) -> Self {
        Self { max_attempts: config.summarize_max_attempts.max(1), ..Default::default() }
    }

    /// Delay before retry number `retry` (1-based): `base * 2^(retry-1)`, capped at `max_delay`.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Generation gave up.
#[derive(Debug, Clone, thiserror::Error)]
#[error("gave up after {attempts} attempt(s): {last_error}")]
pub struct RetryFailure {
    pub attempts: u32,
    pub last_error: SummarizeError,
}

/// Generate with retries. Non-retryable errors stop immediately.
pub async fn generate_with_retry(
    generator: &dyn TextGenerator, prompt: &str, policy: &RetryPolicy,
) -> Result<String, RetryFailure> {
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match generator.generate(prompt).await {
            Ok(text) => return Ok(text),
            Err(e) if attempt < max_attempts && e.is_retryable() => {
                let delay = policy.delay_for(attempt);
                tracing::warn!(
                    attempt,
                    max_attempts,
                    error = %e,
                    delay_ms = delay.as_millis() as u64,
                    "generation failed; retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(RetryFailure { attempts: attempt, last_error: e }),
        }
    }
}

/// Split `text` into pieces of at most `chunk_chars` characters, never inside a character.
pub fn chunk_text(text: &str, chunk_chars: usize) -> Vec<&str> {
    if text.is_empty() {
        return Vec::new();
    }
    if chunk_chars == 0 {
        return vec![text];
    }

    let mut chunks = Vec::new();
    let mut start = 0;
    let mut count = 0;

    for (idx, _) in text.char_indices() {
        if count == chunk_chars {
            chunks.push(&text[start..idx]);
            start = idx;
            count = 0;
        }
        count += 1;
    }
    chunks.push(&text[start..]);

    chunks
}

/// Prompt for one chunk of product text.
pub fn build_prompt(chunk: &str, pdf: &str) -> String {
    format!(
        "Summarize the following financial product information with a focus on the interest rate. Include:\n\
         - The name of the product.\n\
         - Interest rate details, stating whether the rate is per month or per year. If only a monthly rate is \
         given, say so explicitly.\n\
         - The installment period, if any.\n\
         - Warnings or important conditions customers should be aware of.\n\
         - If no interest rate information is present, state that the page does not disclose one.\n\
         Also report whether a PDF fact sheet or sales sheet was found among these links: {pdf}. If none was \
         found, note that the sheet must be checked on the website manually.\n\n\
         Product information:\n{chunk}"
    )
}

/// Result of summarizing one product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryOutcome {
    Summarized(String),
    /// Not enough text to summarize.
    Skipped(String),
    /// Generation gave up; the text describes the failure.
    Failed(String),
}

impl SummaryOutcome {
    pub fn text(&self) -> &str {
        match self {
            SummaryOutcome::Summarized(t) | SummaryOutcome::Skipped(t) | SummaryOutcome::Failed(t) => t,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            SummaryOutcome::Summarized(t) | SummaryOutcome::Skipped(t) | SummaryOutcome::Failed(t) => t,
        }
    }
}

/// Summarize one product's text, chunk by chunk.
pub async fn summarize_text(
    generator: &dyn TextGenerator, text: &str, pdf: &str, policy: &RetryPolicy,
) -> SummaryOutcome {
    summarize_or(generator, text, pdf, policy, NO_TEXT_MESSAGE).await
}

/// Summarize the pattern-matching blocks of one product's page.
pub async fn summarize_relevant(
    generator: &dyn TextGenerator, relevant_text: &str, pdf: &str, policy: &RetryPolicy,
) -> SummaryOutcome {
    summarize_or(generator, relevant_text, pdf, policy, NO_RELEVANT_TEXT_MESSAGE).await
}

async fn summarize_or(
    generator: &dyn TextGenerator, text: &str, pdf: &str, policy: &RetryPolicy, short_message: &str,
) -> SummaryOutcome {
    if text.chars().count() <= MIN_SUMMARY_CHARS {
        return SummaryOutcome::Skipped(short_message.to_string());
    }

    let mut parts = Vec::new();
    for chunk in chunk_text(text, CHUNK_CHARS) {
        match generate_with_retry(generator, &build_prompt(chunk, pdf), policy).await {
            Ok(summary) => parts.push(summary.trim().to_string()),
            Err(failure) => return SummaryOutcome::Failed(format!("summary unavailable: {failure}")),
        }
    }

    SummaryOutcome::Summarized(parts.join(" "))
}

/// Counts from a summarization pass, one per generated summary cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SummaryStats {
    pub summarized: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl SummaryStats {
    fn record(&mut self, outcome: &SummaryOutcome, product: &str) {
        match outcome {
            SummaryOutcome::Summarized(_) => self.summarized += 1,
            SummaryOutcome::Skipped(_) => self.skipped += 1,
            SummaryOutcome::Failed(reason) => {
                tracing::warn!(product, %reason, "summary failed; continuing");
                self.failed += 1;
            }
        }
    }
}

/// Fill in `summary_relevant` and `summary` on every aggregate. Products whose fetch failed are
/// skipped.
pub async fn summarize_aggregates(
    generator: &dyn TextGenerator, aggregates: &mut [ProductAggregate], policy: &RetryPolicy,
    progress: &dyn ProgressSink,
) -> SummaryStats {
    let mut stats = SummaryStats::default();
    let total = aggregates.len();

    for (idx, agg) in aggregates.iter_mut().enumerate() {
        let (relevant, full) = if agg.fetch_error.is_some() {
            (
                SummaryOutcome::Skipped(NO_RELEVANT_TEXT_MESSAGE.to_string()),
                SummaryOutcome::Skipped(NO_TEXT_MESSAGE.to_string()),
            )
        } else {
            (
                summarize_relevant(generator, &agg.relevant_text, &agg.pdf, policy).await,
                summarize_text(generator, &agg.text, &agg.pdf, policy).await,
            )
        };

        stats.record(&relevant, &agg.product);
        stats.record(&full, &agg.product);
        agg.summary_relevant = Some(relevant.into_text());
        agg.summary = Some(full.into_text());

        progress.update(((idx + 1) * 100 / total).min(100) as u8, &agg.product);
    }

    progress.finish();

    tracing::info!(summarized = stats.summarized, skipped = stats.skipped, failed = stats.failed, "summaries done");

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use discwatch_core::NullProgress;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails `failures` times with `error`, then echoes the prompt length.
    struct FlakyGenerator {
        failures: u32,
        error: SummarizeError,
        calls: AtomicU32,
        prompts: Mutex<Vec<String>>,
    }

    impl FlakyGenerator {
        fn new(failures: u32, error: SummarizeError) -> Self {
            Self { failures, error, calls: AtomicU32::new(0), prompts: Mutex::new(Vec::new()) }
        }

        fn reliable() -> Self {
            Self::new(0, SummarizeError::Timeout)
        }
    }

    #[async_trait::async_trait]
    impl TextGenerator for FlakyGenerator {
        async fn generate(&self, prompt: &str) -> Result<String, SummarizeError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            self.prompts.lock().unwrap().push(prompt.to_string());
            if call <= self.failures { Err(self.error.clone()) } else { Ok(format!("summary {call}")) }
        }
    }

    fn fast() -> RetryPolicy {
        RetryPolicy { max_attempts: 3, base_delay: Duration::from_millis(1), max_delay: Duration::from_millis(5) }
    }

    fn long_text(chars: usize) -> String {
        "a".repeat(chars)
    }

    fn aggregate(text: &str, relevant: &str, fetch_error: Option<&str>) -> ProductAggregate {
        ProductAggregate {
            product: "Card".into(),
            group: "Bank".into(),
            abbreviation: "AB".into(),
            fi: "Alpha".into(),
            fi_type: "commercial".into(),
            product_type: "card".into(),
            url: "https://a.test".into(),
            pdf: "none found".into(),
            timestamp: "2024-01-01 07:00:00".into(),
            text: text.into(),
            relevant_text: relevant.into(),
            fetch_error: fetch_error.map(str::to_string),
            summary_relevant: None,
            summary: None,
            findings: vec![],
        }
    }

    #[test]
    fn test_retry_delays_double_and_cap() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for(2), Duration::from_secs(2));
        assert_eq!(policy.delay_for(3), Duration::from_secs(4));
        assert_eq!(policy.delay_for(10), Duration::from_secs(10));
    }

    #[test]
    fn test_chunk_text() {
        assert!(chunk_text("", 3).is_empty());
        assert_eq!(chunk_text("abcdefg", 3), vec!["abc", "def", "g"]);
        assert_eq!(chunk_text("abc", 3), vec!["abc"]);
        assert_eq!(chunk_text("กขคง", 2), vec!["กข", "คง"]);
    }

    #[tokio::test]
    async fn test_retry_recovers_from_transient_errors() {
        let generator = FlakyGenerator::new(2, SummarizeError::RateLimited);
        let text = generate_with_retry(&generator, "p", &fast()).await.unwrap();
        assert_eq!(text, "summary 3");
        assert_eq!(generator.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_is_bounded() {
        let generator = FlakyGenerator::new(10, SummarizeError::HttpError { status: 503 });
        let failure = generate_with_retry(&generator, "p", &fast()).await.unwrap_err();
        assert_eq!(failure.attempts, 3);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_error_stops_immediately() {
        let generator = FlakyGenerator::new(10, SummarizeError::AuthError);
        let failure = generate_with_retry(&generator, "p", &fast()).await.unwrap_err();
        assert_eq!(failure.attempts, 1);
        assert!(matches!(failure.last_error, SummarizeError::AuthError));
    }

    #[tokio::test]
    async fn test_short_text_is_skipped() {
        let generator = FlakyGenerator::reliable();
        let outcome = summarize_text(&generator, &long_text(MIN_SUMMARY_CHARS), "none found", &fast()).await;
        assert_eq!(outcome, SummaryOutcome::Skipped(NO_TEXT_MESSAGE.to_string()));
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_long_text_is_chunked_and_joined() {
        let generator = FlakyGenerator::reliable();
        let outcome =
            summarize_text(&generator, &long_text(CHUNK_CHARS * 2 + 10), "https://a.test/x.pdf", &fast()).await;

        assert_eq!(outcome, SummaryOutcome::Summarized("summary 1 summary 2 summary 3".to_string()));
        let prompts = generator.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 3);
        assert!(prompts.iter().all(|p| p.contains("https://a.test/x.pdf")));
    }

    #[tokio::test]
    async fn test_failure_becomes_row_text() {
        let generator = FlakyGenerator::new(10, SummarizeError::Timeout);
        let outcome = summarize_text(&generator, &long_text(200), "none found", &fast()).await;
        match outcome {
            SummaryOutcome::Failed(text) => {
                assert!(text.contains("3 attempt"));
                assert!(text.contains("timeout"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_summarize_aggregates() {
        let generator = FlakyGenerator::reliable();
        let mut aggregates = vec![
            aggregate(&long_text(200), "", None),
            aggregate("short", "short", None),
            aggregate(&long_text(200), &long_text(200), Some("HTTP_ERROR: status 500")),
        ];

        let stats = summarize_aggregates(&generator, &mut aggregates, &fast(), &NullProgress).await;

        assert_eq!(stats, SummaryStats { summarized: 1, skipped: 5, failed: 0 });
        assert_eq!(aggregates[0].summary.as_deref(), Some("summary 1"));
        assert_eq!(aggregates[0].summary_relevant.as_deref(), Some(NO_RELEVANT_TEXT_MESSAGE));
        assert_eq!(aggregates[1].summary.as_deref(), Some(NO_TEXT_MESSAGE));
        assert_eq!(aggregates[1].summary_relevant.as_deref(), Some(NO_RELEVANT_TEXT_MESSAGE));
        assert_eq!(aggregates[2].summary.as_deref(), Some(NO_TEXT_MESSAGE));
        assert_eq!(aggregates[2].summary_relevant.as_deref(), Some(NO_RELEVANT_TEXT_MESSAGE));
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_relevant_text_is_summarized_before_full_text() {
        let generator = FlakyGenerator::reliable();
        let mut aggregates = vec![aggregate(&long_text(300), &"rate 16% per year ".repeat(10), None)];

        let stats = summarize_aggregates(&generator, &mut aggregates, &fast(), &NullProgress).await;

        assert_eq!(stats, SummaryStats { summarized: 2, skipped: 0, failed: 0 });
        assert_eq!(aggregates[0].summary_relevant.as_deref(), Some("summary 1"));
        assert_eq!(aggregates[0].summary.as_deref(), Some("summary 2"));
        let prompts = generator.prompts.lock().unwrap();
        assert!(prompts[0].contains("rate 16% per year"));
    }

    #[tokio::test]
    async fn test_short_relevant_text_uses_its_own_message() {
        let generator = FlakyGenerator::reliable();
        let outcome = summarize_relevant(&generator, "rate 16%", "none found", &fast()).await;
        assert_eq!(outcome, SummaryOutcome::Skipped(NO_RELEVANT_TEXT_MESSAGE.to_string()));
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }
}
