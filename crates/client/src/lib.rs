//! Client code for discwatch.
//!
//! This crate provides the page fetcher (HTTP and headless browser), page text and PDF link
//! extraction, the optional summarizer, and the end-to-end run pipeline shared by the
//! server and CLI.

pub mod extract;
pub mod fetch;
pub mod page;
pub mod pipeline;
pub mod render;
pub mod summarize;

pub use extract::{extract_page, extract_pdf_links, page_text};
pub use fetch::{FetchClient, FetchConfig, FetchResponse};
pub use page::WebPageFetcher;
pub use pipeline::{MonitorInputs, MonitorOptions, run_monitor};
pub use summarize::{GeminiClient, RetryPolicy, SummaryOutcome, TextGenerator};
