//! Records flowing through the monitoring pipeline.
//!
//! `ProductRecord` rows come in from the product table, are aggregated by product name into
//! `ProductAggregate`s, and are flattened into `OutputRow`s for filtering and export.

use serde::{Deserialize, Serialize};

/// Separator placed between evidence spans and between PDF links in report cells.
pub const LIST_SEPARATOR: &str = "\n\n- ";

/// PDF cell value for a page that links no PDF documents.
pub const NO_PDF_SENTINEL: &str = "none found";

/// `Sentences_found` value for a topic with at least one match.
pub const FOUND_LABEL: &str = "found";

/// `Sentences_found` value for a topic without matches.
pub const NOT_FOUND_LABEL: &str = "not found";

/// Inclusion flag value that selects a product row for scraping.
pub const KEEP_FLAG: &str = "keep";

/// How a product page should be fetched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum FetchStrategy {
    /// Plain HTTP GET.
    #[default]
    Http,
    /// Full headless browser render.
    Browser,
}

impl FetchStrategy {
    /// Parse the optional `Fetch` column; blank means plain HTTP.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "http" | "requests" => Some(Self::Http),
            "browser" | "render" | "selenium" => Some(Self::Browser),
            _ => None,
        }
    }
}

/// One row of the product table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ProductRecord {
    pub group: String,
    pub bank_abb: String,
    pub bank_name: String,
    pub fi_type: String,
    pub product_type: String,
    pub product_name: String,
    pub url: String,
    pub status: String,
    pub fetch: FetchStrategy,
}

impl ProductRecord {
    /// Whether the row is flagged for scraping.
    pub fn is_kept(&self) -> bool {
        self.status.trim().eq_ignore_ascii_case(KEEP_FLAG)
    }

    /// Whether the URL cell is an operator placeholder rather than a real address.
    pub fn has_placeholder_url(&self) -> bool {
        matches!(self.url.trim(), "" | "-" | "WIP")
    }
}

/// Text and PDF links harvested from one product page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchedPage {
    /// Visible page text.
    pub text: String,
    /// Absolute PDF URLs, in document order, without duplicates.
    pub pdf_links: Vec<String>,
}

/// Result of testing one topic's pattern against one product's text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct KeywordFinding {
    pub keyword_set: String,
    pub keyword: String,
    pub found: bool,
    /// Joined evidence spans, or the not-found fallback message.
    pub sentences: String,
}

impl KeywordFinding {
    /// Build a finding from a topic's match list.
    pub fn from_matches(keyword_set: &str, keyword: &str, matches: &[String]) -> Self {
        let found = !matches.is_empty();
        let sentences = if found { matches.join(LIST_SEPARATOR) } else { not_found_message(keyword) };
        Self { keyword_set: keyword_set.to_string(), keyword: keyword.to_string(), found, sentences }
    }

    /// `Sentences_found` cell value.
    pub fn found_label(&self) -> &'static str {
        if self.found { FOUND_LABEL } else { NOT_FOUND_LABEL }
    }
}

/// Fallback evidence text for a topic without matches.
pub fn not_found_message(topic: &str) -> String {
    format!("not found for topic '{topic}'")
}

/// Join PDF links for display, or the sentinel when there are none.
pub fn pdf_display(links: &[String]) -> String {
    if links.is_empty() { NO_PDF_SENTINEL.to_string() } else { links.join(LIST_SEPARATOR) }
}

/// Accumulated per-product record, keyed by product name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ProductAggregate {
    pub product: String,
    pub group: String,
    pub abbreviation: String,
    pub fi: String,
    pub fi_type: String,
    pub product_type: String,
    pub url: String,
    pub pdf: String,
    pub timestamp: String,
    /// Cleaned page text, or the fetch error description.
    pub text: String,
    /// Cleaned text of the page blocks any registry pattern matched.
    pub relevant_text: String,
    pub fetch_error: Option<String>,
    pub summary_relevant: Option<String>,
    pub summary: Option<String>,
    pub findings: Vec<KeywordFinding>,
}

/// One report row: product metadata denormalized with one finding.
///
/// Field order and serialized names are the export column layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct OutputRow {
    #[serde(rename = "Group")]
    pub group: String,
    #[serde(rename = "Abbreviation")]
    pub abbreviation: String,
    #[serde(rename = "FI")]
    pub fi: String,
    #[serde(rename = "FI_type")]
    pub fi_type: String,
    #[serde(rename = "Product")]
    pub product: String,
    #[serde(rename = "Product_type")]
    pub product_type: String,
    #[serde(rename = "URL")]
    pub url: String,
    #[serde(rename = "PDF")]
    pub pdf: String,
    #[serde(rename = "timestamp")]
    pub timestamp: String,
    #[serde(rename = "Keyword_Set")]
    pub keyword_set: String,
    #[serde(rename = "keyword")]
    pub keyword: String,
    #[serde(rename = "Sentences_found")]
    pub sentences_found: String,
    #[serde(rename = "Sentences")]
    pub sentences: String,
    #[serde(rename = "Fetch_error")]
    pub fetch_error: Option<String>,
    #[serde(rename = "Summary_relevant", default)]
    pub summary_relevant: Option<String>,
    #[serde(rename = "Summary")]
    pub summary: Option<String>,
}
