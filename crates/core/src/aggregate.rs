//! Product aggregation: fetch, clean and match every kept product.
//!
//! Products are processed strictly one after another. Each product is fetched, its text
//! cleaned, and every pattern set in the registry run against it; findings are merged into
//! one [`ProductAggregate`] per product name. A failed fetch never aborts the batch: the error
//! description stands in for the page text and is carried through to the report rows.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{FixedOffset, Offset, Utc};
use rand::Rng;

use crate::clean::clean_text;
use crate::config::AppConfig;
use crate::fetcher::PageFetcher;
use crate::matcher::{extract, relevant_text};
use crate::models::{KeywordFinding, ProductAggregate, ProductRecord, pdf_display};
use crate::patterns::PatternRegistry;

/// Format of the per-product fetch timestamp.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Receives run progress as a percentage after every product.
///
/// Implementations must be `Send + Sync` so a run can be driven from a spawned task.
pub trait ProgressSink: Send + Sync {
    /// Report progress; `percent` never decreases within a run and never exceeds 100.
    fn update(&self, percent: u8, product: &str);

    /// Called once after the last product.
    fn finish(&self) {}
}

/// Discards progress updates.
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn update(&self, _percent: u8, _product: &str) {}
}

/// Emits progress as tracing events.
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn update(&self, percent: u8, product: &str) {
        tracing::info!(percent, product, "product processed");
    }

    fn finish(&self) {
        tracing::info!("all products processed");
    }
}

/// Randomized politeness delay between successive product fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    min: Duration,
    max: Duration,
}

impl Pacing {
    /// Uniform delay in `[min, max]`; inverted bounds are swapped.
    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max { Self { min, max } } else { Self { min: max, max: min } }
    }

    /// No delay at all.
    pub fn none() -> Self {
        Self { min: Duration::ZERO, max: Duration::ZERO }
    }

    pub fn is_none(&self) -> bool {
        self.max.is_zero()
    }

    pub fn next_delay(&self) -> Duration {
        if self.is_none() {
            return Duration::ZERO;
        }
        let min = self.min.as_millis() as u64;
        let max = self.max.as_millis() as u64;
        Duration::from_millis(rand::rng().random_range(min..=max))
    }
}

impl Default for Pacing {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(5))
    }
}

/// Knobs for one aggregation pass.
#[derive(Debug, Clone)]
pub struct AggregateOptions {
    pub pacing: Pacing,
    /// Offset used to render fetch timestamps.
    pub utc_offset: FixedOffset,
    /// Drop products whose page links no PDF document.
    pub require_pdf: bool,
}

impl AggregateOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        let (min, max) = config.delay_range();
        Self { pacing: Pacing::new(min, max), utc_offset: config.utc_offset(), require_pdf: config.require_pdf }
    }
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            pacing: Pacing::default(),
            utc_offset: FixedOffset::east_opt(7 * 3600).unwrap_or_else(|| Utc.fix()),
            require_pdf: false,
        }
    }
}

/// Select the products a run will visit: flagged `keep` with a real URL, in input order.
pub fn select_products(products: &[ProductRecord]) -> Vec<&ProductRecord> {
    products
        .iter()
        .filter(|p| {
            if !p.is_kept() {
                return false;
            }
            if p.has_placeholder_url() {
                tracing::debug!(product = %p.product_name, url = %p.url, "skipping placeholder URL");
                return false;
            }
            true
        })
        .collect()
}

/// Fetch, clean and match every selected product, merging findings by product name.
///
/// Aggregates are returned in order of each product name's first appearance.
pub async fn aggregate(
    products: &[ProductRecord], registry: &PatternRegistry, fetcher: &dyn PageFetcher, options: &AggregateOptions,
    progress: &dyn ProgressSink,
) -> Vec<ProductAggregate> {
    let selected = select_products(products);
    let total = selected.len();

    tracing::info!(selected = total, skipped = products.len() - total, sets = registry.sets().len(), "starting aggregation");

    let mut aggregates: Vec<ProductAggregate> = Vec::new();
    let mut by_name: HashMap<String, usize> = HashMap::new();

    for (idx, product) in selected.into_iter().enumerate() {
        if idx > 0 {
            let delay = options.pacing.next_delay();
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        if let Some(record) = process_product(product, registry, fetcher, options).await {
            match by_name.get(&record.product) {
                Some(&slot) => merge_into(&mut aggregates[slot], record),
                None => {
                    by_name.insert(record.product.clone(), aggregates.len());
                    aggregates.push(record);
                }
            }
        }

        let percent = ((idx + 1) * 100 / total).min(100) as u8;
        progress.update(percent, &product.product_name);
    }

    progress.finish();

    tracing::info!(aggregates = aggregates.len(), "aggregation finished");

    aggregates
}

/// Build the aggregate contribution of a single product row.
///
/// Returns `None` only when `require_pdf` is set and the page linked no PDF.
async fn process_product(
    product: &ProductRecord, registry: &PatternRegistry, fetcher: &dyn PageFetcher, options: &AggregateOptions,
) -> Option<ProductAggregate> {
    let timestamp = Utc::now().with_timezone(&options.utc_offset).format(TIMESTAMP_FORMAT).to_string();

    let (text, relevant_text, pdf, fetch_error) = match fetcher.fetch(&product.url, product.fetch).await {
        Ok(page) => {
            if options.require_pdf && page.pdf_links.is_empty() {
                tracing::debug!(product = %product.product_name, "no PDF sheet linked; dropping product");
                return None;
            }
            tracing::debug!(
                product = %product.product_name,
                chars = page.text.len(),
                pdfs = page.pdf_links.len(),
                "fetched product page"
            );
            (clean_text(&page.text), relevant_text(&page.text, registry), pdf_display(&page.pdf_links), None)
        }
        Err(e) => {
            let message = format!("fetch failed for '{}': {e}", product.url);
            tracing::warn!(product = %product.product_name, error = %e, "fetch failed; continuing");
            let cleaned = clean_text(&message);
            (cleaned.clone(), cleaned, message.clone(), Some(message))
        }
    };

    let mut findings = Vec::with_capacity(registry.topic_count());
    for set in registry.sets() {
        let matches = extract(&text, set);
        findings.extend(matches.iter().map(|(topic, spans)| KeywordFinding::from_matches(set.name(), topic, spans)));
    }

    Some(ProductAggregate {
        product: product.product_name.clone(),
        group: product.group.clone(),
        abbreviation: product.bank_abb.clone(),
        fi: product.bank_name.clone(),
        fi_type: product.fi_type.clone(),
        product_type: product.product_type.clone(),
        url: product.url.clone(),
        pdf,
        timestamp,
        text,
        relevant_text,
        fetch_error,
        summary_relevant: None,
        summary: None,
        findings,
    })
}

/// Merge a later row for the same product: metadata from the later row wins, findings accumulate.
fn merge_into(existing: &mut ProductAggregate, later: ProductAggregate) {
    let mut findings = std::mem::take(&mut existing.findings);
    findings.extend(later.findings);
    *existing = ProductAggregate { findings, ..later };
}
