//! Page fetcher seam between the aggregator and the network.
//!
//! The aggregator only sees this trait; `discwatch-client` provides the HTTP/browser
//! implementation and tests provide stubs.

use crate::Error;
use crate::models::{FetchStrategy, FetchedPage};

/// Resolves a product URL to its visible text and linked PDF documents.
///
/// Implementations enforce their own page-load timeout and handle cookies and consent
/// banners internally. An `Err` is a per-product failure; the aggregator records it and moves on.
#[async_trait::async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str, strategy: FetchStrategy) -> Result<FetchedPage, Error>;
}
