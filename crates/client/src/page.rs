//! `PageFetcher` implementation over HTTP and the optional headless renderer.

use std::sync::Arc;

use discwatch_core::{AppConfig, Error, FetchStrategy, FetchedPage, PageFetcher};

use crate::extract::extract_page;
use crate::fetch::{FetchClient, FetchConfig, canonicalize};
use crate::render::{RenderOptions, Renderer};

/// Fetches product pages and reduces them to text plus PDF links.
///
/// Products hinted `browser` go through the renderer when one is attached; otherwise they
/// fall back to a plain HTTP fetch.
pub struct WebPageFetcher {
    client: FetchClient,
    renderer: Option<Arc<dyn Renderer>>,
    render_options: RenderOptions,
}

impl WebPageFetcher {
    pub fn new(client: FetchClient) -> Self {
        Self { client, renderer: None, render_options: RenderOptions::default() }
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn Renderer>, options: RenderOptions) -> Self {
        self.renderer = Some(renderer);
        self.render_options = options;
        self
    }

    /// Build from application config, launching the browser when rendering is enabled.
    ///
    /// A browser that fails to launch is logged and the fetcher continues HTTP-only.
    pub async fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let fetcher = Self::new(FetchClient::new(FetchConfig::from_app(config))?);

        if !config.render_enabled {
            return Ok(fetcher);
        }

        Ok(Self::attach_renderer(fetcher, config).await)
    }

    #[cfg(feature = "render")]
    async fn attach_renderer(fetcher: Self, config: &AppConfig) -> Self {
        match crate::render::HeadlessRenderer::new().await {
            Ok(renderer) => {
                tracing::info!("headless renderer ready");
                fetcher.with_renderer(Arc::new(renderer), RenderOptions::with_timeout(config.timeout()))
            }
            Err(e) => {
                tracing::warn!(error = %e, "headless renderer unavailable; browser products use HTTP");
                fetcher
            }
        }
    }

    #[cfg(not(feature = "render"))]
    async fn attach_renderer(fetcher: Self, _config: &AppConfig) -> Self {
        tracing::warn!("built without the render feature; browser products use HTTP");
        fetcher
    }

    pub fn has_renderer(&self) -> bool {
        self.renderer.is_some()
    }

    async fn fetch_http(&self, url: &str) -> Result<FetchedPage, Error> {
        let response = self.client.fetch(url).await?;

        let is_pdf = response.content_type.as_deref().is_some_and(|ct| ct.starts_with("application/pdf"));
        if is_pdf {
            tracing::debug!(url = %response.final_url, "product URL is itself a PDF");
            return Ok(FetchedPage { text: String::new(), pdf_links: vec![response.final_url.to_string()] });
        }

        Ok(extract_page(&response.text(), &response.final_url))
    }

    async fn fetch_rendered(&self, renderer: &dyn Renderer, url: &str) -> Result<FetchedPage, Error> {
        let url = canonicalize(url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let page = renderer.render(&url, &self.render_options).await?;
        Ok(extract_page(&page.html, &page.final_url))
    }
}

#[async_trait::async_trait]
impl PageFetcher for WebPageFetcher {
    async fn fetch(&self, url: &str, strategy: FetchStrategy) -> Result<FetchedPage, Error> {
        match (strategy, &self.renderer) {
            (FetchStrategy::Browser, Some(renderer)) => self.fetch_rendered(renderer.as_ref(), url).await,
            (FetchStrategy::Browser, None) => {
                tracing::debug!(url, "no renderer attached; fetching over HTTP");
                self.fetch_http(url).await
            }
            (FetchStrategy::Http, _) => self.fetch_http(url).await,
        }
    }
}
