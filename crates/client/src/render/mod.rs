//! Headless browser rendering for script-built product pages.
//!
//! The `Renderer` trait is always available; the chromiumoxide-backed `HeadlessRenderer`
//! is gated behind the `render` feature.

use std::time::Duration;
use thiserror::Error;
use url::Url;

use discwatch_core::Error as CoreError;

/// Errors that can occur during page rendering.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Failed to launch or connect to browser.
    #[error("browser launch failed: {0}")]
    BrowserLaunch(String),

    /// Failed to navigate to URL.
    #[error("navigation failed: {0}")]
    Navigation(String),

    /// Failed to get page content.
    #[error("content retrieval failed: {0}")]
    ContentRetrieval(String),

    /// Timeout waiting for page to load.
    #[error("render timeout after {0}ms")]
    Timeout(u64),
}

impl From<RenderError> for CoreError {
    fn from(err: RenderError) -> Self {
        match err {
            RenderError::Timeout(ms) => CoreError::FetchTimeout(format!("page did not render within {ms}ms")),
            other => CoreError::RenderFailed(other.to_string()),
        }
    }
}

/// Options for rendering a page.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Page-load timeout in milliseconds (default: 30000).
    pub timeout_ms: u64,

    /// Time to let scripts settle after load and after a consent click (default: 2000).
    pub settle_ms: u64,

    /// Click a cookie/consent "Accept" button when one is present (default: true).
    pub dismiss_consent: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self { timeout_ms: 30000, settle_ms: 2000, dismiss_consent: true }
    }
}

impl RenderOptions {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout_ms: timeout.as_millis() as u64, ..Default::default() }
    }
}

/// Result of rendering a page.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// Rendered HTML content.
    pub html: String,

    /// Final URL after redirects.
    pub final_url: Url,

    /// Whether a consent button was clicked.
    pub consent_clicked: bool,

    /// Time taken to render in milliseconds.
    pub render_time_ms: u64,
}

/// Renderer trait for headless browser page rendering.
#[async_trait::async_trait]
pub trait Renderer: Send + Sync {
    /// Render a URL to HTML via headless browser.
    async fn render(&self, url: &Url, opts: &RenderOptions) -> Result<RenderedPage, RenderError>;
}

/// Clicks the first visible button-like element labelled as a consent acceptance.
/// Evaluates to `true` when something was clicked.
#[cfg_attr(not(feature = "render"), allow(dead_code))]
const CONSENT_SCRIPT: &str = r#"(() => {
    const labels = /^(accept|accept all|accept all cookies|accept cookies|agree|i agree|allow all|got it|ok|ยอมรับ|ยอมรับทั้งหมด|ตกลง)$/i;
    const candidates = document.querySelectorAll(
        'button, a, [role="button"], input[type="button"], input[type="submit"]'
    );
    for (const el of candidates) {
        const label = (el.innerText || el.value || '').trim();
        if (labels.test(label) && el.offsetParent !== null) {
            el.click();
            return true;
        }
    }
    return false;
})()"#;

#[cfg(feature = "render")]
pub use headless::HeadlessRenderer;

#[cfg(feature = "render")]
mod headless {
    use super::*;

    /// Headless Chrome/Chromium renderer using chromiumoxide.
    pub struct HeadlessRenderer {
        browser: chromiumoxide::Browser,
    }

    impl HeadlessRenderer {
        /// Launch a headless browser instance.
        ///
        /// A background task drives the Chrome DevTools Protocol event stream.
        pub async fn new() -> Result<Self, RenderError> {
            use chromiumoxide::browser::{Browser, BrowserConfig};
            use futures_util::StreamExt;

            let config = BrowserConfig::builder().build().map_err(RenderError::BrowserLaunch)?;
            let (browser, mut handler) =
                Browser::launch(config).await.map_err(|e| RenderError::BrowserLaunch(e.to_string()))?;

            tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    if let Err(e) = event {
                        tracing::debug!("browser handler event error: {e}");
                        break;
                    }
                }
            });

            Ok(Self { browser })
        }

        async fn load(&self, url: &Url, opts: &RenderOptions) -> Result<(String, String, bool), RenderError> {
            let page = self.browser.new_page(url.as_str()).await.map_err(|e| RenderError::Navigation(e.to_string()))?;

            page.wait_for_navigation().await.map_err(|e| RenderError::Navigation(e.to_string()))?;
            tokio::time::sleep(Duration::from_millis(opts.settle_ms)).await;

            let mut consent_clicked = false;
            if opts.dismiss_consent {
                consent_clicked = page
                    .evaluate(CONSENT_SCRIPT)
                    .await
                    .ok()
                    .and_then(|r| r.into_value::<bool>().ok())
                    .unwrap_or(false);
                if consent_clicked {
                    tracing::debug!(%url, "dismissed consent banner");
                    tokio::time::sleep(Duration::from_millis(opts.settle_ms)).await;
                }
            }

            let html = page.content().await.map_err(|e| RenderError::ContentRetrieval(e.to_string()))?;
            let final_url = page
                .url()
                .await
                .map_err(|e| RenderError::ContentRetrieval(e.to_string()))?
                .unwrap_or_else(|| url.to_string());

            page.close().await.ok();
            Ok((html, final_url, consent_clicked))
        }
    }

    #[async_trait::async_trait]
    impl Renderer for HeadlessRenderer {
        async fn render(&self, url: &Url, opts: &RenderOptions) -> Result<RenderedPage, RenderError> {
            let start = std::time::Instant::now();

            let (html, final_url, consent_clicked) =
                tokio::time::timeout(Duration::from_millis(opts.timeout_ms), self.load(url, opts))
                    .await
                    .map_err(|_| RenderError::Timeout(opts.timeout_ms))??;

            let final_url = Url::parse(&final_url).map_err(|e| RenderError::Navigation(e.to_string()))?;
            let render_time_ms = start.elapsed().as_millis() as u64;

            tracing::debug!(%url, %final_url, render_time_ms, consent_clicked, "rendered page");

            Ok(RenderedPage { html, final_url, consent_clicked, render_time_ms })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_options_default() {
        let opts = RenderOptions::default();
        assert_eq!(opts.timeout_ms, 30000);
        assert!(opts.dismiss_consent);
        assert_eq!(RenderOptions::with_timeout(Duration::from_secs(5)).timeout_ms, 5000);
    }

    #[test]
    fn test_render_timeout_maps_to_fetch_timeout() {
        let err: CoreError = RenderError::Timeout(30000).into();
        assert!(matches!(err, CoreError::FetchTimeout(_)));

        let err: CoreError = RenderError::Navigation("net::ERR_NAME_NOT_RESOLVED".into()).into();
        assert!(matches!(err, CoreError::RenderFailed(ref m) if m.contains("ERR_NAME_NOT_RESOLVED")));
    }

    #[cfg(feature = "render")]
    #[tokio::test]
    #[ignore = "requires Chrome/Chromium installation"]
    async fn test_headless_renderer_new() {
        assert!(HeadlessRenderer::new().await.is_ok());
    }

    #[cfg(feature = "render")]
    #[tokio::test]
    #[ignore = "requires network and Chrome/Chromium"]
    async fn test_render_simple_page() {
        let renderer = HeadlessRenderer::new().await.unwrap();
        let url = Url::parse("https://example.com").unwrap();

        let page = renderer.render(&url, &RenderOptions::default()).await.unwrap();
        assert!(page.html.contains("<html"));
        assert_eq!(page.final_url.as_str(), "https://example.com/");
    }
}
