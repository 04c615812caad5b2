//! URL canonicalization and PDF link recognition.

/// Error type for URL canonicalization failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Canonicalize a product URL before fetching.
///
/// Operators paste URLs from browsers, so a missing scheme defaults to `https`, the host is
/// lowercased and any fragment dropped. The query string is kept as-is.
pub fn canonicalize(input: &str) -> Result<url::Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let url_str = if trimmed.contains("://") { trimmed.to_string() } else { format!("https://{trimmed}") };

    let mut parsed = url::Url::parse(&url_str).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    if let Some(host) = parsed.host_str().map(str::to_lowercase) {
        parsed.set_host(Some(&host)).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

/// Path suffixes of linked PDF documents, including ASP.NET handlers that serve PDFs.
const PDF_SUFFIXES: &[&str] = &[".pdf", ".pdf.aspx"];

/// Whether a resolved link points at a PDF document, judged by its path.
pub fn is_pdf_href(url: &url::Url) -> bool {
    let path = url.path().to_ascii_lowercase();
    PDF_SUFFIXES.iter().any(|suffix| path.ends_with(suffix))
}
