//! PDF link harvesting from product pages.

use scraper::{ElementRef, Html};
use std::collections::HashSet;
use url::Url;

use crate::fetch::is_pdf_href;

/// Absolute URLs of every linked PDF document, in document order, without duplicates.
///
/// Relative hrefs resolve against `base_url` (the page's final URL after redirects).
/// Unparseable hrefs are skipped.
pub fn pdf_links(document: &Html, base_url: &Url) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    let anchors = document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|e| e.value().name() == "a");

    for anchor in anchors {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };

        let Ok(mut resolved) = base_url.join(href.trim()) else {
            continue;
        };
        resolved.set_fragment(None);

        if !is_pdf_href(&resolved) {
            continue;
        }

        let resolved = resolved.to_string();
        if seen.insert(resolved.clone()) {
            links.push(resolved);
        }
    }

    links
}

/// Parse `html` and harvest its PDF links.
pub fn extract_pdf_links(html: &str, base_url: &Url) -> Vec<String> {
    pdf_links(&Html::parse_document(html), base_url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://bank.test/cards/platinum/").unwrap()
    }

    #[test]
    fn test_relative_and_absolute_pdf_links() {
        let html = r#"
            <html><body>
                <a href="/docs/fees.pdf">Fee sheet</a>
                <a href="sales-sheet.pdf">Sales sheet</a>
                <a href="https://cdn.bank.test/tnc.pdf.aspx">T&amp;C</a>
                <a href="/apply">Apply now</a>
            </body></html>
        "#;

        let links = extract_pdf_links(html, &base());
        assert_eq!(
            links,
            vec![
                "https://bank.test/docs/fees.pdf",
                "https://bank.test/cards/platinum/sales-sheet.pdf",
                "https://cdn.bank.test/tnc.pdf.aspx",
            ]
        );
    }

    #[test]
    fn test_duplicate_links_kept_once_in_first_position() {
        let html = r##"
            <a href="/docs/fees.pdf">Fees</a>
            <a href="/docs/other.pdf">Other</a>
            <a href="https://bank.test/docs/fees.pdf#page=2">Fees again</a>
        "##;

        let links = extract_pdf_links(html, &base());
        assert_eq!(links, vec!["https://bank.test/docs/fees.pdf", "https://bank.test/docs/other.pdf"]);
    }

    #[test]
    fn test_no_pdf_links() {
        let html = r#"<p>No documents</p><a href="/contact">Contact</a><a>no href</a>"#;
        assert!(extract_pdf_links(html, &base()).is_empty());
    }

    #[test]
    fn test_mailto_and_javascript_links_ignored() {
        let html = r#"<a href="mailto:docs@bank.test?subject=x.pdf">Mail</a><a href="javascript:void(0)">JS</a>"#;
        assert!(extract_pdf_links(html, &base()).is_empty());
    }
}
