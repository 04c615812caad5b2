//! Page text and PDF link extraction.
//!
//! Product pages are reduced to their visible text (script, style and similar non-content
//! elements are skipped) plus the absolute URLs of linked PDF documents such as fact and
//! sales sheets. Block-level elements are separated by a newline so words from adjacent
//! blocks never run together; inline markup is concatenated as-is so a rate split across
//! `<b>16</b>%` still reads `16%`.

pub mod links;

pub use links::{extract_pdf_links, pdf_links};

use discwatch_core::FetchedPage;
use scraper::node::Node;
use scraper::{ElementRef, Html};
use url::Url;

/// Elements whose contents are never visible text.
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "template", "svg", "head"];

const BLOCK_ELEMENTS: &[&str] = &[
    "p", "div", "br", "li", "ul", "ol", "tr", "td", "th", "table", "section", "article", "header", "footer", "h1",
    "h2", "h3", "h4", "h5", "h6", "dt", "dd", "blockquote", "pre", "main", "nav", "aside", "form", "title",
];

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) => {
                let name = el.name();
                if SKIPPED_ELEMENTS.contains(&name) {
                    continue;
                }
                if let Some(child_el) = ElementRef::wrap(child) {
                    collect_text(child_el, out);
                }
                if BLOCK_ELEMENTS.contains(&name) {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }
}

/// Visible text of a parsed document, whitespace left as found.
pub fn page_text(document: &Html) -> String {
    let mut out = String::new();
    collect_text(document.root_element(), &mut out);
    out
}

/// Text and PDF links of an HTML page whose final URL is `base_url`.
pub fn extract_page(html: &str, base_url: &Url) -> FetchedPage {
    let document = Html::parse_document(html);
    FetchedPage { text: page_text(&document), pdf_links: pdf_links(&document, base_url) }
}
