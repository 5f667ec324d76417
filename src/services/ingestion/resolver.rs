//! Primary document resolution.
//!
//! Feed links usually point at a filing's index page rather than the filing
//! itself. The index lists the submission's documents in a `tableFile` table;
//! the first entry that is not itself an index page is the primary document.

use std::sync::OnceLock;

use scraper::{Html, Selector};
use url::Url;

use super::error::{FailureKind, PipelineError, PipelineStage};
use super::fetcher::DocumentFetcher;

/// Extensions accepted by the fallback link scan.
const DOCUMENT_EXTENSIONS: &[&str] = &[".htm", ".html", ".txt", ".xml", ".pdf"];

/// Prefix of inline-XBRL viewer links; the real document is the `doc` parameter.
const INLINE_VIEWER_PREFIX: &str = "/ix?doc=";

fn table_link_selector() -> &'static Selector {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    SELECTOR.get_or_init(|| {
        Selector::parse("table.tableFile a[href]").expect("static table link selector is valid")
    })
}

fn any_link_selector() -> &'static Selector {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    SELECTOR.get_or_init(|| Selector::parse("a[href]").expect("static link selector is valid"))
}

fn lowercase_path(url: &Url) -> String {
    url.path().to_lowercase()
}

/// Whether `url` is an index/listing page (`…-index.htm(l)`, `…/index.htm(l)`).
pub fn is_index_url(url: &Url) -> bool {
    let path = lowercase_path(url);
    ["-index.htm", "-index.html", "/index.htm", "/index.html"]
        .iter()
        .any(|suffix| path.ends_with(suffix))
}

fn has_document_extension(url: &Url) -> bool {
    let path = lowercase_path(url);
    DOCUMENT_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

/// Resolves an `href` found on the index page against the index URL.
fn resolve_href(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    let href = href.strip_prefix(INLINE_VIEWER_PREFIX).unwrap_or(href);
    let url = base.join(href).ok()?;
    matches!(url.scheme(), "http" | "https").then_some(url)
}

/// Picks the primary document from an index page.
///
/// Prefers the first non-index link in the documents table, then the first
/// non-index link anywhere on the page with a document extension.
pub fn select_primary_document(index_html: &str, base: &Url) -> Option<Url> {
    let document = Html::parse_document(index_html);

    let candidates = |selector: &Selector| -> Vec<Url> {
        document
            .select(selector)
            .filter_map(|a| a.value().attr("href"))
            .filter_map(|href| resolve_href(base, href))
            .filter(|url| !is_index_url(url))
            .collect()
    };

    if let Some(url) = candidates(table_link_selector()).into_iter().next() {
        return Some(url);
    }

    candidates(any_link_selector())
        .into_iter()
        .find(has_document_extension)
}

/// Turns an event's document URL into the URL of the document to ingest.
pub async fn resolve_document_url(
    fetcher: &dyn DocumentFetcher,
    document_url: &str,
) -> Result<Url, PipelineError> {
    let url = Url::parse(document_url).map_err(|e| {
        PipelineError::new(
            PipelineStage::Resolve,
            FailureKind::Resolution,
            format!("invalid document URL {:?}: {}", document_url, e),
        )
    })?;

    if !is_index_url(&url) {
        return Ok(url);
    }

    let index = fetcher
        .fetch(&url)
        .await
        .map_err(|e| e.at(PipelineStage::Resolve))?;
    let html = String::from_utf8_lossy(&index.body);

    select_primary_document(&html, &index.url).ok_or_else(|| {
        PipelineError::new(
            PipelineStage::Resolve,
            FailureKind::Resolution,
            format!("no primary document linked from {}", url),
        )
    })
}
