//! HTML/XML text extractor.

use anyhow::Result;
use scraper::{Html, Node};

use super::{collapse_whitespace, decode_utf8, ContentExtractor, ContentKind, ExtractionResult};

/// Subtrees whose text is never document content.
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "head"];

/// Extracts visible text from markup.
pub struct HtmlExtractor;

impl HtmlExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Concatenates every text node outside the skipped subtrees.
    pub fn visible_text(html: &str) -> String {
        let document = Html::parse_document(html);
        let mut out = String::with_capacity(html.len() / 2);

        for node in document.tree.root().descendants() {
            let Node::Text(text) = node.value() else {
                continue;
            };

            let hidden = node.ancestors().any(|ancestor| {
                ancestor
                    .value()
                    .as_element()
                    .is_some_and(|el| SKIPPED_ELEMENTS.contains(&el.name()))
            });
            if hidden {
                continue;
            }

            out.push_str(text);
            // Adjacent cells and blocks must not glue together
            out.push(' ');
        }

        collapse_whitespace(&out)
    }
}

impl Default for HtmlExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentExtractor for HtmlExtractor {
    fn extract(&self, data: &[u8]) -> Result<ExtractionResult> {
        let (html, lossy) = decode_utf8(data);
        let mut result = ExtractionResult::new(Self::visible_text(&html), ContentKind::Markup);

        if lossy {
            result.add_warning("Some characters were replaced during decoding".to_string());
        }

        Ok(result)
    }

    fn name(&self) -> &str {
        "HtmlExtractor"
    }
}
