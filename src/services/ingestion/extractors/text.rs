//! Plain text content extractor.

use anyhow::Result;

use super::{collapse_whitespace, decode_utf8, ContentExtractor, ContentKind, ExtractionResult};

/// Extractor for plain text filings (full submission `.txt` files).
pub struct TextExtractor;

impl TextExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TextExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentExtractor for TextExtractor {
    fn extract(&self, data: &[u8]) -> Result<ExtractionResult> {
        let (text, lossy) = decode_utf8(data);
        let mut result = ExtractionResult::new(collapse_whitespace(&text), ContentKind::Text);

        if lossy {
            result.add_warning("Some characters were replaced during decoding".to_string());
        }

        Ok(result)
    }

    fn name(&self) -> &str {
        "TextExtractor"
    }
}
