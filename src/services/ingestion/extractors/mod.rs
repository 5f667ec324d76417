//! Content extractors for fetched filing documents.

pub mod html;
pub mod text;

use anyhow::Result;

/// How a fetched document should be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    /// HTML or XML markup
    Markup,
    /// Plain text
    Text,
    /// Anything else (PDF, images, archives)
    Unsupported,
}

impl ContentKind {
    /// Detects the kind from a `Content-Type` header, falling back to the
    /// URL's extension when the header is missing or generic.
    pub fn detect(content_type: Option<&str>, url: &str) -> Self {
        if let Some(kind) = content_type.and_then(Self::from_mime) {
            return kind;
        }
        Self::from_url(url)
    }

    fn from_mime(mime: &str) -> Option<Self> {
        let mime = mime
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_lowercase();
        match mime.as_str() {
            "text/html" | "application/xhtml+xml" | "text/xml" | "application/xml" => {
                Some(Self::Markup)
            }
            "text/plain" => Some(Self::Text),
            "application/octet-stream" | "" => None,
            _ => Some(Self::Unsupported),
        }
    }

    fn from_url(url: &str) -> Self {
        let path = url.split(['?', '#']).next().unwrap_or_default().to_lowercase();
        match path.rsplit_once('.').map(|(_, ext)| ext) {
            Some("htm" | "html" | "xhtml" | "xml") => Self::Markup,
            Some("txt") => Self::Text,
            Some(_) => Self::Unsupported,
            None => Self::Markup,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Markup => "HTML",
            Self::Text => "Text",
            Self::Unsupported => "Unsupported",
        }
    }
}

/// Result of content extraction.
#[derive(Debug, Clone)]
pub struct ExtractionResult {
    /// Extracted text, whitespace collapsed.
    pub text: String,

    pub kind: ContentKind,

    /// Any warnings during extraction.
    pub warnings: Vec<String>,
}

impl ExtractionResult {
    pub fn new(text: String, kind: ContentKind) -> Self {
        Self {
            text,
            kind,
            warnings: Vec::new(),
        }
    }

    /// Adds a warning.
    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }

    /// Length in characters.
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Trait for content extractors.
pub trait ContentExtractor: Send + Sync {
    /// Extracts text content from bytes.
    fn extract(&self, data: &[u8]) -> Result<ExtractionResult>;

    /// Returns the extractor name.
    fn name(&self) -> &str;
}

/// Factory for creating extractors.
pub struct ExtractorFactory;

impl ExtractorFactory {
    /// Creates an extractor for the given kind.
    pub fn create(kind: ContentKind) -> Option<Box<dyn ContentExtractor>> {
        match kind {
            ContentKind::Markup => Some(Box::new(html::HtmlExtractor::new())),
            ContentKind::Text => Some(Box::new(text::TextExtractor::new())),
            ContentKind::Unsupported => None,
        }
    }
}

/// Replaces every run of whitespace with a single space and trims the ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Decodes bytes as UTF-8, skipping a BOM. Invalid sequences are replaced.
pub(crate) fn decode_utf8(data: &[u8]) -> (String, bool) {
    let data = data.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(data);
    match std::str::from_utf8(data) {
        Ok(s) => (s.to_string(), false),
        Err(_) => (String::from_utf8_lossy(data).into_owned(), true),
    }
}

// Re-exports
pub use html::HtmlExtractor;
pub use text::TextExtractor;
