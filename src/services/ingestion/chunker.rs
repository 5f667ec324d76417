//! Fixed-window text chunking.
//!
//! Chunk `i` starts `i * (chunk_size - overlap)` characters into the text and
//! spans `chunk_size` characters (the last one may be shorter). Splitting stops
//! at the first window that reaches the end of the text, so a text of `L`
//! characters yields `ceil((L - overlap) / (chunk_size - overlap))` chunks when
//! `L > chunk_size`, one chunk when `0 < L <= chunk_size` and none when empty.
//!
//! Offsets are in characters, not bytes, so multi-byte text is never split
//! inside a code point.

use super::config::IngestionConfig;

/// A chunk of text from a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// The chunk text content.
    pub content: String,

    /// Index of this chunk (0-based).
    pub index: usize,

    /// Character offset in original document.
    pub start_offset: usize,

    /// Character end offset (exclusive).
    pub end_offset: usize,
}

/// Result of a chunking operation.
#[derive(Debug)]
pub struct ChunkingResult {
    /// The generated chunks.
    pub chunks: Vec<TextChunk>,

    /// Original document length in characters.
    pub original_length: usize,
}

impl ChunkingResult {
    /// Gets the number of chunks.
    pub fn count(&self) -> usize {
        self.chunks.len()
    }

    /// Checks if the document was split into multiple chunks.
    pub fn was_split(&self) -> bool {
        self.chunks.len() > 1
    }
}

/// Text chunker with configurable parameters.
#[derive(Debug, Clone, Copy)]
pub struct TextChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl TextChunker {
    /// Creates a new chunker. The overlap is clamped below the chunk size so
    /// every window advances.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size - 1),
        }
    }

    /// Creates a chunker from configuration.
    pub fn from_config(config: &IngestionConfig) -> Self {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    /// Distance between the starts of consecutive windows.
    pub fn stride(&self) -> usize {
        self.chunk_size - self.chunk_overlap
    }

    /// Number of chunks a text of `len` characters produces.
    pub fn expected_count(&self, len: usize) -> usize {
        if len == 0 {
            0
        } else if len <= self.chunk_size {
            1
        } else {
            (len - self.chunk_overlap).div_ceil(self.stride())
        }
    }

    /// Splits text into chunks.
    pub fn chunk(&self, text: &str) -> ChunkingResult {
        // Byte position of every char, plus the end of the string
        let mut boundaries: Vec<usize> = text.char_indices().map(|(pos, _)| pos).collect();
        let original_length = boundaries.len();
        boundaries.push(text.len());

        let mut chunks = Vec::with_capacity(self.expected_count(original_length));
        if original_length == 0 {
            return ChunkingResult {
                chunks,
                original_length,
            };
        }

        let mut start = 0;
        loop {
            let end = (start + self.chunk_size).min(original_length);
            chunks.push(TextChunk {
                content: text[boundaries[start]..boundaries[end]].to_string(),
                index: chunks.len(),
                start_offset: start,
                end_offset: end,
            });

            if end == original_length {
                break;
            }
            start += self.stride();
        }

        ChunkingResult {
            chunks,
            original_length,
        }
    }
}

impl Default for TextChunker {
    fn default() -> Self {
        Self::from_config(&IngestionConfig::default())
    }
}
