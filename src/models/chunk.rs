use serde::{Deserialize, Serialize};

use super::embedding::EmbeddingVector;

/// Fragmento de texto extraído y (opcionalmente) vectorizado de un filing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilingChunk {
    /// Ticker interno del emisor
    pub ticker: String,

    /// Origen del contenido (tipo de formulario, p. ej. "10-K")
    pub source: String,

    /// Posición dentro del conjunto (0-based, densa)
    pub chunk_index: u32,

    /// Texto del fragmento
    pub content: String,

    /// Embedding; `None` si no se pudo generar
    pub embedding: Option<EmbeddingVector>,
}

impl FilingChunk {
    pub fn new(ticker: &str, source: &str, chunk_index: u32, content: String) -> Self {
        Self {
            ticker: ticker.to_string(),
            source: source.to_string(),
            chunk_index,
            content,
            embedding: None,
        }
    }

    pub fn with_embedding(mut self, embedding: EmbeddingVector) -> Self {
        self.embedding = Some(embedding);
        self
    }
}

/// Verifica que los índices formen la secuencia 0..n-1 y que todos los
/// fragmentos pertenezcan al par (ticker, source) indicado
pub fn is_dense_set(chunks: &[FilingChunk], ticker: &str, source: &str) -> bool {
    chunks.iter().enumerate().all(|(i, chunk)| {
        chunk.chunk_index as usize == i && chunk.ticker == ticker && chunk.source == source
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dense_set() {
        let chunks = vec![
            FilingChunk::new("EX", "10-K", 0, "a".to_string()),
            FilingChunk::new("EX", "10-K", 1, "b".to_string()),
        ];
        assert!(is_dense_set(&chunks, "EX", "10-K"));
        assert!(is_dense_set(&[], "EX", "10-K"));
    }

    #[test]
    fn test_gap_is_not_dense() {
        let chunks = vec![
            FilingChunk::new("EX", "10-K", 0, "a".to_string()),
            FilingChunk::new("EX", "10-K", 2, "c".to_string()),
        ];
        assert!(!is_dense_set(&chunks, "EX", "10-K"));
    }

    #[test]
    fn test_foreign_chunk_is_not_dense() {
        let chunks = vec![FilingChunk::new("OTHER", "10-K", 0, "a".to_string())];
        assert!(!is_dense_set(&chunks, "EX", "10-K"));
    }
}
