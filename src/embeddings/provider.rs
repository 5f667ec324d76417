//! Backend seam for embedding generation.

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{EmbeddingModel, EmbeddingVector};

/// One vector plus how long the backend took to produce it.
#[derive(Debug, Clone)]
pub struct EmbeddingResult {
    pub embedding: EmbeddingVector,
    pub latency_ms: u64,
}

impl EmbeddingResult {
    pub fn new(embedding: EmbeddingVector, latency_ms: u64) -> Self {
        Self {
            embedding,
            latency_ms,
        }
    }
}

/// A backend that turns one text into one vector.
///
/// Implementations report failures as errors and never return a partial
/// vector; the shape check against the configured dimension happens in
/// [`EmbeddingService`](super::EmbeddingService).
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<EmbeddingResult>;

    fn model(&self) -> &EmbeddingModel;

    /// Vector length this backend is expected to return.
    fn dimension(&self) -> usize;

    /// Whether the backend answers at all. Unreachable backends return
    /// `Ok(false)` rather than an error.
    async fn health_check(&self) -> Result<bool>;

    /// Short name used in log lines.
    fn provider_name(&self) -> &str;
}
