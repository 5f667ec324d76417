//! Shape-checked embedding calls on top of a provider.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::models::{EmbeddingModel, EmbeddingVector};
use super::config::EmbeddingConfig;
use super::ollama_provider::OllamaEmbeddingProvider;
use super::provider::EmbeddingProvider;

/// Wraps a provider with the per-call timeout and the shape check every
/// vector must pass before it is stored.
pub struct EmbeddingService {
    backend: Arc<dyn EmbeddingProvider>,
    dimension: usize,
    call_timeout: Duration,
}

impl EmbeddingService {
    /// `config` supplies the expected dimension and the call timeout; the
    /// provider is used as given.
    pub fn new(backend: Arc<dyn EmbeddingProvider>, config: EmbeddingConfig) -> Self {
        info!(
            "Embedding service ready ({} / {}, {} dims, timeout {:?})",
            backend.provider_name(),
            config.model.model_name(),
            config.dimension,
            config.timeout
        );
        Self {
            backend,
            dimension: config.dimension,
            call_timeout: config.timeout,
        }
    }

    pub fn with_http(config: EmbeddingConfig) -> Result<Self> {
        let backend = OllamaEmbeddingProvider::new(&config)
            .context("Failed to initialize embedding provider")?;
        Ok(Self::new(Arc::new(backend), config))
    }

    pub fn from_env() -> Result<Self> {
        Self::with_http(EmbeddingConfig::from_env())
    }

    /// Blank text is rejected without calling the backend.
    pub async fn embed(&self, text: &str) -> Result<EmbeddingVector> {
        if text.trim().is_empty() {
            anyhow::bail!("Cannot generate embedding for empty text");
        }

        let result = tokio::time::timeout(self.call_timeout, self.backend.embed(text))
            .await
            .map_err(|_| {
                anyhow::anyhow!("Embedding call timed out after {:?}", self.call_timeout)
            })??;

        if !result.embedding.is_well_formed(self.dimension) {
            anyhow::bail!(
                "Malformed embedding: {} values, expected {} finite values",
                result.embedding.vector.len(),
                self.dimension
            );
        }

        debug!(
            "Embedded {} chars via {} in {}ms",
            text.len(),
            self.backend.provider_name(),
            result.latency_ms
        );
        Ok(result.embedding)
    }

    pub fn model(&self) -> &EmbeddingModel {
        self.backend.model()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn provider_name(&self) -> &str {
        self.backend.provider_name()
    }

    /// `Ok(false)` when the backend is unreachable.
    pub async fn health_check(&self) -> Result<bool> {
        self.backend.health_check().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::MockEmbeddingProvider;

    fn mock_service(provider: MockEmbeddingProvider, timeout: Duration) -> EmbeddingService {
        let config = EmbeddingConfig::with_model(EmbeddingModel::AllMiniLm).with_timeout(timeout);
        EmbeddingService::new(Arc::new(provider), config)
    }

    fn healthy() -> EmbeddingService {
        mock_service(
            MockEmbeddingProvider::new(EmbeddingModel::AllMiniLm),
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn test_vector_passes_shape_check() {
        let embedding = healthy().embed("hello world").await.unwrap();

        assert_eq!(embedding.dimension, 384);
        assert!(embedding.is_normalized());
    }

    #[tokio::test]
    async fn test_blank_text_rejected() {
        let err = healthy().embed("   ").await.unwrap_err();
        assert!(err.to_string().contains("empty text"));
    }

    #[tokio::test]
    async fn test_slow_backend_times_out() {
        let service = mock_service(
            MockEmbeddingProvider::new(EmbeddingModel::AllMiniLm).with_latency(500),
            Duration::from_millis(20),
        );

        let err = service.embed("slow").await.unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn test_wrong_dimension_rejected() {
        let service = mock_service(
            MockEmbeddingProvider::new(EmbeddingModel::AllMiniLm).with_dimension(8),
            Duration::from_secs(5),
        );

        let err = service.embed("text").await.unwrap_err();
        assert!(err.to_string().contains("Malformed embedding"));
    }

    #[tokio::test]
    async fn test_backend_failure_propagates() {
        let service = mock_service(
            MockEmbeddingProvider::new(EmbeddingModel::AllMiniLm).should_fail(true),
            Duration::from_secs(5),
        );

        assert!(service.embed("text").await.is_err());
        assert!(!service.health_check().await.unwrap());
        assert_eq!(service.provider_name(), "mock");
        assert_eq!(*service.model(), EmbeddingModel::AllMiniLm);
    }
}
