//! Configuration for the embedding service.

use std::time::Duration;

use crate::models::EmbeddingModel;

/// Configuration for the embedding service
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    /// Base URL of the embedding server
    pub base_url: String,

    /// The embedding model to use
    pub model: EmbeddingModel,

    /// Expected vector length; responses of any other length are rejected
    pub dimension: usize,

    /// Per-call timeout
    pub timeout: Duration,

    /// Bearer token for hosted servers
    pub api_key: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        let model = EmbeddingModel::NomicEmbedText;
        Self {
            base_url: "http://localhost:11434".to_string(),
            dimension: model.dimension(),
            model,
            timeout: Duration::from_secs(30),
            api_key: None,
        }
    }
}

impl EmbeddingConfig {
    /// Creates a new configuration with the specified model
    pub fn with_model(model: EmbeddingModel) -> Self {
        let dimension = model.dimension();
        Self {
            model,
            dimension,
            ..Default::default()
        }
    }

    /// Sets the base URL
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets the expected dimension
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }

    /// Sets the per-call timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Loads configuration from environment variables
    pub fn from_env() -> Self {
        let model = std::env::var("EMBEDDING_MODEL")
            .map(|m| EmbeddingModel::from_name(&m))
            .unwrap_or(EmbeddingModel::NomicEmbedText);

        // Custom models report 0; the env var must supply the size
        let dimension = std::env::var("EMBEDDING_DIMENSION")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(|| model.dimension());

        let timeout = std::env::var("EMBEDDING_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(30));

        Self {
            base_url: std::env::var("EMBEDDING_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:11434".to_string()),
            model,
            dimension,
            timeout,
            api_key: std::env::var("EMBEDDING_API_KEY").ok().filter(|k| !k.is_empty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    #[test]
    fn test_default_config() {
        let config = EmbeddingConfig::default();
        assert_eq!(config.model, EmbeddingModel::NomicEmbedText);
        assert_eq!(config.dimension, 768);
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_config_builder() {
        let config = EmbeddingConfig::with_model(EmbeddingModel::AllMiniLm)
            .with_base_url("http://embed:9000")
            .with_timeout(Duration::from_secs(5));

        assert_eq!(config.dimension, 384);
        assert_eq!(config.base_url, "http://embed:9000");
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_from_env_custom_model() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let keys = ["EMBEDDING_MODEL", "EMBEDDING_DIMENSION", "EMBEDDING_API_KEY"];
        let saved: Vec<_> = keys.iter().map(|k| (*k, std::env::var(k).ok())).collect();

        std::env::set_var("EMBEDDING_MODEL", "bge-m3");
        std::env::set_var("EMBEDDING_DIMENSION", "1024");
        std::env::set_var("EMBEDDING_API_KEY", "");

        let config = EmbeddingConfig::from_env();
        assert_eq!(config.model, EmbeddingModel::Custom("bge-m3".to_string()));
        assert_eq!(config.dimension, 1024);
        assert!(config.api_key.is_none());

        for (key, value) in saved {
            match value {
                Some(v) => std::env::set_var(key, v),
                None => std::env::remove_var(key),
            }
        }
    }
}
