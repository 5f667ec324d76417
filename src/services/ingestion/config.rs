//! Ingestion pipeline configuration.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What to do with a chunk whose embedding call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingFailurePolicy {
    /// Omit the chunk and keep going; the count is reported.
    #[default]
    Drop,
    /// Fail the whole event.
    Fail,
}

impl FromStr for EmbeddingFailurePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "drop" => Ok(Self::Drop),
            "fail" => Ok(Self::Fail),
            other => Err(ConfigError::UnknownPolicy(other.to_string())),
        }
    }
}

/// Configuration for the ingestion pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionConfig {
    /// Window length in characters.
    pub chunk_size: usize,

    /// Characters shared by consecutive windows.
    pub chunk_overlap: usize,

    /// Embedding calls issued concurrently.
    pub embed_batch_size: usize,

    /// Timeout for each document/index fetch.
    pub fetch_timeout: Duration,

    /// Responses larger than this fail the fetch stage.
    pub max_document_bytes: usize,

    /// Sent on every request; filing archives reject anonymous clients.
    pub user_agent: String,

    pub embedding_failure_policy: EmbeddingFailurePolicy,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            embed_batch_size: 8,
            fetch_timeout: Duration::from_secs(30),
            max_document_bytes: 20 * 1024 * 1024, // 20MB
            user_agent: "filing-ingest/0.1 (ops@example.com)".to_string(),
            embedding_failure_policy: EmbeddingFailurePolicy::Drop,
        }
    }
}

impl IngestionConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set chunk size and overlap.
    pub fn with_chunking(mut self, size: usize, overlap: usize) -> Self {
        self.chunk_size = size;
        self.chunk_overlap = overlap;
        self
    }

    /// Builder: set embedding batch size.
    pub fn with_embed_batch_size(mut self, size: usize) -> Self {
        self.embed_batch_size = size;
        self
    }

    /// Builder: set fetch timeout.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Builder: set maximum document size.
    pub fn with_max_document_bytes(mut self, bytes: usize) -> Self {
        self.max_document_bytes = bytes;
        self
    }

    /// Builder: set the User-Agent header.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Builder: set the embedding failure policy.
    pub fn with_embedding_failure_policy(mut self, policy: EmbeddingFailurePolicy) -> Self {
        self.embedding_failure_policy = policy;
        self
    }

    /// Creates configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("INGESTION_CHUNK_SIZE") {
            if let Ok(size) = val.parse::<usize>() {
                config.chunk_size = size;
            }
        }

        if let Ok(val) = std::env::var("INGESTION_CHUNK_OVERLAP") {
            if let Ok(overlap) = val.parse::<usize>() {
                config.chunk_overlap = overlap;
            }
        }

        if let Ok(val) = std::env::var("INGESTION_EMBED_BATCH_SIZE") {
            if let Ok(size) = val.parse::<usize>() {
                config.embed_batch_size = size;
            }
        }

        if let Ok(val) = std::env::var("INGESTION_FETCH_TIMEOUT_SECS") {
            if let Ok(secs) = val.parse::<u64>() {
                config.fetch_timeout = Duration::from_secs(secs);
            }
        }

        if let Ok(val) = std::env::var("INGESTION_MAX_DOCUMENT_BYTES") {
            if let Ok(bytes) = val.parse::<usize>() {
                config.max_document_bytes = bytes;
            }
        }

        if let Ok(val) = std::env::var("INGESTION_USER_AGENT") {
            config.user_agent = val;
        }

        if let Ok(val) = std::env::var("INGESTION_EMBEDDING_FAILURE_POLICY") {
            config.embedding_failure_policy = val.parse()?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validates configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::ChunkSizeTooSmall);
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(ConfigError::OverlapTooLarge);
        }
        if self.embed_batch_size == 0 {
            return Err(ConfigError::InvalidValue("embed_batch_size must be at least 1".into()));
        }
        if self.user_agent.trim().is_empty() {
            return Err(ConfigError::InvalidValue("user_agent must not be empty".into()));
        }
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Chunk size must be at least 1 character")]
    ChunkSizeTooSmall,

    #[error("Chunk overlap must be less than chunk size")]
    OverlapTooLarge,

    #[error("Unknown embedding failure policy: {0} (expected drop or fail)")]
    UnknownPolicy(String),

    #[error("Invalid configuration: {0}")]
    InvalidValue(String),
}
