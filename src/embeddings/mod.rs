//! Embedding generation.
//!
//! - HTTP provider speaking the Ollama embeddings protocol
//! - Mock provider (for testing)
//!
//! # Example
//!
//! ```rust,ignore
//! use filing_ingest::embeddings::{EmbeddingConfig, EmbeddingService};
//!
//! let service = EmbeddingService::with_http(EmbeddingConfig::from_env())?;
//! let vector = service.embed("Net revenue increased 12%").await?;
//! assert_eq!(vector.dimension, service.dimension());
//! ```

pub mod config;
pub mod mock_provider;
pub mod ollama_provider;
pub mod provider;
pub mod service;

// Re-exports
pub use config::EmbeddingConfig;
pub use mock_provider::MockEmbeddingProvider;
pub use ollama_provider::OllamaEmbeddingProvider;
pub use provider::{EmbeddingProvider, EmbeddingResult};
pub use service::EmbeddingService;
