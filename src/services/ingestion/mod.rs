//! Filing ingestion pipeline.
//!
//! Turns one [`IngestionEvent`](crate::models::IngestionEvent) into a stored,
//! embedded chunk set:
//! - resolve the primary document behind an index page
//! - fetch it over HTTP with an identifying User-Agent
//! - extract visible text (HTML/XML or plain text)
//! - split into fixed overlapping windows
//! - embed every window, dropping or failing on errors per policy
//! - replace the `(ticker, form_type)` chunk set in one transaction
//!
//! # Example
//!
//! ```ignore
//! use filing_ingest::services::ingestion::{HttpFetcher, IngestionConfig, IngestionPipeline};
//!
//! let config = IngestionConfig::from_env()?;
//! let fetcher = Arc::new(HttpFetcher::new(&config)?);
//! let pipeline = IngestionPipeline::new(fetcher, embeddings, store, config);
//!
//! match pipeline.process(&event).await {
//!     Ok(report) => println!("{} chunks stored", report.chunks_stored),
//!     Err(e) => println!("failed: {}", e), // e.g. "fetch/http: GET … returned 404"
//! }
//! ```

pub mod chunker;
pub mod config;
pub mod error;
pub mod extractors;
pub mod fetcher;
pub mod pipeline;
pub mod resolver;

// Re-exports
pub use chunker::{ChunkingResult, TextChunk, TextChunker};
pub use config::{ConfigError, EmbeddingFailurePolicy, IngestionConfig};
pub use error::{FailureKind, PipelineError, PipelineStage};
pub use extractors::{ContentExtractor, ContentKind, ExtractionResult, ExtractorFactory};
pub use fetcher::{DocumentFetcher, FetchError, FetchedDocument, HttpFetcher};
pub use pipeline::{IngestionPipeline, PipelineReport};
pub use resolver::{is_index_url, resolve_document_url, select_primary_document};
