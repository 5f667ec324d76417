//! filing-ingest: ingesta de filings regulatorios
//!
//! Descubre filings nuevos en un feed Atom, los encola en una cola durable
//! con prioridad y los procesa (resolución, descarga, extracción, chunking,
//! embeddings y almacenamiento).

pub mod db;
pub mod embeddings;
pub mod models;
pub mod queue;
pub mod services;
pub mod store;

// Re-exportar tipos principales
pub use db::connection::{DatabaseConnection, DbConfig, SurrealConfig};
pub use models::chunk::FilingChunk;
pub use models::embedding::{EmbeddingModel, EmbeddingVector};
pub use models::event::{DedupeKey, EventSource, EventStatus, IngestionEvent, NewEvent};

// Queue exports
pub use queue::{IngestionQueue, MemoryQueue, PgQueue, QueueConfig, QueueCounts};

// Store exports
pub use store::{ContentStore, MemoryContentStore, SurrealContentStore};

// Embedding service exports
pub use embeddings::{
    EmbeddingConfig, EmbeddingProvider, EmbeddingResult, EmbeddingService,
    MockEmbeddingProvider, OllamaEmbeddingProvider,
};

// Service exports
pub use services::{
    FeedWatcher, IngestionPipeline, IngestionWorker, OnDemandTrigger, PipelineError,
    TriggerOutcome,
};
