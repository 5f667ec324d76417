//! Business services for filing ingestion.
//!
//! This module provides:
//! - **Feed**: polls the filings feed and enqueues new events
//! - **Ingestion**: the resolve/fetch/extract/chunk/embed/store pipeline
//! - **Worker**: claims queued events and runs the pipeline on them
//! - **Trigger**: synchronous on-demand requests for one filing
//!
//! # Worker
//!
//! ```ignore
//! use filing_ingest::services::{IngestionWorker, WorkerConfig};
//!
//! let worker = Arc::new(IngestionWorker::new(queue, pipeline, WorkerConfig::from_env()));
//! let handle = worker.start();
//! ```
//!
//! # On-demand trigger
//!
//! ```ignore
//! use filing_ingest::services::{OnDemandTrigger, TriggerConfig, TriggerOutcome};
//!
//! let trigger = OnDemandTrigger::new(queue, TriggerConfig::from_env());
//! match trigger.request("EX", "0000123456", url, "10-K", filed_at).await? {
//!     TriggerOutcome::Completed => { /* read chunks */ }
//!     _ => { /* fall back */ }
//! }
//! ```

pub mod config;
pub mod feed;
pub mod ingestion;
pub mod trigger;
pub mod worker;

// Re-exports
pub use config::{TriggerConfig, WorkerConfig};
pub use feed::{FeedWatcher, PollStats, WatcherConfig, WatcherContext};
pub use trigger::{OnDemandTrigger, TriggerOutcome};
pub use worker::{IngestionWorker, WorkOutcome};

// Ingestion re-exports
pub use ingestion::{
    EmbeddingFailurePolicy, FailureKind, HttpFetcher, IngestionConfig, IngestionPipeline,
    PipelineError, PipelineReport, PipelineStage, TextChunk, TextChunker,
};
