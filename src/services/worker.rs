//! Ingestion worker: claims queued events and runs the pipeline on them.
//!
//! Any number of workers may run against one queue; the queue's claim
//! guarantees each event is processed by a single worker at a time.

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::queue::IngestionQueue;

use super::config::WorkerConfig;
use super::ingestion::{IngestionPipeline, PipelineReport};

/// Result of processing one claimed event.
#[derive(Debug, Clone)]
pub enum WorkOutcome {
    Completed { id: Uuid, report: PipelineReport },
    Failed { id: Uuid, error: String },
}

impl WorkOutcome {
    pub fn id(&self) -> Uuid {
        match self {
            WorkOutcome::Completed { id, .. } | WorkOutcome::Failed { id, .. } => *id,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, WorkOutcome::Completed { .. })
    }
}

pub struct IngestionWorker {
    queue: Arc<dyn IngestionQueue>,
    pipeline: Arc<IngestionPipeline>,
    config: WorkerConfig,
    name: String,
}

impl IngestionWorker {
    pub fn new(
        queue: Arc<dyn IngestionQueue>,
        pipeline: Arc<IngestionPipeline>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            queue,
            pipeline,
            config,
            name: "worker".to_string(),
        }
    }

    /// Builder: name used in log lines.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Claims and processes at most one event.
    ///
    /// `Ok(None)` means the queue had nothing claimable. Pipeline failures are
    /// recorded on the event and returned as [`WorkOutcome::Failed`]; only
    /// queue errors surface as `Err`.
    pub async fn run_once(&self) -> Result<Option<WorkOutcome>> {
        let Some(event) = self.queue.claim_next().await? else {
            return Ok(None);
        };

        info!(
            "[{}] Claimed event {} ({} {}, attempt {})",
            self.name, event.id, event.ticker, event.form_type, event.attempts
        );

        match self.pipeline.process(&event).await {
            Ok(report) => {
                if !self.queue.complete(event.id, event.attempts).await? {
                    warn!(
                        "[{}] Claim on event {} expired or was taken over; completion not recorded",
                        self.name, event.id
                    );
                }
                info!(
                    "[{}] Event {} completed: {} chunks stored, {} dropped ({} ms)",
                    self.name,
                    event.id,
                    report.chunks_stored,
                    report.chunks_dropped,
                    report.duration_ms
                );
                Ok(Some(WorkOutcome::Completed {
                    id: event.id,
                    report,
                }))
            }
            Err(e) => {
                let message = e.to_string();
                warn!(
                    "[{}] Event {} ({} {}) failed: {}",
                    self.name, event.id, event.ticker, event.form_type, message
                );
                if !self.queue.fail(event.id, event.attempts, &message).await? {
                    warn!(
                        "[{}] Claim on event {} expired or was taken over; failure not recorded",
                        self.name, event.id
                    );
                }
                Ok(Some(WorkOutcome::Failed {
                    id: event.id,
                    error: message,
                }))
            }
        }
    }

    /// Starts the worker loop in the background.
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                "[{}] Worker started (queue: {}, poll interval: {}s)",
                self.name,
                self.queue.backend_name(),
                self.config.poll_interval.as_secs()
            );

            loop {
                match self.run_once().await {
                    // Keep draining while there is work
                    Ok(Some(_)) => continue,
                    Ok(None) => match self.queue.counts().await {
                        Ok(counts) => debug!(
                            "[{}] Queue idle ({} completed, {} failed, {} processing)",
                            self.name, counts.completed, counts.failed, counts.processing
                        ),
                        Err(e) => debug!("[{}] Queue empty; counts unavailable: {:#}", self.name, e),
                    },
                    Err(e) => {
                        error!("[{}] Queue error: {:#}", self.name, e);
                    }
                }
                tokio::time::sleep(self.config.poll_interval).await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::{EmbeddingConfig, EmbeddingService, MockEmbeddingProvider};
    use crate::models::{EmbeddingModel, EventStatus, NewEvent};
    use crate::queue::MemoryQueue;
    use crate::services::ingestion::{
        DocumentFetcher, FetchError, FetchedDocument, IngestionConfig,
    };
    use crate::store::{ContentStore, MemoryContentStore};
    use async_trait::async_trait;
    use chrono::Utc;
    use url::Url;

    const DOC_URL: &str = "https://example.test/0000123456/report.txt";

    /// Serves one plain-text document; everything else is a 404.
    struct OneDocument;

    #[async_trait]
    impl DocumentFetcher for OneDocument {
        async fn fetch(&self, url: &Url) -> Result<FetchedDocument, FetchError> {
            if url.as_str() == DOC_URL {
                Ok(FetchedDocument {
                    url: url.clone(),
                    content_type: Some("text/plain".to_string()),
                    body: "Revenue grew in every segment during the year.".into(),
                })
            } else {
                Err(FetchError::Status {
                    url: url.to_string(),
                    status: 404,
                })
            }
        }
    }

    fn setup() -> (IngestionWorker, Arc<MemoryQueue>, Arc<MemoryContentStore>) {
        let queue = Arc::new(MemoryQueue::with_defaults());
        let store = Arc::new(MemoryContentStore::new());
        let embed_config =
            EmbeddingConfig::with_model(EmbeddingModel::Custom("mock".into())).with_dimension(8);
        let provider =
            MockEmbeddingProvider::new(EmbeddingModel::Custom("mock".into())).with_dimension(8);
        let embeddings = Arc::new(EmbeddingService::new(Arc::new(provider), embed_config));
        let pipeline = Arc::new(IngestionPipeline::new(
            Arc::new(OneDocument),
            embeddings,
            store.clone(),
            IngestionConfig::new().with_chunking(20, 5),
        ));
        let worker = IngestionWorker::new(queue.clone(), pipeline, WorkerConfig::default());
        (worker, queue, store)
    }

    fn new_event(ticker: &str, url: &str) -> NewEvent {
        NewEvent::new(ticker, "0000123456", url, "10-K", Utc::now())
    }

    #[tokio::test]
    async fn test_empty_queue_returns_none() {
        let (worker, _, _) = setup();
        assert!(worker.run_once().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_success_marks_completed() {
        let (worker, queue, store) = setup();
        queue.enqueue(new_event("EX", DOC_URL)).await.unwrap();

        let outcome = worker.run_once().await.unwrap().unwrap();
        assert!(outcome.is_completed());

        let event = queue.get(outcome.id()).await.unwrap().unwrap();
        assert_eq!(event.status, EventStatus::Completed);
        assert!(event.error_message.is_none());

        let chunks = store.get_chunks("EX", "10-K").await.unwrap();
        assert!(!chunks.is_empty());
        assert!(chunks.iter().enumerate().all(|(i, c)| c.chunk_index as usize == i));
    }

    #[tokio::test]
    async fn test_pipeline_error_marks_failed() {
        let (worker, queue, store) = setup();
        queue
            .enqueue(new_event("EX", "https://example.test/missing.txt"))
            .await
            .unwrap();

        let outcome = worker.run_once().await.unwrap().unwrap();
        let WorkOutcome::Failed { id, error } = outcome else {
            panic!("expected failure");
        };
        assert!(error.starts_with("fetch/http"));

        let event = queue.get(id).await.unwrap().unwrap();
        assert_eq!(event.status, EventStatus::Failed);
        assert_eq!(event.error_message.as_deref(), Some(error.as_str()));
        assert_eq!(store.set_count().await, 0);
    }

    #[tokio::test]
    async fn test_bad_event_does_not_stop_the_next() {
        let (worker, queue, _) = setup();
        queue
            .enqueue(new_event("BAD", "https://example.test/missing.txt"))
            .await
            .unwrap();
        queue.enqueue(new_event("EX", DOC_URL)).await.unwrap();

        let first = worker.run_once().await.unwrap().unwrap();
        let second = worker.run_once().await.unwrap().unwrap();
        assert!(!first.is_completed());
        assert!(second.is_completed());

        let counts = queue.counts().await.unwrap();
        assert_eq!(counts.completed, 1);
        assert_eq!(counts.failed, 1);
        assert_eq!(counts.pending, 0);
    }
}
