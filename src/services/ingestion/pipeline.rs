//! The per-event ingestion pipeline: resolve → fetch → extract → chunk →
//! embed → store.

use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::embeddings::EmbeddingService;
use crate::models::{EmbeddingVector, FilingChunk, IngestionEvent};
use crate::store::ContentStore;

use super::chunker::TextChunker;
use super::config::{EmbeddingFailurePolicy, IngestionConfig};
use super::error::{FailureKind, PipelineError, PipelineStage};
use super::extractors::{ContentKind, ExtractorFactory};
use super::fetcher::DocumentFetcher;
use super::resolver::resolve_document_url;

/// Summary of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineReport {
    /// Document actually ingested (after index resolution).
    pub document_url: String,
    /// Characters of extracted text.
    pub characters: usize,
    /// Chunks produced by the chunker.
    pub chunks_total: usize,
    /// Chunks written to the store.
    pub chunks_stored: usize,
    /// Chunks omitted because their embedding failed.
    pub chunks_dropped: usize,
    pub duration_ms: u64,
}

/// Stateless pipeline shared by all workers.
pub struct IngestionPipeline {
    fetcher: Arc<dyn DocumentFetcher>,
    embeddings: Arc<EmbeddingService>,
    store: Arc<dyn ContentStore>,
    chunker: TextChunker,
    config: IngestionConfig,
}

impl IngestionPipeline {
    pub fn new(
        fetcher: Arc<dyn DocumentFetcher>,
        embeddings: Arc<EmbeddingService>,
        store: Arc<dyn ContentStore>,
        config: IngestionConfig,
    ) -> Self {
        Self {
            fetcher,
            embeddings,
            store,
            chunker: TextChunker::from_config(&config),
            config,
        }
    }

    /// Runs every stage for `event`. Any error leaves the previously stored
    /// chunk set for `(ticker, form_type)` untouched.
    pub async fn process(&self, event: &IngestionEvent) -> Result<PipelineReport, PipelineError> {
        let start = Instant::now();

        // 1. Resolve
        let document_url =
            resolve_document_url(self.fetcher.as_ref(), &event.document_url).await?;
        debug!("Event {} resolved to {}", event.id, document_url);

        // 2. Fetch
        let document = self
            .fetcher
            .fetch(&document_url)
            .await
            .map_err(|e| e.at(PipelineStage::Fetch))?;

        // 3. Extract
        let kind = ContentKind::detect(document.content_type.as_deref(), document.url.as_str());
        let extractor = ExtractorFactory::create(kind).ok_or_else(|| {
            PipelineError::new(
                PipelineStage::Extract,
                FailureKind::Parse,
                format!(
                    "unsupported content type {} for {}",
                    document.content_type.as_deref().unwrap_or("(none)"),
                    document.url
                ),
            )
        })?;
        let extraction = extractor.extract(&document.body).map_err(|e| {
            PipelineError::from_anyhow(PipelineStage::Extract, FailureKind::Parse, &e)
        })?;
        for warning in &extraction.warnings {
            warn!("Event {}: {}", event.id, warning);
        }
        if extraction.is_empty() {
            return Err(PipelineError::new(
                PipelineStage::Extract,
                FailureKind::Empty,
                format!("no text extracted from {}", document.url),
            ));
        }
        let characters = extraction.char_count();

        // 4. Chunk
        let chunking = self.chunker.chunk(&extraction.text);
        if chunking.count() == 0 {
            return Err(PipelineError::new(
                PipelineStage::Chunk,
                FailureKind::Empty,
                "chunker produced no chunks",
            ));
        }
        let chunks_total = chunking.count();
        debug!(
            "Event {}: {} chars -> {} chunks",
            event.id, characters, chunks_total
        );

        // 5. Embed
        let contents: Vec<String> = chunking.chunks.into_iter().map(|c| c.content).collect();
        let (embedded, chunks_dropped) = self.embed_all(event, contents).await?;

        // 6. Store
        let chunks: Vec<FilingChunk> = embedded
            .into_iter()
            .enumerate()
            .map(|(i, (content, vector))| {
                FilingChunk::new(&event.ticker, &event.form_type, i as u32, content)
                    .with_embedding(vector)
            })
            .collect();

        let chunks_stored = self
            .store
            .replace_chunks(&event.ticker, &event.form_type, &chunks)
            .await
            .map_err(|e| {
                PipelineError::from_anyhow(PipelineStage::Store, FailureKind::Storage, &e)
            })?;

        let report = PipelineReport {
            document_url: document_url.to_string(),
            characters,
            chunks_total,
            chunks_stored,
            chunks_dropped,
            duration_ms: start.elapsed().as_millis() as u64,
        };

        info!(
            "Event {} ({} {}) ingested: {} chunks stored in {}, {} dropped ({}ms)",
            event.id,
            event.ticker,
            event.form_type,
            report.chunks_stored,
            self.store.store_name(),
            report.chunks_dropped,
            report.duration_ms
        );

        Ok(report)
    }

    /// Embeds chunks `embed_batch_size` at a time, one call per chunk.
    /// Returns the kept `(content, vector)` pairs in order and the number
    /// of dropped chunks.
    async fn embed_all(
        &self,
        event: &IngestionEvent,
        contents: Vec<String>,
    ) -> Result<(Vec<(String, EmbeddingVector)>, usize), PipelineError> {
        let total = contents.len();
        let mut kept = Vec::with_capacity(total);
        let mut dropped = 0;
        let batch_size = self.config.embed_batch_size.max(1);

        let mut remaining = contents.into_iter().enumerate().peekable();
        while remaining.peek().is_some() {
            let batch: Vec<(usize, String)> = remaining.by_ref().take(batch_size).collect();
            let results = join_all(batch.iter().map(|(_, text)| self.embeddings.embed(text))).await;

            for ((index, content), result) in batch.into_iter().zip(results) {
                match result {
                    Ok(vector) => kept.push((content, vector)),
                    Err(e) => match self.config.embedding_failure_policy {
                        EmbeddingFailurePolicy::Fail => {
                            return Err(PipelineError::new(
                                PipelineStage::Embed,
                                FailureKind::Embedding,
                                format!("chunk {}: {:#}", index, e),
                            ));
                        }
                        EmbeddingFailurePolicy::Drop => {
                            warn!("Event {}: dropping chunk {}: {:#}", event.id, index, e);
                            dropped += 1;
                        }
                    },
                }
            }
        }

        // Storing an empty set would wipe the previous content
        if kept.is_empty() {
            return Err(PipelineError::new(
                PipelineStage::Embed,
                FailureKind::Embedding,
                format!("all {} chunk embeddings failed", total),
            ));
        }

        if dropped > 0 {
            warn!(
                "Event {}: {} of {} chunks dropped after embedding failures",
                event.id, dropped, total
            );
        }

        Ok((kept, dropped))
    }
}
