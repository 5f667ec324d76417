use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

use crate::db::connection::DatabaseConnection;
use crate::db::queries::ChunkRepository;
use crate::models::FilingChunk;

use super::{ensure_dense, ContentStore};

/// Chunk store backed by the SurrealDB `filing_chunks` table.
pub struct SurrealContentStore {
    db: DatabaseConnection,
}

impl SurrealContentStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ContentStore for SurrealContentStore {
    async fn replace_chunks(
        &self,
        ticker: &str,
        source: &str,
        chunks: &[FilingChunk],
    ) -> Result<usize> {
        ensure_dense(chunks, ticker, source)?;

        let written = ChunkRepository::new(&self.db)
            .replace_for_source(ticker, source, chunks)
            .await?;

        debug!("Replaced {}/{} with {} chunks", ticker, source, written);
        Ok(written)
    }

    async fn get_chunks(&self, ticker: &str, source: &str) -> Result<Vec<FilingChunk>> {
        ChunkRepository::new(&self.db).get_by_source(ticker, source).await
    }

    fn store_name(&self) -> &str {
        "surrealdb"
    }
}
