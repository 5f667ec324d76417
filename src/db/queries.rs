use super::connection::DatabaseConnection;
use crate::models::FilingChunk;
use anyhow::{Context, Result};

/// Repositorio de chunks de filings
pub struct ChunkRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> ChunkRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// Reemplaza todos los chunks de (ticker, source) en una sola transacción.
    /// Si falla, los chunks anteriores permanecen intactos.
    pub async fn replace_for_source(
        &self,
        ticker: &str,
        source: &str,
        chunks: &[FilingChunk],
    ) -> Result<usize> {
        let query = if chunks.is_empty() {
            r#"
            BEGIN TRANSACTION;
            DELETE filing_chunks WHERE ticker = $ticker AND source = $source;
            COMMIT TRANSACTION;
            "#
        } else {
            r#"
            BEGIN TRANSACTION;
            DELETE filing_chunks WHERE ticker = $ticker AND source = $source;
            INSERT INTO filing_chunks $chunks;
            COMMIT TRANSACTION;
            "#
        };

        self.db
            .query(query)
            .bind(("ticker", ticker))
            .bind(("source", source))
            .bind(("chunks", chunks))
            .await
            .with_context(|| format!("Failed to replace chunks for {}/{}", ticker, source))?
            .check()
            .with_context(|| format!("Chunk replacement rejected for {}/{}", ticker, source))?;

        Ok(chunks.len())
    }

    /// Obtiene los chunks de (ticker, source) ordenados por índice
    pub async fn get_by_source(&self, ticker: &str, source: &str) -> Result<Vec<FilingChunk>> {
        let query = r#"
            SELECT ticker, source, chunk_index, content, embedding
            FROM filing_chunks
            WHERE ticker = $ticker AND source = $source
            ORDER BY chunk_index ASC
        "#;

        let mut result = self
            .db
            .query(query)
            .bind(("ticker", ticker))
            .bind(("source", source))
            .await
            .context("Failed to query chunks by source")?;

        let chunks: Vec<FilingChunk> = result.take(0)?;
        Ok(chunks)
    }
}
