//! Chunk sink for processed filings.
//!
//! A store keeps, per `(ticker, source)`, exactly the chunk set written by
//! the most recent successful [`ContentStore::replace_chunks`] call.

pub mod memory;
pub mod surreal;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{is_dense_set, FilingChunk};

pub use memory::MemoryContentStore;
pub use surreal::SurrealContentStore;

#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Atomically replaces every chunk of `(ticker, source)` with `chunks`.
    /// On error the previous set is left in place. Returns the number of
    /// chunks written.
    async fn replace_chunks(
        &self,
        ticker: &str,
        source: &str,
        chunks: &[FilingChunk],
    ) -> Result<usize>;

    /// Chunks of `(ticker, source)` ordered by `chunk_index`.
    async fn get_chunks(&self, ticker: &str, source: &str) -> Result<Vec<FilingChunk>>;

    /// Backend name for logging.
    fn store_name(&self) -> &str;
}

/// Rejects chunk sets that are not dense `0..n-1` for `(ticker, source)`.
pub(crate) fn ensure_dense(chunks: &[FilingChunk], ticker: &str, source: &str) -> Result<()> {
    if !is_dense_set(chunks, ticker, source) {
        anyhow::bail!(
            "Chunk set for {}/{} is not a dense 0..{} sequence",
            ticker,
            source,
            chunks.len()
        );
    }
    Ok(())
}
