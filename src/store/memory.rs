use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::models::FilingChunk;

use super::{ensure_dense, ContentStore};

/// In-process chunk store.
#[derive(Default)]
pub struct MemoryContentStore {
    sets: RwLock<HashMap<(String, String), Vec<FilingChunk>>>,
    fail_writes: AtomicBool,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent write fail (tests of the storage stage).
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of `(ticker, source)` sets currently stored.
    pub async fn set_count(&self) -> usize {
        self.sets.read().await.len()
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn replace_chunks(
        &self,
        ticker: &str,
        source: &str,
        chunks: &[FilingChunk],
    ) -> Result<usize> {
        if self.fail_writes.load(Ordering::SeqCst) {
            anyhow::bail!("Content store unavailable");
        }
        ensure_dense(chunks, ticker, source)?;

        let key = (ticker.to_string(), source.to_string());
        let mut sets = self.sets.write().await;
        if chunks.is_empty() {
            sets.remove(&key);
        } else {
            sets.insert(key, chunks.to_vec());
        }
        Ok(chunks.len())
    }

    async fn get_chunks(&self, ticker: &str, source: &str) -> Result<Vec<FilingChunk>> {
        let key = (ticker.to_string(), source.to_string());
        Ok(self.sets.read().await.get(&key).cloned().unwrap_or_default())
    }

    fn store_name(&self) -> &str {
        "memory"
    }
}
