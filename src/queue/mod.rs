//! Durable, priority-aware work queue for ingestion events.
//!
//! The queue is the single coordination point between the feed watcher (and
//! on-demand callers) that produce events and the workers that consume them:
//! - `enqueue` is idempotent on the dedupe key `(ticker, form_type, filed_at)`
//! - `claim_next` hands each pending row to exactly one caller, priority rows
//!   first, then oldest first
//! - `complete` / `fail` close the PROCESSING state, but only for the claim
//!   that is still current
//!
//! Two backends implement [`IngestionQueue`]:
//! - [`PgQueue`]: PostgreSQL with `FOR UPDATE SKIP LOCKED` claims
//! - [`MemoryQueue`]: in-process, for tests and single-process runs
//!
//! # Example
//!
//! ```ignore
//! use filing_ingest::queue::{IngestionQueue, MemoryQueue, QueueConfig};
//!
//! let queue = MemoryQueue::new(QueueConfig::default());
//! queue.enqueue(new_event).await?;
//!
//! while let Some(event) = queue.claim_next().await? {
//!     // ... run the pipeline
//!     queue.complete(event.id, event.attempts).await?;
//! }
//! ```

pub mod config;
pub mod memory;
pub mod postgres;

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{DedupeKey, EventStatus, IngestionEvent, NewEvent};

pub use config::QueueConfig;
pub use memory::MemoryQueue;
pub use postgres::PgQueue;

/// Number of rows per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueCounts {
    pub pending: u64,
    pub processing: u64,
    pub completed: u64,
    pub failed: u64,
}

impl QueueCounts {
    /// Adds `n` rows to the bucket for `status`.
    pub fn add(&mut self, status: EventStatus, n: u64) {
        match status {
            EventStatus::Pending => self.pending += n,
            EventStatus::Processing => self.processing += n,
            EventStatus::Completed => self.completed += n,
            EventStatus::Failed => self.failed += n,
        }
    }

    pub fn total(&self) -> u64 {
        self.pending + self.processing + self.completed + self.failed
    }
}

/// Work queue contract shared by the watcher, the workers and the
/// on-demand trigger.
///
/// Every call is its own short transaction; implementations never hold a
/// lock across calls.
#[async_trait]
pub trait IngestionQueue: Send + Sync {
    /// Creates a PENDING event unless one with the same dedupe key exists.
    ///
    /// Returns `true` when a row was written, `false` for a duplicate.
    /// Duplicates are never an error.
    async fn enqueue(&self, event: NewEvent) -> Result<bool>;

    /// Claims the next event and moves it to PROCESSING, bumping `attempts`.
    /// Rows whose claim lease expired are reclaimed first; otherwise pending
    /// rows go priority first, then oldest. `None` means there is nothing to
    /// do right now.
    async fn claim_next(&self) -> Result<Option<IngestionEvent>>;

    /// PROCESSING -> COMPLETED for the claim identified by `attempt` (the
    /// `attempts` value returned by `claim_next`). Returns `false` if the
    /// row is no longer PROCESSING or has been reclaimed since, so a worker
    /// whose lease expired cannot overwrite the current claim.
    async fn complete(&self, id: Uuid, attempt: i32) -> Result<bool>;

    /// PROCESSING -> FAILED with an error message. Same fencing and return
    /// contract as [`IngestionQueue::complete`].
    async fn fail(&self, id: Uuid, attempt: i32, error: &str) -> Result<bool>;

    /// Looks up an event by id.
    async fn get(&self, id: Uuid) -> Result<Option<IngestionEvent>>;

    /// Looks up an event by its dedupe key.
    async fn find_by_key(&self, key: &DedupeKey) -> Result<Option<IngestionEvent>>;

    /// Row counts per status.
    async fn counts(&self) -> Result<QueueCounts>;

    /// Backend name for logging.
    fn backend_name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_add_and_total() {
        let mut counts = QueueCounts::default();
        counts.add(EventStatus::Pending, 3);
        counts.add(EventStatus::Failed, 1);
        counts.add(EventStatus::Pending, 2);

        assert_eq!(counts.pending, 5);
        assert_eq!(counts.failed, 1);
        assert_eq!(counts.total(), 6);
    }
}
