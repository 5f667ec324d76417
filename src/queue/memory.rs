//! In-process queue backend.
//!
//! Every operation runs under one async mutex, which gives the same
//! guarantees the PostgreSQL backend gets from row locks: a claim is atomic
//! and no two callers ever receive the same row.

use std::cmp::Ordering;
use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::models::{DedupeKey, EventStatus, IngestionEvent, NewEvent};

use super::{IngestionQueue, QueueConfig, QueueCounts};

struct Entry {
    event: IngestionEvent,
    /// Insertion order, breaks `created_at` ties.
    seq: u64,
}

#[derive(Default)]
struct MemoryState {
    events: HashMap<Uuid, Entry>,
    by_key: HashMap<DedupeKey, Uuid>,
    next_seq: u64,
}

/// Queue kept in process memory.
pub struct MemoryQueue {
    config: QueueConfig,
    state: Mutex<MemoryState>,
}

impl MemoryQueue {
    pub fn new(config: QueueConfig) -> Self {
        Self {
            config,
            state: Mutex::new(MemoryState::default()),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(QueueConfig::default())
    }

    /// Snapshot of every event, oldest first.
    pub async fn snapshot(&self) -> Vec<IngestionEvent> {
        let state = self.state.lock().await;
        let mut entries: Vec<&Entry> = state.events.values().collect();
        entries.sort_by_key(|e| e.seq);
        entries.into_iter().map(|e| e.event.clone()).collect()
    }

    /// PROCESSING rows last touched before this instant may be reclaimed.
    fn stale_before(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let ttl = chrono::Duration::from_std(self.config.claim_ttl?).ok()?;
        now.checked_sub_signed(ttl)
    }

    /// Moves a PROCESSING row to a terminal state if `attempt` is still the
    /// current claim.
    async fn finish(
        &self,
        id: Uuid,
        attempt: i32,
        status: EventStatus,
        error: Option<&str>,
    ) -> Result<bool> {
        let mut state = self.state.lock().await;
        let Some(entry) = state.events.get_mut(&id) else {
            return Ok(false);
        };

        if entry.event.status != EventStatus::Processing || entry.event.attempts != attempt {
            return Ok(false);
        }

        entry.event.status = status;
        entry.event.error_message = error.map(|e| e.to_string());
        entry.event.updated_at = Utc::now();
        Ok(true)
    }
}

/// Priority rows first, then oldest, then insertion order.
fn claim_order(a: &Entry, b: &Entry) -> Ordering {
    b.event
        .is_priority
        .cmp(&a.event.is_priority)
        .then(a.event.created_at.cmp(&b.event.created_at))
        .then(a.seq.cmp(&b.seq))
}

#[async_trait]
impl IngestionQueue for MemoryQueue {
    async fn enqueue(&self, event: NewEvent) -> Result<bool> {
        let key = event.dedupe_key();
        let mut state = self.state.lock().await;

        if let Some(existing_id) = state.by_key.get(&key).copied() {
            if self.config.retry_failed_on_rediscovery {
                if let Some(entry) = state.events.get_mut(&existing_id) {
                    if entry.event.status == EventStatus::Failed {
                        entry.event.status = EventStatus::Pending;
                        entry.event.error_message = None;
                        entry.event.is_priority |= event.is_priority;
                        entry.event.updated_at = Utc::now();
                        debug!("Reset failed event {} ({}) to pending", existing_id, key);
                        return Ok(true);
                    }
                }
            }
            debug!("Duplicate enqueue ignored for {}", key);
            return Ok(false);
        }

        let seq = state.next_seq;
        state.next_seq += 1;

        let event = IngestionEvent::from_new(event, Utc::now());
        let id = event.id;
        state.by_key.insert(key, id);
        state.events.insert(id, Entry { event, seq });
        Ok(true)
    }

    async fn claim_next(&self) -> Result<Option<IngestionEvent>> {
        let now = Utc::now();
        let stale_before = self.stale_before(now);
        let mut state = self.state.lock().await;

        // Expired claims first, then pending rows
        let stale = |entry: &&Entry| {
            entry.event.status == EventStatus::Processing
                && matches!(stale_before, Some(cutoff) if entry.event.updated_at <= cutoff)
        };
        let pending = |entry: &&Entry| entry.event.status == EventStatus::Pending;
        let next_matching = |filter: &dyn Fn(&&Entry) -> bool| {
            state
                .events
                .values()
                .filter(|e| filter(e))
                .min_by(|a, b| claim_order(a, b))
                .map(|e| e.event.id)
        };
        let target = next_matching(&stale).or_else(|| next_matching(&pending));

        let Some(entry) = target.and_then(|id| state.events.get_mut(&id)) else {
            return Ok(None);
        };

        entry.event.status = EventStatus::Processing;
        entry.event.updated_at = now;
        entry.event.attempts += 1;
        Ok(Some(entry.event.clone()))
    }

    async fn complete(&self, id: Uuid, attempt: i32) -> Result<bool> {
        self.finish(id, attempt, EventStatus::Completed, None).await
    }

    async fn fail(&self, id: Uuid, attempt: i32, error: &str) -> Result<bool> {
        self.finish(id, attempt, EventStatus::Failed, Some(error)).await
    }

    async fn get(&self, id: Uuid) -> Result<Option<IngestionEvent>> {
        let state = self.state.lock().await;
        Ok(state.events.get(&id).map(|e| e.event.clone()))
    }

    async fn find_by_key(&self, key: &DedupeKey) -> Result<Option<IngestionEvent>> {
        let state = self.state.lock().await;
        Ok(state
            .by_key
            .get(key)
            .and_then(|id| state.events.get(id))
            .map(|e| e.event.clone()))
    }

    async fn counts(&self) -> Result<QueueCounts> {
        let state = self.state.lock().await;
        let mut counts = QueueCounts::default();
        for entry in state.events.values() {
            counts.add(entry.event.status, 1);
        }
        Ok(counts)
    }

    fn backend_name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EventSource;
    use chrono::TimeZone;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::time::Duration;

    fn filing(ticker: &str, form: &str, day: u32) -> NewEvent {
        NewEvent::new(
            ticker,
            "0000123456",
            format!("https://example.test/{ticker}/{form}/{day}/index.htm"),
            form,
            Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_enqueue_is_idempotent() {
        let queue = MemoryQueue::with_defaults();

        assert!(queue.enqueue(filing("EX", "10-K", 1)).await.unwrap());
        for _ in 0..5 {
            assert!(!queue.enqueue(filing("EX", "10-K", 1)).await.unwrap());
        }

        assert_eq!(queue.counts().await.unwrap().total(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_does_not_touch_existing_row() {
        let queue = MemoryQueue::with_defaults();
        queue.enqueue(filing("EX", "10-K", 1)).await.unwrap();
        let claimed = queue.claim_next().await.unwrap().unwrap();
        queue.complete(claimed.id, claimed.attempts).await.unwrap();

        let duplicate = filing("EX", "10-K", 1)
            .with_priority(true)
            .with_source(EventSource::Manual);
        assert!(!queue.enqueue(duplicate).await.unwrap());

        let stored = queue.get(claimed.id).await.unwrap().unwrap();
        assert_eq!(stored.status, EventStatus::Completed);
        assert!(!stored.is_priority);
        assert_eq!(stored.source, EventSource::Feed);
    }

    #[tokio::test]
    async fn test_claim_empty_queue_returns_none() {
        let queue = MemoryQueue::with_defaults();
        assert!(queue.claim_next().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_priority_beats_age() {
        let queue = MemoryQueue::with_defaults();
        queue.enqueue(filing("OLD", "10-K", 1)).await.unwrap();
        queue
            .enqueue(filing("NEW", "8-K", 2).with_priority(true))
            .await
            .unwrap();

        let first = queue.claim_next().await.unwrap().unwrap();
        assert_eq!(first.ticker, "NEW");
        let second = queue.claim_next().await.unwrap().unwrap();
        assert_eq!(second.ticker, "OLD");
    }

    #[tokio::test]
    async fn test_fifo_within_tier() {
        let queue = MemoryQueue::with_defaults();
        queue.enqueue(filing("A", "10-K", 5)).await.unwrap();
        queue.enqueue(filing("B", "10-K", 1)).await.unwrap();
        queue.enqueue(filing("C", "10-K", 3)).await.unwrap();

        let mut order = Vec::new();
        while let Some(event) = queue.claim_next().await.unwrap() {
            order.push(event.ticker);
        }
        // Orden de llegada, no de filed_at
        assert_eq!(order, vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn test_claim_moves_to_processing() {
        let queue = MemoryQueue::with_defaults();
        queue.enqueue(filing("EX", "10-K", 1)).await.unwrap();

        let claimed = queue.claim_next().await.unwrap().unwrap();
        assert_eq!(claimed.status, EventStatus::Processing);
        assert_eq!(claimed.attempts, 1);
        assert!(claimed.updated_at >= claimed.created_at);

        // Nothing else is claimable while the lease is fresh
        assert!(queue.claim_next().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_claims_are_exclusive() {
        let queue = Arc::new(MemoryQueue::with_defaults());
        for day in 1..=20 {
            queue.enqueue(filing("EX", "8-K", day)).await.unwrap();
        }

        let mut handles = Vec::new();
        for _ in 0..16 {
            let queue = queue.clone();
            handles.push(tokio::spawn(async move { queue.claim_next().await.unwrap() }));
        }

        let mut ids = HashSet::new();
        for handle in handles {
            let event = handle.await.unwrap().expect("M >= N, every caller gets a row");
            assert!(ids.insert(event.id), "row handed out twice");
        }
        assert_eq!(ids.len(), 16);
        assert_eq!(queue.counts().await.unwrap().pending, 4);
    }

    #[tokio::test]
    async fn test_complete_and_fail_transitions() {
        let queue = MemoryQueue::with_defaults();
        queue.enqueue(filing("A", "10-K", 1)).await.unwrap();
        queue.enqueue(filing("B", "10-K", 1)).await.unwrap();

        let a = queue.claim_next().await.unwrap().unwrap();
        let b = queue.claim_next().await.unwrap().unwrap();

        assert!(queue.complete(a.id, a.attempts).await.unwrap());
        assert!(queue.fail(b.id, b.attempts, "fetch/http: status 404").await.unwrap());

        let a = queue.get(a.id).await.unwrap().unwrap();
        let b = queue.get(b.id).await.unwrap().unwrap();
        assert_eq!(a.status, EventStatus::Completed);
        assert!(a.error_message.is_none());
        assert_eq!(b.status, EventStatus::Failed);
        assert_eq!(b.error_message.as_deref(), Some("fetch/http: status 404"));

        let counts = queue.counts().await.unwrap();
        assert_eq!(counts.completed, 1);
        assert_eq!(counts.failed, 1);
    }

    #[tokio::test]
    async fn test_finish_requires_processing() {
        let queue = MemoryQueue::with_defaults();
        queue.enqueue(filing("EX", "10-K", 1)).await.unwrap();
        let pending = queue
            .find_by_key(&filing("EX", "10-K", 1).dedupe_key())
            .await
            .unwrap()
            .unwrap();

        assert!(!queue.complete(pending.id, pending.attempts).await.unwrap());
        assert!(!queue.fail(Uuid::new_v4(), 1, "missing").await.unwrap());
        assert_eq!(
            queue.get(pending.id).await.unwrap().unwrap().status,
            EventStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_failed_event_not_retried_by_default() {
        let queue = MemoryQueue::with_defaults();
        queue.enqueue(filing("EX", "10-K", 1)).await.unwrap();
        let claimed = queue.claim_next().await.unwrap().unwrap();
        queue.fail(claimed.id, claimed.attempts, "boom").await.unwrap();

        assert!(!queue.enqueue(filing("EX", "10-K", 1)).await.unwrap());
        assert!(queue.claim_next().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failed_event_reset_when_enabled() {
        let queue =
            MemoryQueue::new(QueueConfig::default().with_retry_failed_on_rediscovery(true));
        queue.enqueue(filing("EX", "10-K", 1)).await.unwrap();
        let claimed = queue.claim_next().await.unwrap().unwrap();
        queue.fail(claimed.id, claimed.attempts, "boom").await.unwrap();

        assert!(queue.enqueue(filing("EX", "10-K", 1)).await.unwrap());

        let again = queue.claim_next().await.unwrap().unwrap();
        assert_eq!(again.id, claimed.id);
        assert_eq!(again.attempts, 2);
        assert!(again.error_message.is_none());
        assert_eq!(queue.counts().await.unwrap().total(), 1);
    }

    #[tokio::test]
    async fn test_completed_event_never_reset() {
        let queue =
            MemoryQueue::new(QueueConfig::default().with_retry_failed_on_rediscovery(true));
        queue.enqueue(filing("EX", "10-K", 1)).await.unwrap();
        let claimed = queue.claim_next().await.unwrap().unwrap();
        queue.complete(claimed.id, claimed.attempts).await.unwrap();

        assert!(!queue.enqueue(filing("EX", "10-K", 1)).await.unwrap());
    }

    #[tokio::test]
    async fn test_stale_processing_row_is_reclaimed() {
        let queue = MemoryQueue::new(
            QueueConfig::default().with_claim_ttl(Some(Duration::from_millis(20))),
        );
        queue.enqueue(filing("EX", "10-K", 1)).await.unwrap();

        let first = queue.claim_next().await.unwrap().unwrap();
        assert!(queue.claim_next().await.unwrap().is_none());

        tokio::time::sleep(Duration::from_millis(50)).await;

        let second = queue.claim_next().await.unwrap().unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.attempts, 2);
    }

    #[tokio::test]
    async fn test_expired_claim_cannot_finish_reclaimed_row() {
        let queue = MemoryQueue::new(
            QueueConfig::default().with_claim_ttl(Some(Duration::from_millis(20))),
        );
        queue.enqueue(filing("EX", "10-K", 1)).await.unwrap();

        let first = queue.claim_next().await.unwrap().unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;
        let second = queue.claim_next().await.unwrap().unwrap();
        assert_eq!(second.id, first.id);

        // The first worker's late result is rejected
        assert!(!queue
            .fail(first.id, first.attempts, "stale worker error")
            .await
            .unwrap());
        assert!(!queue.complete(first.id, first.attempts).await.unwrap());
        let current = queue.get(first.id).await.unwrap().unwrap();
        assert_eq!(current.status, EventStatus::Processing);
        assert!(current.error_message.is_none());

        assert!(queue.complete(second.id, second.attempts).await.unwrap());
        let done = queue.get(first.id).await.unwrap().unwrap();
        assert_eq!(done.status, EventStatus::Completed);
        assert!(done.error_message.is_none());
    }

    #[tokio::test]
    async fn test_stale_claim_reclaimed_before_pending_rows() {
        let queue = MemoryQueue::new(
            QueueConfig::default().with_claim_ttl(Some(Duration::from_millis(20))),
        );
        queue.enqueue(filing("OLD", "10-K", 1)).await.unwrap();
        let stuck = queue.claim_next().await.unwrap().unwrap();

        queue
            .enqueue(filing("NEW", "8-K", 2).with_priority(true))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;

        let next = queue.claim_next().await.unwrap().unwrap();
        assert_eq!(next.id, stuck.id);
        let after = queue.claim_next().await.unwrap().unwrap();
        assert_eq!(after.ticker, "NEW");
    }

    #[tokio::test]
    async fn test_no_reclaim_without_ttl() {
        let queue = MemoryQueue::new(QueueConfig::default().with_claim_ttl(None));
        queue.enqueue(filing("EX", "10-K", 1)).await.unwrap();
        queue.claim_next().await.unwrap().unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(queue.claim_next().await.unwrap().is_none());
        assert_eq!(queue.counts().await.unwrap().processing, 1);
    }

    #[tokio::test]
    async fn test_snapshot_in_insertion_order() {
        let queue = MemoryQueue::with_defaults();
        queue.enqueue(filing("A", "10-K", 1)).await.unwrap();
        queue.enqueue(filing("B", "10-K", 1)).await.unwrap();

        let tickers: Vec<String> = queue.snapshot().await.into_iter().map(|e| e.ticker).collect();
        assert_eq!(tickers, vec!["A", "B"]);
        assert_eq!(queue.backend_name(), "memory");
    }
}
