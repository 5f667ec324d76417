//! Feed watcher: polls the filings feed and enqueues new events.

use std::num::NonZeroUsize;
use std::sync::Arc;

use anyhow::{Context, Result};
use lru::LruCache;
use tokio::sync::{Mutex, RwLock};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::models::{EventSource, NewEvent};
use crate::queue::IngestionQueue;

use super::atom::{FeedEntry, FeedSource};
use super::config::WatcherConfig;
use super::tickers::{TickerMap, TickerSource};
use super::title::parse_title;

/// Process-local watcher state, created once at startup.
///
/// Neither cache is authoritative: the queue's dedupe key decides whether an
/// event is new, so losing this state only costs redundant enqueue calls.
pub struct WatcherContext {
    seen: Mutex<LruCache<String, ()>>,
    tickers: RwLock<Option<Arc<TickerMap>>>,
    ticker_source: Arc<dyn TickerSource>,
}

impl WatcherContext {
    pub fn new(ticker_source: Arc<dyn TickerSource>, seen_capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(seen_capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            seen: Mutex::new(LruCache::new(capacity)),
            tickers: RwLock::new(None),
            ticker_source,
        }
    }

    /// Whether `id` was handled in an earlier cycle (refreshes its recency).
    pub async fn is_seen(&self, id: &str) -> bool {
        self.seen.lock().await.get(id).is_some()
    }

    pub async fn mark_seen(&self, id: &str) {
        self.seen.lock().await.put(id.to_string(), ());
    }

    pub async fn seen_len(&self) -> usize {
        self.seen.lock().await.len()
    }

    /// Loads the ticker map on first use and caches it. A failed load is
    /// not cached.
    pub async fn tickers(&self) -> Result<Arc<TickerMap>> {
        if let Some(map) = self.tickers.read().await.as_ref() {
            return Ok(map.clone());
        }

        let mut slot = self.tickers.write().await;
        // Another caller may have loaded it while we waited
        if let Some(map) = slot.as_ref() {
            return Ok(map.clone());
        }

        let map = Arc::new(self.ticker_source.load().await?);
        *slot = Some(map.clone());
        Ok(map)
    }

    /// Drops the cached map so the next lookup reloads it.
    pub async fn invalidate_tickers(&self) {
        *self.tickers.write().await = None;
    }
}

/// Counters for one poll cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollStats {
    /// Entries in the feed.
    pub entries: usize,
    /// Entries handled in an earlier cycle.
    pub already_seen: usize,
    /// Titles, timestamps or links that could not be read.
    pub unparsable: usize,
    /// Form types outside the allow-list.
    pub skipped_form: usize,
    /// CIKs without a ticker.
    pub unresolved: usize,
    pub enqueued: usize,
    /// Enqueue calls the queue treated as duplicates.
    pub duplicates: usize,
    /// Entries left unseen for retry next cycle.
    pub errors: usize,
}

enum EntryOutcome {
    Unparsable,
    SkippedForm,
    Unresolved,
    Enqueued,
    Duplicate,
}

pub struct FeedWatcher {
    feed: Arc<dyn FeedSource>,
    queue: Arc<dyn IngestionQueue>,
    context: WatcherContext,
    config: WatcherConfig,
}

impl FeedWatcher {
    pub fn new(
        feed: Arc<dyn FeedSource>,
        ticker_source: Arc<dyn TickerSource>,
        queue: Arc<dyn IngestionQueue>,
        config: WatcherConfig,
    ) -> Self {
        let context = WatcherContext::new(ticker_source, config.seen_capacity);
        Self {
            feed,
            queue,
            context,
            config,
        }
    }

    pub fn context(&self) -> &WatcherContext {
        &self.context
    }

    /// Runs one poll cycle. Fails when the feed or the ticker map cannot be
    /// read, leaving every new entry unseen; per-entry problems are counted
    /// in the returned stats.
    pub async fn poll_once(&self) -> Result<PollStats> {
        let entries = self.feed.fetch_entries().await?;
        let mut stats = PollStats {
            entries: entries.len(),
            ..Default::default()
        };

        // Oldest first, so queue FIFO order follows publication order
        let mut fresh = Vec::new();
        for entry in entries.iter().rev() {
            if self.context.is_seen(&entry.id).await {
                stats.already_seen += 1;
            } else {
                fresh.push(entry);
            }
        }
        if fresh.is_empty() {
            return Ok(stats);
        }

        // At most one load attempt per cycle
        let tickers = self
            .context
            .tickers()
            .await
            .context("Failed to load ticker map")?;

        for entry in fresh {
            match self.handle_entry(entry, &tickers).await {
                Ok(outcome) => {
                    match outcome {
                        EntryOutcome::Unparsable => stats.unparsable += 1,
                        EntryOutcome::SkippedForm => stats.skipped_form += 1,
                        EntryOutcome::Unresolved => stats.unresolved += 1,
                        EntryOutcome::Enqueued => stats.enqueued += 1,
                        EntryOutcome::Duplicate => stats.duplicates += 1,
                    }
                    self.context.mark_seen(&entry.id).await;
                }
                Err(e) => {
                    // Not marked seen: retried next cycle
                    warn!("Feed entry {:?} failed: {:#}", entry.title, e);
                    stats.errors += 1;
                }
            }
        }

        Ok(stats)
    }

    async fn handle_entry(&self, entry: &FeedEntry, tickers: &TickerMap) -> Result<EntryOutcome> {
        let Some(parsed) = parse_title(&entry.title) else {
            debug!("Unparsable feed title: {:?}", entry.title);
            return Ok(EntryOutcome::Unparsable);
        };
        let (Some(filed_at), Some(link)) = (entry.updated, entry.link.as_deref()) else {
            debug!("Feed entry {:?} lacks a timestamp or link", entry.title);
            return Ok(EntryOutcome::Unparsable);
        };

        if !self.config.accepts_form(&parsed.form_type) {
            return Ok(EntryOutcome::SkippedForm);
        }

        let Some(ticker) = tickers.get(&parsed.external_id).cloned() else {
            debug!(
                "No ticker for CIK {} ({})",
                parsed.external_id, parsed.company
            );
            return Ok(EntryOutcome::Unresolved);
        };

        let event = NewEvent::new(
            ticker,
            parsed.external_id,
            link,
            parsed.form_type,
            filed_at,
        )
        .with_source(EventSource::Feed)
        .with_priority(false);
        let key = event.dedupe_key();

        if self.queue.enqueue(event).await? {
            info!("Enqueued {}", key);
            Ok(EntryOutcome::Enqueued)
        } else {
            debug!("Already queued: {}", key);
            Ok(EntryOutcome::Duplicate)
        }
    }

    /// Starts the polling loop in the background.
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                "Feed watcher started (interval: {}s, forms: {})",
                self.config.poll_interval.as_secs(),
                if self.config.form_types.is_empty() {
                    "all".to_string()
                } else {
                    self.config.form_types.join(",")
                }
            );

            let mut ticker = interval(self.config.poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;

                match self.poll_once().await {
                    Ok(stats) if stats.enqueued > 0 || stats.errors > 0 => {
                        info!(
                            "Feed poll: {} entries, {} enqueued, {} duplicates, {} unresolved, {} errors",
                            stats.entries,
                            stats.enqueued,
                            stats.duplicates,
                            stats.unresolved,
                            stats.errors
                        );
                    }
                    Ok(stats) => {
                        debug!(
                            "Feed poll: {} entries, nothing new ({} seen)",
                            stats.entries, stats.already_seen
                        );
                    }
                    Err(e) => {
                        error!("Feed poll failed: {:#}", e);
                    }
                }
            }
        })
    }
}
