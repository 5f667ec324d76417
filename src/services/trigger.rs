//! Synchronous on-demand ingestion.
//!
//! Lets another part of the product ask for a specific filing and wait a
//! bounded time for it: the request is enqueued as a priority event and the
//! queue is polled until the event reaches a terminal state.

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tokio::time::{sleep, Instant};
use tracing::{debug, info};

use crate::models::{EventSource, EventStatus, NewEvent};
use crate::queue::IngestionQueue;

use super::config::TriggerConfig;

/// How an on-demand request ended. Anything but `Completed` means the
/// caller should fall back to another data path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
    Completed,
    Failed(String),
    TimedOut,
    /// Enqueued without waiting (zero wait timeout).
    Enqueued,
}

pub struct OnDemandTrigger {
    queue: Arc<dyn IngestionQueue>,
    config: TriggerConfig,
}

impl OnDemandTrigger {
    pub fn new(queue: Arc<dyn IngestionQueue>, config: TriggerConfig) -> Self {
        Self { queue, config }
    }

    /// Requests ingestion of one filing and waits for the result.
    ///
    /// If the filing is already known the existing event is awaited instead;
    /// one that already completed returns `Completed` on the first check.
    pub async fn request(
        &self,
        ticker: &str,
        external_id: &str,
        document_url: &str,
        form_type: &str,
        filed_at: DateTime<Utc>,
    ) -> Result<TriggerOutcome> {
        let event = NewEvent::new(ticker, external_id, document_url, form_type, filed_at)
            .with_source(EventSource::Manual)
            .with_priority(true);
        let key = event.dedupe_key();

        let created = self.queue.enqueue(event).await?;
        info!(
            "On-demand request for {} ({})",
            key,
            if created { "enqueued" } else { "already known" }
        );

        if self.config.wait_timeout.is_zero() {
            return Ok(TriggerOutcome::Enqueued);
        }

        let deadline = Instant::now() + self.config.wait_timeout;
        loop {
            if let Some(event) = self.queue.find_by_key(&key).await? {
                match event.status {
                    EventStatus::Completed => return Ok(TriggerOutcome::Completed),
                    EventStatus::Failed => {
                        return Ok(TriggerOutcome::Failed(
                            event.error_message.unwrap_or_default(),
                        ))
                    }
                    status => debug!("{} is {}", key, status),
                }
            }

            let now = Instant::now();
            if now >= deadline {
                info!("On-demand request for {} timed out", key);
                return Ok(TriggerOutcome::TimedOut);
            }
            sleep(self.config.poll_interval.min(deadline - now)).await;
        }
    }
}
