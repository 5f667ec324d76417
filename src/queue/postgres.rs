//! PostgreSQL queue backend.
//!
//! Claims use the `UPDATE ... WHERE id = (SELECT ... FOR UPDATE SKIP LOCKED)`
//! pattern: concurrent claimers skip rows another transaction has already
//! locked instead of waiting on them, so N workers against M >= N pending
//! rows each get a distinct row without blocking.
//!
//! Pending rows and expired claims are looked up by separate statements so
//! the pending claim stays on the partial index over `status = 'pending'`.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use crate::models::{DedupeKey, EventStatus, IngestionEvent, NewEvent};

use super::{IngestionQueue, QueueConfig, QueueCounts};

const EVENT_COLUMNS: &str = "id, ticker, external_id, document_url, form_type, filed_at, \
     status, source, is_priority, attempts, error_message, created_at, updated_at";

/// Claimable pending rows; matches the predicate of `idx_ingestion_events_claim`.
const PENDING_CLAIM: &str = "status = 'pending'";

/// PROCESSING rows whose lease (`$1` seconds) has expired.
const STALE_CLAIM: &str = "status = 'processing' \
     AND updated_at < clock_timestamp() - make_interval(secs => $1::double precision)";

/// Raw row as stored; status and source are TEXT columns.
#[derive(Debug, sqlx::FromRow)]
struct EventRow {
    id: Uuid,
    ticker: String,
    external_id: String,
    document_url: String,
    form_type: String,
    filed_at: DateTime<Utc>,
    status: String,
    source: String,
    is_priority: bool,
    attempts: i32,
    error_message: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<EventRow> for IngestionEvent {
    type Error = anyhow::Error;

    fn try_from(row: EventRow) -> Result<Self> {
        Ok(IngestionEvent {
            id: row.id,
            ticker: row.ticker,
            external_id: row.external_id,
            document_url: row.document_url,
            form_type: row.form_type,
            filed_at: row.filed_at,
            status: row.status.parse()?,
            source: row.source.parse()?,
            is_priority: row.is_priority,
            attempts: row.attempts,
            error_message: row.error_message,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Queue stored in the `ingestion_events` table.
///
/// The table is created by [`crate::db::schema::initialize_queue_schema`].
pub struct PgQueue {
    pool: PgPool,
    config: QueueConfig,
}

impl PgQueue {
    pub fn new(pool: PgPool, config: QueueConfig) -> Self {
        Self { pool, config }
    }

    fn claim_ttl_secs(&self) -> Option<f64> {
        self.config.claim_ttl.map(|ttl: Duration| ttl.as_secs_f64())
    }

    /// Claims the first row matching `condition`, binding the lease length
    /// as `$1` when given.
    async fn claim_matching(
        &self,
        condition: &str,
        ttl_secs: Option<f64>,
    ) -> Result<Option<IngestionEvent>> {
        let query = format!(
            r#"
            UPDATE ingestion_events
            SET status = 'processing',
                updated_at = clock_timestamp(),
                attempts = attempts + 1
            WHERE id = (
                SELECT id FROM ingestion_events
                WHERE {}
                ORDER BY is_priority DESC, created_at ASC
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING {}
            "#,
            condition, EVENT_COLUMNS
        );

        let mut claim = sqlx::query_as::<_, EventRow>(&query);
        if let Some(secs) = ttl_secs {
            claim = claim.bind(secs);
        }
        let row = claim
            .fetch_optional(&self.pool)
            .await
            .context("Failed to claim next ingestion event")?;

        row.map(IngestionEvent::try_from).transpose()
    }

    async fn finish(
        &self,
        id: Uuid,
        attempt: i32,
        status: EventStatus,
        error: Option<&str>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE ingestion_events
            SET status = $3, error_message = $4, updated_at = clock_timestamp()
            WHERE id = $1 AND attempts = $2 AND status = 'processing'
            "#,
        )
        .bind(id)
        .bind(attempt)
        .bind(status.as_str())
        .bind(error)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to mark event {} as {}", id, status))?;

        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl IngestionQueue for PgQueue {
    async fn enqueue(&self, event: NewEvent) -> Result<bool> {
        // Failed rows are only revived when the rediscovery option is on;
        // otherwise any existing row makes this a no-op.
        let on_conflict = if self.config.retry_failed_on_rediscovery {
            r#"
            ON CONFLICT (ticker, form_type, filed_at) DO UPDATE
            SET status = 'pending',
                error_message = NULL,
                is_priority = ingestion_events.is_priority OR EXCLUDED.is_priority,
                updated_at = clock_timestamp()
            WHERE ingestion_events.status = 'failed'
            "#
        } else {
            "ON CONFLICT (ticker, form_type, filed_at) DO NOTHING"
        };

        let query = format!(
            r#"
            INSERT INTO ingestion_events
                (id, ticker, external_id, document_url, form_type, filed_at, status, source, is_priority)
            VALUES ($1, $2, $3, $4, $5, $6, 'pending', $7, $8)
            {}
            "#,
            on_conflict
        );

        let result = sqlx::query(&query)
            .bind(Uuid::new_v4())
            .bind(&event.ticker)
            .bind(&event.external_id)
            .bind(&event.document_url)
            .bind(&event.form_type)
            .bind(event.filed_at)
            .bind(event.source.as_str())
            .bind(event.is_priority)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to enqueue {}", event.dedupe_key()))?;

        let written = result.rows_affected() == 1;
        if !written {
            debug!("Duplicate enqueue ignored for {}", event.dedupe_key());
        }
        Ok(written)
    }

    async fn claim_next(&self) -> Result<Option<IngestionEvent>> {
        if let Some(secs) = self.claim_ttl_secs() {
            if let Some(event) = self.claim_matching(STALE_CLAIM, Some(secs)).await? {
                debug!("Reclaimed expired claim on {} (attempt {})", event.id, event.attempts);
                return Ok(Some(event));
            }
        }
        self.claim_matching(PENDING_CLAIM, None).await
    }

    async fn complete(&self, id: Uuid, attempt: i32) -> Result<bool> {
        self.finish(id, attempt, EventStatus::Completed, None).await
    }

    async fn fail(&self, id: Uuid, attempt: i32, error: &str) -> Result<bool> {
        self.finish(id, attempt, EventStatus::Failed, Some(error)).await
    }

    async fn get(&self, id: Uuid) -> Result<Option<IngestionEvent>> {
        let query = format!("SELECT {} FROM ingestion_events WHERE id = $1", EVENT_COLUMNS);
        let row: Option<EventRow> = sqlx::query_as(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to load event {}", id))?;

        row.map(IngestionEvent::try_from).transpose()
    }

    async fn find_by_key(&self, key: &DedupeKey) -> Result<Option<IngestionEvent>> {
        let query = format!(
            "SELECT {} FROM ingestion_events WHERE ticker = $1 AND form_type = $2 AND filed_at = $3",
            EVENT_COLUMNS
        );
        let row: Option<EventRow> = sqlx::query_as(&query)
            .bind(&key.ticker)
            .bind(&key.form_type)
            .bind(key.filed_at)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to load event {}", key))?;

        row.map(IngestionEvent::try_from).transpose()
    }

    async fn counts(&self) -> Result<QueueCounts> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM ingestion_events GROUP BY status")
                .fetch_all(&self.pool)
                .await
                .context("Failed to count ingestion events")?;

        let mut counts = QueueCounts::default();
        for (status, n) in rows {
            counts.add(status.parse()?, n.max(0) as u64);
        }
        Ok(counts)
    }

    fn backend_name(&self) -> &str {
        "postgres"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::{connect_pg, DbConfig};
    use crate::db::schema::initialize_queue_schema;
    use chrono::TimeZone;
    use std::collections::HashSet;
    use std::sync::Arc;

    // Estos tests requieren una instancia de PostgreSQL (DATABASE_URL)
    // Ejecutar con: cargo test -- --ignored

    async fn test_queue(config: QueueConfig) -> PgQueue {
        dotenv::dotenv().ok();
        let db_config = DbConfig::from_env().unwrap();
        let pool = connect_pg(&db_config).await.unwrap();
        initialize_queue_schema(&pool).await.unwrap();
        PgQueue::new(pool, config)
    }

    fn unique_filing(ticker: &str, priority: bool) -> NewEvent {
        // Un ticker por test evita colisiones entre ejecuciones
        NewEvent::new(
            ticker,
            "0000123456",
            "https://example.test/0000123456/index.htm",
            "10-K",
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
                + chrono::Duration::microseconds(Utc::now().timestamp_subsec_micros() as i64),
        )
        .with_priority(priority)
    }

    #[tokio::test]
    #[ignore]
    async fn test_pg_enqueue_is_idempotent() {
        let queue = test_queue(QueueConfig::default()).await;
        let ticker = format!("T{}", Uuid::new_v4().simple());
        let event = unique_filing(&ticker, false);

        assert!(queue.enqueue(event.clone()).await.unwrap());
        assert!(!queue.enqueue(event.clone()).await.unwrap());

        let stored = queue.find_by_key(&event.dedupe_key()).await.unwrap().unwrap();
        assert_eq!(stored.status, EventStatus::Pending);
    }

    #[test]
    fn test_pending_claim_matches_partial_index() {
        let index = crate::db::schema::QUEUE_SCHEMA
            .iter()
            .find(|s| s.contains("idx_ingestion_events_claim"))
            .unwrap();
        assert!(index.contains(&format!("WHERE {}", PENDING_CLAIM)));
        assert!(!PENDING_CLAIM.contains("processing"));
        assert!(STALE_CLAIM.starts_with("status = 'processing'"));
    }

    #[tokio::test]
    #[ignore]
    async fn test_pg_concurrent_claims_are_exclusive() {
        let queue = Arc::new(test_queue(QueueConfig::default()).await);
        for _ in 0..10 {
            let ticker = format!("T{}", Uuid::new_v4().simple());
            queue.enqueue(unique_filing(&ticker, true)).await.unwrap();
        }

        let mut handles = Vec::new();
        for _ in 0..8 {
            let queue = queue.clone();
            handles.push(tokio::spawn(async move { queue.claim_next().await.unwrap() }));
        }

        let mut ids = HashSet::new();
        for handle in handles {
            if let Some(event) = handle.await.unwrap() {
                assert!(ids.insert(event.id), "row claimed twice");
                assert!(queue.complete(event.id, event.attempts).await.unwrap());
            }
        }
        assert_eq!(ids.len(), 8);
    }
}
