use anyhow::{Context, Result};
use sqlx::PgPool;
use tracing::info;

use super::connection::DatabaseConnection;

/// Sentencias DDL de la cola; todas idempotentes
pub(crate) const QUEUE_SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS ingestion_events (
        id UUID PRIMARY KEY,
        ticker TEXT NOT NULL,
        external_id TEXT NOT NULL,
        document_url TEXT NOT NULL,
        form_type TEXT NOT NULL,
        filed_at TIMESTAMPTZ NOT NULL,
        status TEXT NOT NULL DEFAULT 'pending'
            CHECK (status IN ('pending', 'processing', 'completed', 'failed')),
        source TEXT NOT NULL
            CHECK (source IN ('feed', 'manual', 'backfill')),
        is_priority BOOLEAN NOT NULL DEFAULT FALSE,
        attempts INTEGER NOT NULL DEFAULT 0,
        error_message TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT clock_timestamp(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT clock_timestamp(),
        CONSTRAINT ingestion_events_dedupe UNIQUE (ticker, form_type, filed_at)
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_ingestion_events_claim
        ON ingestion_events (is_priority DESC, created_at ASC)
        WHERE status = 'pending'
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_ingestion_events_status
        ON ingestion_events (status, updated_at)
    "#,
];

/// Crea la tabla de la cola en PostgreSQL
pub async fn initialize_queue_schema(pool: &PgPool) -> Result<()> {
    info!("Initializing queue schema...");

    for statement in QUEUE_SCHEMA {
        sqlx::query(statement)
            .execute(pool)
            .await
            .context("Failed to initialize ingestion_events table")?;
    }

    info!("Queue schema initialized");
    Ok(())
}

/// Define la tabla de chunks en SurrealDB
pub async fn initialize_chunk_schema(db: &DatabaseConnection) -> Result<()> {
    info!("Initializing chunk schema...");

    let query = r#"
        DEFINE TABLE filing_chunks SCHEMAFULL;

        DEFINE FIELD ticker ON TABLE filing_chunks TYPE string;
        DEFINE FIELD source ON TABLE filing_chunks TYPE string;
        DEFINE FIELD chunk_index ON TABLE filing_chunks TYPE int
            ASSERT $value >= 0;
        DEFINE FIELD content ON TABLE filing_chunks TYPE string;
        DEFINE FIELD embedding ON TABLE filing_chunks FLEXIBLE TYPE option<object>;
        DEFINE FIELD created_at ON TABLE filing_chunks TYPE datetime DEFAULT time::now();

        DEFINE INDEX idx_chunk_owner ON TABLE filing_chunks COLUMNS ticker, source;
        DEFINE INDEX idx_chunk_position ON TABLE filing_chunks COLUMNS ticker, source, chunk_index UNIQUE;
    "#;

    db.query(query)
        .await
        .context("Failed to define filing_chunks table")?
        .check()
        .context("Invalid filing_chunks schema")?;

    info!("Chunk schema initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_schema_declares_dedupe_key() {
        let table = QUEUE_SCHEMA[0];
        assert!(table.contains("UNIQUE (ticker, form_type, filed_at)"));
        assert!(QUEUE_SCHEMA.iter().all(|s| s.contains("IF NOT EXISTS")));
    }

    #[tokio::test]
    #[ignore] // Requiere PostgreSQL: cargo test -- --ignored
    async fn test_initialize_queue_schema_twice() {
        dotenv::dotenv().ok();
        let config = crate::db::connection::DbConfig::from_env().unwrap();
        let pool = crate::db::connection::connect_pg(&config).await.unwrap();

        initialize_queue_schema(&pool).await.unwrap();
        initialize_queue_schema(&pool).await.unwrap();
    }
}
