use std::sync::Arc;

use anyhow::Result;
use dotenv::dotenv;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use filing_ingest::db::{self, DbConfig, SurrealConfig};
use filing_ingest::embeddings::EmbeddingService;
use filing_ingest::queue::{IngestionQueue, PgQueue, QueueConfig};
use filing_ingest::services::feed::{HttpFeedSource, HttpTickerSource};
use filing_ingest::services::{
    FeedWatcher, HttpFetcher, IngestionConfig, IngestionPipeline, IngestionWorker,
    WatcherConfig, WorkerConfig,
};
use filing_ingest::store::SurrealContentStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Cargar variables de entorno
    dotenv().ok();

    // Inicializar logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "filing_ingest=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting filing ingestion...");

    // Conectar a las bases de datos
    let pg = db::connect_pg(&DbConfig::from_env()?).await?;
    let surreal = db::connect_surreal(&SurrealConfig::from_env()?).await?;

    if !db::check_connections(&pg, &surreal).await? {
        error!("Database connection check failed");
        return Err(anyhow::anyhow!("Failed to connect to databases"));
    }
    info!("Databases connected successfully");

    // Inicializar schemas
    db::initialize_queue_schema(&pg).await?;
    db::initialize_chunk_schema(&surreal).await?;
    info!("Database schemas initialized");

    // Embeddings
    let embeddings = EmbeddingService::from_env()?;
    match embeddings.health_check().await {
        Ok(true) => info!(
            "Embedding provider ready: {} ({}, {}D)",
            embeddings.provider_name(),
            embeddings.model().model_name(),
            embeddings.dimension()
        ),
        Ok(false) | Err(_) => warn!(
            "Embedding provider {} is not responding; chunks may be dropped until it is",
            embeddings.provider_name()
        ),
    }

    // Pipeline
    let ingestion_config = IngestionConfig::from_env()?;
    let fetcher = Arc::new(HttpFetcher::new(&ingestion_config)?);
    let store = Arc::new(SurrealContentStore::new(surreal));
    let pipeline = Arc::new(IngestionPipeline::new(
        fetcher,
        Arc::new(embeddings),
        store,
        ingestion_config,
    ));

    let queue: Arc<dyn IngestionQueue> = Arc::new(PgQueue::new(pg, QueueConfig::from_env()));

    let mut handles = Vec::new();

    // Feed watcher
    let watcher_config = WatcherConfig::from_env()?;
    if watcher_config.enabled {
        let feed = Arc::new(HttpFeedSource::new(&watcher_config)?);
        let tickers = Arc::new(HttpTickerSource::new(&watcher_config)?);
        let watcher = Arc::new(FeedWatcher::new(feed, tickers, queue.clone(), watcher_config));
        handles.push(watcher.start());
    } else {
        info!("Feed watcher disabled (set FEED_ENABLED=true to enable)");
    }

    // Workers
    let worker_config = WorkerConfig::from_env();
    for n in 0..worker_config.count {
        let worker = IngestionWorker::new(queue.clone(), pipeline.clone(), worker_config.clone())
            .with_name(format!("worker-{}", n));
        handles.push(Arc::new(worker).start());
    }
    info!("{} ingestion workers started", worker_config.count);

    shutdown_signal().await;

    for handle in handles {
        handle.abort();
    }

    info!("Filing ingestion shut down");

    Ok(())
}

/// Señal de shutdown
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received...");
}
