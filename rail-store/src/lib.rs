pub mod app_config;
pub mod database;
pub mod events;
pub mod memory_repo;
pub mod postgres_repo;

pub use database::DbClient;
pub use events::EventProducer;
pub use memory_repo::InMemoryLedgerRepository;
pub use postgres_repo::PostgresLedgerRepository;

use app_config::{Config, StorageBackend};
use rail_core::LedgerRepository;
use std::sync::Arc;
use tracing::info;

/// Open the ledger store selected by `storage.backend`
pub async fn open_repository(
    config: &Config,
) -> Result<Arc<dyn LedgerRepository>, Box<dyn std::error::Error + Send + Sync>> {
    match config.storage.backend {
        StorageBackend::Memory => {
            info!("Using in-memory ledger store");
            Ok(Arc::new(InMemoryLedgerRepository::new()))
        }
        StorageBackend::Postgres => {
            let url = config.database.url.as_deref().ok_or("database.url is not set")?;
            let db = DbClient::new(url, config.database.max_connections).await?;
            db.migrate().await?;
            info!("Using Postgres ledger store");
            Ok(Arc::new(PostgresLedgerRepository::new(db.pool)))
        }
    }
}

/// Build the notification producer, attaching Kafka when configured
pub fn open_event_producer(
    config: &Config,
) -> Result<EventProducer, Box<dyn std::error::Error + Send + Sync>> {
    let producer = EventProducer::new(config.events.channel_capacity);

    #[cfg(feature = "kafka")]
    let producer = match config.kafka.brokers.as_deref() {
        Some(brokers) => {
            info!("Publishing ledger events to Kafka at {}", brokers);
            producer.with_kafka(brokers)?
        }
        None => producer,
    };

    if cfg!(not(feature = "kafka")) && config.kafka.brokers.is_some() {
        tracing::warn!("kafka.brokers is set but rail-store was built without the `kafka` feature");
    }

    Ok(producer)
}
