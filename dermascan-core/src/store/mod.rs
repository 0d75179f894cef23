//! Record store — persistence for prediction records.
//!
//! Provides a `RecordStore` trait with implementations for:
//! - **Postgres** — durable storage via sqlx, one row per record
//! - **Memory** — process-local, for tests and single-node demos

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::DermascanConfig;
use crate::models::PredictionRecord;

pub mod memory;
pub mod postgres;

pub use memory::MemoryRecordStore;
pub use postgres::PgRecordStore;

/// Abstraction over the document store holding prediction records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Upsert a record keyed by its id.
    async fn put(&self, record: &PredictionRecord) -> Result<(), StoreError>;

    /// Every stored record, in the backend's stable order.
    async fn get_all(&self) -> Result<Vec<PredictionRecord>, StoreError>;

    /// Reachability probe. Returns a short backend description.
    async fn health_check(&self) -> Result<String, StoreError>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Corrupt record {id}: {reason}")]
    Corrupt { id: String, reason: String },

    #[error("Invalid collection name '{0}': use ASCII letters, digits and underscores")]
    InvalidCollection(String),

    #[error("Unknown store backend '{0}'")]
    UnknownBackend(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Build the store named by `store.backend`. Postgres stores get their schema ensured.
pub async fn create_store(config: &DermascanConfig) -> Result<Arc<dyn RecordStore>, StoreError> {
    match config.store.backend.as_str() {
        "postgres" => {
            let pool = crate::db::create_pool(&config.database).await?;
            let store = PgRecordStore::new(pool, &config.store.collection)?;
            store.ensure_schema().await?;
            tracing::info!(
                "Record store: postgres (collection '{}')",
                config.store.collection
            );
            Ok(Arc::new(store))
        }
        "memory" => {
            tracing::info!("Record store: in-memory (records are lost on restart)");
            Ok(Arc::new(MemoryRecordStore::new()))
        }
        other => Err(StoreError::UnknownBackend(other.to_string())),
    }
}
