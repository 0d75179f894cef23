use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{RecordStore, StoreError};
use crate::models::PredictionRecord;

/// Process-local store. Keeps first-insertion order; an upsert replaces in place.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: RwLock<Vec<PredictionRecord>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn put(&self, record: &PredictionRecord) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        match records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record.clone(),
            None => records.push(record.clone()),
        }
        Ok(())
    }

    async fn get_all(&self) -> Result<Vec<PredictionRecord>, StoreError> {
        Ok(self.records.read().await.clone())
    }

    async fn health_check(&self) -> Result<String, StoreError> {
        Ok(format!("in-memory ({} records)", self.len().await))
    }

    fn name(&self) -> &str {
        "memory"
    }
}
