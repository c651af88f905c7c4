//! In-process record history shared across requests.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{push_bounded, stamp, RecordStore, StoreError};
use crate::models::{AnalysisRecord, Direction};

pub struct MemoryStore {
    records: Arc<Mutex<Vec<AnalysisRecord>>>,
    capacity: usize,
}

impl MemoryStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: Arc::new(Mutex::new(Vec::new())),
            capacity: capacity.max(1),
        }
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn append(
        &self,
        direction: Direction,
        confidence: f64,
    ) -> Result<AnalysisRecord, StoreError> {
        let mut records = self.records.lock().await;
        let record = AnalysisRecord {
            direction,
            confidence,
            timestamp: stamp(records.last().map(|r| r.timestamp)),
        };
        push_bounded(&mut records, record.clone(), self.capacity);
        Ok(record)
    }

    async fn latest(&self) -> Result<Option<AnalysisRecord>, StoreError> {
        Ok(self.records.lock().await.last().cloned())
    }

    async fn all(&self) -> Result<Vec<AnalysisRecord>, StoreError> {
        Ok(self.records.lock().await.clone())
    }
}
