//! JSON-document-backed record history.
//!
//! The whole history lives in one document: an array of records, oldest
//! first. Earlier deployments persisted a single bare record (latest-only);
//! such documents load as a one-element history. Content that fails to parse
//! reads as an empty store and is replaced wholesale by the next successful
//! append.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use log::warn;
use serde::Deserialize;
use tokio::sync::Mutex;

use super::{push_bounded, stamp, RecordStore, StoreError};
use crate::models::{AnalysisRecord, Direction};

/// Persisted record as written by any historical revision. The direction is
/// kept as a raw string here so one bad entry cannot poison the rest of the
/// document.
#[derive(Debug, Deserialize)]
struct StoredRecord {
    direction: String,
    confidence: f64,
    timestamp: i64,
}

pub struct FileStore {
    path: PathBuf,
    capacity: usize,
    // Serializes the read-modify-write in append. Reads take it too, so a
    // reader never observes a document mid-rewrite.
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>, capacity: usize) -> Self {
        Self {
            path: path.into(),
            capacity: capacity.max(1),
            lock: Mutex::new(()),
        }
    }

    async fn load(&self) -> Result<Vec<AnalysisRecord>, StoreError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            // No document yet is the normal empty state, not a failure.
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(StoreError::Unavailable(err)),
        };
        Ok(parse_document(&contents, &self.path))
    }

    async fn persist(&self, records: &[AnalysisRecord]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(StoreError::Unavailable)?;
            }
        }

        let serialized = serde_json::to_string_pretty(records).map_err(StoreError::Encode)?;
        tokio::fs::write(&self.path, serialized)
            .await
            .map_err(StoreError::Unavailable)
    }
}

fn parse_document(contents: &str, path: &Path) -> Vec<AnalysisRecord> {
    let stored: Vec<StoredRecord> = match serde_json::from_str(contents) {
        Ok(stored) => stored,
        // A single bare record is the latest-only layout from earlier
        // revisions.
        Err(_) => match serde_json::from_str::<StoredRecord>(contents) {
            Ok(record) => vec![record],
            Err(err) => {
                warn!(
                    "treating malformed record document {} as empty: {err}",
                    path.display()
                );
                return Vec::new();
            }
        },
    };

    stored
        .into_iter()
        .filter_map(|record| match Direction::parse(&record.direction) {
            Some(direction) => Some(AnalysisRecord {
                direction,
                confidence: record.confidence,
                timestamp: record.timestamp,
            }),
            None => {
                warn!(
                    "skipping record with unrecognized direction '{}' in {}",
                    record.direction,
                    path.display()
                );
                None
            }
        })
        .collect()
}

#[async_trait]
impl RecordStore for FileStore {
    async fn append(
        &self,
        direction: Direction,
        confidence: f64,
    ) -> Result<AnalysisRecord, StoreError> {
        let _guard = self.lock.lock().await;
        let mut records = self.load().await?;
        let record = AnalysisRecord {
            direction,
            confidence,
            timestamp: stamp(records.last().map(|r| r.timestamp)),
        };
        push_bounded(&mut records, record.clone(), self.capacity);
        self.persist(&records).await?;
        Ok(record)
    }

    async fn latest(&self) -> Result<Option<AnalysisRecord>, StoreError> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.pop())
    }

    async fn all(&self) -> Result<Vec<AnalysisRecord>, StoreError> {
        let _guard = self.lock.lock().await;
        self.load().await
    }
}
