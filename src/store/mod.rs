//! Bounded history of analysis records behind interchangeable backends.
//!
//! Records enter through `append` only, are never mutated, and leave only by
//! eviction from the oldest end once the capacity bound is exceeded.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;

use crate::models::{AnalysisRecord, Direction};

/// Default capacity bound for the record history.
pub const MAX_RECORDS: usize = 1000;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record store unavailable: {0}")]
    Unavailable(#[source] std::io::Error),
    #[error("failed to encode records: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Shared mutable history of analysis outcomes.
///
/// Appends are serialized by each implementation; readers always observe a
/// consistent snapshot and receive value copies.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Assign the write timestamp and append at the tail, evicting from the
    /// head once the capacity bound is exceeded. Capacity never makes this
    /// fail; an unreachable persistence medium does.
    async fn append(
        &self,
        direction: Direction,
        confidence: f64,
    ) -> Result<AnalysisRecord, StoreError>;

    /// The most recently appended record, or `None` if nothing was ever
    /// written.
    async fn latest(&self) -> Result<Option<AnalysisRecord>, StoreError>;

    /// Snapshot of the full history in insertion order, oldest first.
    async fn all(&self) -> Result<Vec<AnalysisRecord>, StoreError>;
}

/// Write timestamps are wall-clock but never regress: a clock step backwards
/// reuses the previous record's timestamp.
fn stamp(previous: Option<i64>) -> i64 {
    let now = Utc::now().timestamp_millis();
    match previous {
        Some(prev) if prev > now => prev,
        _ => now,
    }
}

fn push_bounded(records: &mut Vec<AnalysisRecord>, record: AnalysisRecord, capacity: usize) {
    records.push(record);
    if records.len() > capacity {
        let excess = records.len() - capacity;
        records.drain(..excess);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(timestamp: i64) -> AnalysisRecord {
        AnalysisRecord {
            direction: Direction::Left,
            confidence: 0.5,
            timestamp,
        }
    }

    #[test]
    fn stamp_never_regresses_below_the_previous_timestamp() {
        let future = Utc::now().timestamp_millis() + 60_000;
        assert_eq!(stamp(Some(future)), future);
        assert!(stamp(None) <= stamp(Some(future)));
    }

    #[test]
    fn push_bounded_evicts_from_the_head() {
        let mut records = vec![record(1), record(2), record(3)];
        push_bounded(&mut records, record(4), 3);
        let timestamps: Vec<i64> = records.iter().map(|r| r.timestamp).collect();
        assert_eq!(timestamps, vec![2, 3, 4]);
    }
}
