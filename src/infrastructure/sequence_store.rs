// Sequence Store - persistent keyed counters behind the ID generator
// One record per `<prefix>_<year>` key, created lazily at 1 and bumped by one on every allocation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{AppError, AppResult};

/// A single counter row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SequenceRecord {
    pub key: String,
    pub value: i64,
}

/// Build the counter key for a prefix and year, e.g. `HS_2024`
pub fn sequence_key(prefix: &str, year: i32) -> String {
    format!("{}_{}", prefix, year)
}

/// Atomic keyed counters.
///
/// `increment` must be linearizable per key: concurrent callers for the same key
/// each observe a distinct value and no increment is ever lost.
#[async_trait]
pub trait SequenceStore: Send + Sync {
    /// Create the counter at 1 if absent, otherwise add one; returns the new value
    async fn increment(&self, key: &str) -> AppResult<i64>;

    /// Current value without incrementing
    async fn current(&self, key: &str) -> AppResult<Option<i64>>;

    /// Every counter, ordered by key
    async fn records(&self) -> AppResult<Vec<SequenceRecord>>;
}

/// In-process sequence store for tests and `memory:` runs.
/// Counters do not survive a restart.
#[derive(Debug, Default)]
pub struct MemorySequenceStore {
    counters: Mutex<HashMap<String, i64>>,
}

impl MemorySequenceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SequenceStore for MemorySequenceStore {
    async fn increment(&self, key: &str) -> AppResult<i64> {
        let mut counters = self
            .counters
            .lock()
            .map_err(|e| AppError::Internal(format!("Sequence lock poisoned: {}", e)))?;
        let value = counters.entry(key.to_string()).or_insert(0);
        *value += 1;
        Ok(*value)
    }

    async fn current(&self, key: &str) -> AppResult<Option<i64>> {
        let counters = self
            .counters
            .lock()
            .map_err(|e| AppError::Internal(format!("Sequence lock poisoned: {}", e)))?;
        Ok(counters.get(key).copied())
    }

    async fn records(&self) -> AppResult<Vec<SequenceRecord>> {
        let counters = self
            .counters
            .lock()
            .map_err(|e| AppError::Internal(format!("Sequence lock poisoned: {}", e)))?;
        let mut records: Vec<SequenceRecord> = counters
            .iter()
            .map(|(key, value)| SequenceRecord {
                key: key.clone(),
                value: *value,
            })
            .collect();
        records.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_sequence_key() {
        assert_eq!(sequence_key("HS", 2024), "HS_2024");
        assert_eq!(sequence_key("C", 1999), "C_1999");
    }

    #[tokio::test]
    async fn test_memory_store_starts_at_one() {
        let store = MemorySequenceStore::new();
        assert_eq!(store.current("HS_2024").await.unwrap(), None);
        assert_eq!(store.increment("HS_2024").await.unwrap(), 1);
        assert_eq!(store.increment("HS_2024").await.unwrap(), 2);
        assert_eq!(store.increment("GV_2024").await.unwrap(), 1);
        assert_eq!(store.current("HS_2024").await.unwrap(), Some(2));

        let records = store.records().await.unwrap();
        assert_eq!(
            records,
            vec![
                SequenceRecord { key: "GV_2024".into(), value: 1 },
                SequenceRecord { key: "HS_2024".into(), value: 2 },
            ]
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_memory_store_concurrent_increments() {
        let store = Arc::new(MemorySequenceStore::new());
        let handles: Vec<_> = (0..200)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.increment("HS_2024").await.unwrap() })
            })
            .collect();

        let mut values: Vec<i64> = futures::future::join_all(handles)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();
        values.sort();
        assert_eq!(values, (1..=200).collect::<Vec<i64>>());
    }
}
