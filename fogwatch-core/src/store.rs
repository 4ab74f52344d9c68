//! Durable Stats Store Contract
//!
//! ## Overview
//!
//! The store is the hierarchy's durability collaborator: it keeps per-node
//! counters and the cloud tier's record log across pipeline passes. The
//! core only requires three things from it, and requires them to be atomic:
//!
//! - `increment`: read-modify-write of one counter field
//! - `append`: add a record, assigning the next monotonic id
//! - `query_recent`: the newest `n` records for a node, oldest first
//!
//! Atomicity matters because the cloud tier's failure contract leans on it:
//! a failed append must leave nothing behind. No record, no advanced id,
//! no phantom count.
//!
//! ## Reference Implementation
//!
//! [`MemoryStore`] keeps everything behind a single mutex, which makes each
//! operation a trivially atomic read-modify-write. It is the store used by
//! the simulation; a persistence layer mapping these shapes onto a real
//! database only has to honor the same contract.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use crate::{
    errors::{StoreError, StoreResult},
    fog::FogCounters,
    telemetry::CongestionLevel,
    time::Timestamp,
};

/// Counter selected by [`StatsStore::increment`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterField {
    /// Readings processed by the node
    TotalProcessed,
    /// Readings forwarded to the cloud tier
    ForwardedToCloud,
    /// Readings filtered at the fog tier
    FilteredLocally,
}

/// Record shape the cloud tier persists per forwarded reading
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRecord {
    /// Fog node that forwarded the reading
    pub node_id: String,
    /// Edge device that produced it
    pub device_id: String,
    /// Monitored location
    pub location: String,
    /// Vehicle count; the value trend analytics read back
    pub vehicle_count: u32,
    /// Congestion level at storage time
    pub congestion_level: CongestionLevel,
    /// When the record was stored
    pub stored_at: Timestamp,
}

/// Durable counter and record storage
///
/// Implementations must make every operation an atomic read-modify-write:
/// concurrent callers never observe a half-applied increment or a record
/// without its id.
pub trait StatsStore: Send + Sync {
    /// Add one to a node's counter field, returning the new value
    fn increment(&self, node_id: &str, field: CounterField) -> StoreResult<u64>;

    /// Durably append a record, returning its assigned monotonic id (1-based)
    fn append(&self, record: StoredRecord) -> StoreResult<u64>;

    /// The newest `n` records for a node
    ///
    /// Fetched reverse-chronologically, then re-ordered ascending so trend
    /// computation reads oldest first.
    fn query_recent(&self, node_id: &str, n: usize) -> StoreResult<Vec<StoredRecord>>;
}

#[derive(Default)]
struct StoreInner {
    counters: HashMap<String, FogCounters>,
    records: Vec<StoredRecord>,
}

/// In-memory store: one mutex, trivially atomic operations
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<StoreInner>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Total records ever appended
    pub fn record_count(&self) -> u64 {
        self.inner().records.len() as u64
    }

    /// Counter snapshot for a node, zeroed if never incremented
    pub fn counters(&self, node_id: &str) -> FogCounters {
        self.inner()
            .counters
            .get(node_id)
            .copied()
            .unwrap_or_default()
    }

    fn inner(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl StatsStore for MemoryStore {
    fn increment(&self, node_id: &str, field: CounterField) -> StoreResult<u64> {
        let mut inner = self.inner();
        let counters = inner.counters.entry(node_id.to_owned()).or_default();

        let value = match field {
            CounterField::TotalProcessed => {
                counters.total_processed += 1;
                counters.total_processed
            }
            CounterField::ForwardedToCloud => {
                counters.forwarded_to_cloud += 1;
                counters.forwarded_to_cloud
            }
            CounterField::FilteredLocally => {
                counters.filtered_locally += 1;
                counters.filtered_locally
            }
        };

        Ok(value)
    }

    fn append(&self, record: StoredRecord) -> StoreResult<u64> {
        let mut inner = self.inner();
        inner.records.push(record);
        Ok(inner.records.len() as u64)
    }

    fn query_recent(&self, node_id: &str, n: usize) -> StoreResult<Vec<StoredRecord>> {
        let inner = self.inner();

        let mut recent: Vec<StoredRecord> = inner
            .records
            .iter()
            .rev()
            .filter(|record| record.node_id == node_id)
            .take(n)
            .cloned()
            .collect();

        // Reverse-chronological fetch, ascending hand-off
        recent.reverse();
        Ok(recent)
    }
}

/// Store double that fails every write, for exercising failure atomicity
///
/// Reads still work so callers can verify nothing was left behind.
#[derive(Default)]
pub struct RejectingStore {
    inner: MemoryStore,
}

impl RejectingStore {
    /// Create a store that rejects all writes
    pub fn new() -> Self {
        Self::default()
    }

    /// Total records ever appended (always zero)
    pub fn record_count(&self) -> u64 {
        self.inner.record_count()
    }
}

impl StatsStore for RejectingStore {
    fn increment(&self, _node_id: &str, _field: CounterField) -> StoreResult<u64> {
        Err(StoreError::WriteFailed { reason: "store rejects writes" })
    }

    fn append(&self, _record: StoredRecord) -> StoreResult<u64> {
        Err(StoreError::WriteFailed { reason: "store rejects writes" })
    }

    fn query_recent(&self, node_id: &str, n: usize) -> StoreResult<Vec<StoredRecord>> {
        self.inner.query_recent(node_id, n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn record(node_id: &str, vehicle_count: u32, stored_at: Timestamp) -> StoredRecord {
        StoredRecord {
            node_id: node_id.into(),
            device_id: "CAM_001".into(),
            location: "Main Street Junction".into(),
            vehicle_count,
            congestion_level: CongestionLevel::classify(vehicle_count),
            stored_at,
        }
    }

    #[test]
    fn append_assigns_monotonic_ids() {
        let store = MemoryStore::new();

        let first = store.append(record("FOG_NODE_01", 10, 1000)).unwrap();
        let second = store.append(record("FOG_NODE_01", 20, 2000)).unwrap();

        assert_eq!(first, 1);
        assert_eq!(second, 2);
        assert_eq!(store.record_count(), 2);
    }

    #[test]
    fn query_recent_is_ascending_and_capped() {
        let store = MemoryStore::new();
        for (i, count) in [10, 20, 30, 40, 50].iter().enumerate() {
            store
                .append(record("FOG_NODE_01", *count, i as Timestamp))
                .unwrap();
        }

        let recent = store.query_recent("FOG_NODE_01", 3).unwrap();
        let counts: Vec<u32> = recent.iter().map(|r| r.vehicle_count).collect();
        assert_eq!(counts, vec![30, 40, 50]);
    }

    #[test]
    fn query_recent_filters_by_node() {
        let store = MemoryStore::new();
        store.append(record("FOG_NODE_01", 10, 1)).unwrap();
        store.append(record("FOG_NODE_02", 99, 2)).unwrap();
        store.append(record("FOG_NODE_01", 20, 3)).unwrap();

        let recent = store.query_recent("FOG_NODE_01", 10).unwrap();
        assert_eq!(recent.len(), 2);
        assert!(recent.iter().all(|r| r.node_id == "FOG_NODE_01"));
    }

    #[test]
    fn increments_are_atomic_under_contention() {
        let store = Arc::new(MemoryStore::new());
        let mut handles = Vec::new();

        for _ in 0..4 {
            let store = Arc::clone(&store);
            handles.push(thread::spawn(move || {
                for _ in 0..250 {
                    store
                        .increment("FOG_NODE_01", CounterField::TotalProcessed)
                        .unwrap();
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.counters("FOG_NODE_01").total_processed, 1000);
    }

    #[test]
    fn rejecting_store_persists_nothing() {
        let store = RejectingStore::new();

        let err = store.append(record("FOG_NODE_01", 80, 1000)).unwrap_err();
        assert!(matches!(err, StoreError::WriteFailed { .. }));
        assert_eq!(store.record_count(), 0);
    }
}
