//! Integration tests for the concurrent dispatcher
//!
//! Exercises the fan-out/join path on a multi-threaded runtime: counter
//! consistency under true parallelism, per-device failure isolation, and
//! the batch result contract.

use std::sync::Arc;

use fogwatch_core::{
    errors::{StoreError, StoreResult},
    latency::FixedLatency,
    logsink::LogKind,
    store::{CounterField, StoredRecord},
    time::FixedClock,
    CloudAggregator, DeviceOutcome, FogEngine, LogSink, MemoryStore, StatsStore,
};
use fogwatch_sim::{
    delay::InstantDelay,
    dispatch::Dispatcher,
    source::{DeviceProfile, EdgeDevice},
};

const NODE_ID: &str = "FOG_NODE_CENTRAL";

/// Device pool whose profiles pin every reading to one vehicle count
fn pinned_pool(counts: &[u32]) -> Vec<Arc<EdgeDevice>> {
    let clock = Arc::new(FixedClock::new(1_000));
    counts
        .iter()
        .enumerate()
        .map(|(i, &count)| {
            Arc::new(EdgeDevice::new(
                DeviceProfile {
                    device_id: format!("CAM_{:03}", i + 1),
                    location: format!("Junction {}", i + 1),
                    vehicle_range: (count, count),
                    speed_range: None,
                },
                Arc::clone(&clock) as Arc<dyn fogwatch_core::time::Clock>,
            ))
        })
        .collect()
}

fn dispatcher_with(store: Arc<dyn StatsStore>, counts: &[u32]) -> (Dispatcher, Arc<FogEngine>) {
    let fog = Arc::new(FogEngine::new(NODE_ID, Box::new(FixedLatency::new(15))));
    let cloud = Arc::new(CloudAggregator::new(
        store,
        Box::new(FixedClock::new(9_000)),
    ));

    let dispatcher = Dispatcher::builder(Arc::clone(&fog), cloud)
        .devices(pinned_pool(counts))
        .delay(Arc::new(InstantDelay))
        .sink(Arc::new(LogSink::new(Box::new(FixedClock::new(9_000)))))
        .build();

    (dispatcher, fog)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn counters_advance_by_exactly_n() {
    for n in [1usize, 3, 5] {
        // Repeated runs: a lost update would only show intermittently
        for _ in 0..20 {
            let (dispatcher, fog) =
                dispatcher_with(Arc::new(MemoryStore::new()), &[10, 45, 65, 80, 95]);

            let before = fog.stats().counters;
            let batch = dispatcher.dispatch_batch(n).await.unwrap();
            let after = fog.stats().counters;

            assert_eq!(batch.results.len(), n);
            assert_eq!(after.total_processed - before.total_processed, n as u64);
            assert_eq!(
                (after.forwarded_to_cloud + after.filtered_locally)
                    - (before.forwarded_to_cloud + before.filtered_locally),
                n as u64
            );
            assert_eq!(
                after.total_processed,
                after.forwarded_to_cloud + after.filtered_locally
            );
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn forwarded_readings_reach_the_cloud() {
    // All five devices pinned above the forward threshold
    let (dispatcher, fog) =
        dispatcher_with(Arc::new(MemoryStore::new()), &[65, 70, 85, 95, 120]);

    let batch = dispatcher.dispatch_batch(5).await.unwrap();

    assert!(batch.results.iter().all(DeviceOutcome::is_success));
    for outcome in &batch.results {
        let DeviceOutcome::Pipeline(response) = outcome else {
            unreachable!();
        };
        assert!(response.forwarded);
        assert!(response.cloud_record.is_some());
    }

    let counters = fog.stats().counters;
    assert_eq!(counters.forwarded_to_cloud, 5);
    assert_eq!(counters.filtered_locally, 0);
    assert_eq!(dispatcher.cloud().records_stored(), 5);
}

/// Store that rejects appends for one location, to fail exactly one worker
struct SelectiveStore {
    inner: MemoryStore,
    poison_location: &'static str,
}

impl StatsStore for SelectiveStore {
    fn increment(&self, node_id: &str, field: CounterField) -> StoreResult<u64> {
        self.inner.increment(node_id, field)
    }

    fn append(&self, record: StoredRecord) -> StoreResult<u64> {
        if record.location == self.poison_location {
            return Err(StoreError::WriteFailed { reason: "simulated outage" });
        }
        self.inner.append(record)
    }

    fn query_recent(&self, node_id: &str, n: usize) -> StoreResult<Vec<StoredRecord>> {
        self.inner.query_recent(node_id, n)
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn one_failing_device_does_not_sink_the_batch() {
    let store = Arc::new(SelectiveStore {
        inner: MemoryStore::new(),
        poison_location: "Junction 1",
    });

    // Every device forwards; the first one's append will fail
    let (dispatcher, fog) =
        dispatcher_with(store as Arc<dyn StatsStore>, &[90, 91, 92, 93, 94]);

    let batch = dispatcher.dispatch_batch(5).await.unwrap();
    assert_eq!(batch.results.len(), 5);

    let failures: Vec<&DeviceOutcome> = batch
        .results
        .iter()
        .filter(|outcome| !outcome.is_success())
        .collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].device_id(), "CAM_001");

    // Siblings completed and were stored; the fog tier still counted all 5
    assert_eq!(dispatcher.cloud().records_stored(), 4);
    assert_eq!(fog.stats().counters.total_processed, 5);

    // The failure left a trace in the observability sink
    let errors = dispatcher
        .sink()
        .snapshot()
        .into_iter()
        .filter(|entry| entry.kind == LogKind::Error)
        .count();
    assert_eq!(errors, 1);
}

/// Store whose append crashes outright for one location
struct CrashingStore {
    inner: MemoryStore,
    poison_location: &'static str,
}

impl StatsStore for CrashingStore {
    fn increment(&self, node_id: &str, field: CounterField) -> StoreResult<u64> {
        self.inner.increment(node_id, field)
    }

    fn append(&self, record: StoredRecord) -> StoreResult<u64> {
        assert_ne!(record.location, self.poison_location, "simulated storage crash");
        self.inner.append(record)
    }

    fn query_recent(&self, node_id: &str, n: usize) -> StoreResult<Vec<StoredRecord>> {
        self.inner.query_recent(node_id, n)
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn a_panicking_worker_becomes_an_error_entry() {
    let store = Arc::new(CrashingStore {
        inner: MemoryStore::new(),
        poison_location: "Junction 2",
    });

    let (dispatcher, fog) =
        dispatcher_with(store as Arc<dyn StatsStore>, &[85, 86, 87, 88, 89]);

    let batch = dispatcher.dispatch_batch(5).await.unwrap();
    assert_eq!(batch.results.len(), 5);

    let failures: Vec<&DeviceOutcome> = batch
        .results
        .iter()
        .filter(|outcome| !outcome.is_success())
        .collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].device_id(), "CAM_002");
    let DeviceOutcome::Failed(error) = failures[0] else {
        unreachable!();
    };
    assert_eq!(error.message, "pipeline worker panicked");

    // The crash took down one task, not the batch
    assert_eq!(dispatcher.cloud().records_stored(), 4);
    assert_eq!(fog.stats().counters.total_processed, 5);
}

#[tokio::test]
async fn batch_result_serializes_per_contract() {
    let (dispatcher, _fog) =
        dispatcher_with(Arc::new(MemoryStore::new()), &[10, 20, 30, 80, 90]);

    let batch = dispatcher.dispatch_batch(2).await.unwrap();
    let json = serde_json::to_value(&batch).unwrap();

    assert_eq!(json["status"], "success");
    assert_eq!(json["requested_count"], 2);
    let results = json["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);

    for slot in results {
        assert_eq!(slot["status"], "success");
        let decision = slot["decision"].as_str().unwrap();
        assert!(decision == "Forward to Cloud" || decision == "Handle Locally");
        assert!(slot["latency_ms"]["edge_to_fog"].is_u64());
    }
}

#[tokio::test]
async fn log_sink_collects_pipeline_narrative() {
    let (dispatcher, _fog) = dispatcher_with(Arc::new(MemoryStore::new()), &[80]);

    // Pool of one device: batch of 1 is the largest valid request
    let batch = dispatcher.dispatch_batch(1).await.unwrap();
    assert!(batch.results[0].is_success());

    let entries = dispatcher.sink().snapshot();
    assert!(entries.iter().any(|e| e.message.starts_with("[EDGE]")));
    assert!(entries.iter().any(|e| e.message.starts_with("[FOG]")));
    assert!(entries.iter().any(|e| e.message.starts_with("[CLOUD]")));
}
