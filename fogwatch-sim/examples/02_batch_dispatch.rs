//! Concurrent batch dispatch
//!
//! Fans all five sample devices out to parallel pipeline workers, waits for
//! the join barrier, then prints the per-device outcomes, the fog node's
//! counters, and the tail of the observability log.
//!
//! Run with: cargo run --example 02_batch_dispatch

use std::sync::Arc;

use fogwatch_core::time::SystemClock;
use fogwatch_core::{CloudAggregator, DeviceOutcome, FogEngine, MemoryStore, StatsStore};
use fogwatch_sim::{delay::UniformLatency, dispatch::Dispatcher, MAX_BATCH_DEVICES};

#[tokio::main]
async fn main() {
    env_logger::init();

    let store = Arc::new(MemoryStore::new());
    let fog = Arc::new(FogEngine::new(
        "FOG_NODE_CENTRAL",
        Box::new(UniformLatency),
    ));
    let cloud = Arc::new(CloudAggregator::new(
        store as Arc<dyn StatsStore>,
        Box::new(SystemClock),
    ));

    let dispatcher = Dispatcher::builder(fog, cloud).build();

    let batch = dispatcher
        .dispatch_batch(MAX_BATCH_DEVICES)
        .await
        .expect("batch size is within limits");

    for outcome in &batch.results {
        match outcome {
            DeviceOutcome::Pipeline(response) => println!(
                "{}: {} vehicles → {} (total {}ms)",
                response.processed.device_id,
                response.processed.vehicle_count,
                response.decision,
                response.latency_ms.total,
            ),
            DeviceOutcome::Failed(error) => {
                println!("{}: failed: {}", error.device_id, error.message)
            }
        }
    }

    let stats = dispatcher.fog().stats();
    println!("\n--- {} ---", stats.node_id);
    println!(
        "processed {} | to cloud {} | filtered {} | reduction {:.1}%",
        stats.counters.total_processed,
        stats.counters.forwarded_to_cloud,
        stats.counters.filtered_locally,
        stats.cloud_reduction_percent,
    );
    println!("cloud records stored: {}", dispatcher.cloud().records_stored());

    println!("\n--- log tail ---");
    for entry in dispatcher.sink().snapshot().iter().rev().take(8).rev() {
        println!("[{:?}] {}", entry.kind, entry.message);
    }
}
