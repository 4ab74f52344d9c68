//! Single device pipeline pass
//!
//! Wires the full hierarchy (one fog node, the cloud tier, the default
//! device pool) and sends one randomly chosen device's reading through it,
//! printing the response the way a transport layer would emit it.
//!
//! Run with: cargo run --example 01_single_device

use std::sync::Arc;

use fogwatch_core::time::SystemClock;
use fogwatch_core::{CloudAggregator, FogEngine, MemoryStore, StatsStore};
use fogwatch_sim::{delay::UniformLatency, dispatch::Dispatcher};

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

    let outcome = dispatcher
        .dispatch_one()
        .await
        .expect("default pool is never empty");

    println!(
        "{}",
        serde_json::to_string_pretty(&outcome).expect("response serializes")
    );

    println!("\n--- fog node stats ---");
    println!(
        "{}",
        serde_json::to_string_pretty(&dispatcher.fog().stats()).expect("stats serialize")
    );
}
