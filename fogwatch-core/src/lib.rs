//! Core decision and analytics engine for FogWatch
//!
//! Simulates the stateful tiers of an edge → fog → cloud traffic telemetry
//! hierarchy: the fog engine classifies and filters readings, the cloud
//! aggregator runs rolling analytics on whatever the fog tier forwards.
//!
//! Key properties:
//! - Fog counters and history mutate as one unit under one lock
//! - Cloud storage fails whole or succeeds whole
//! - Every latency figure comes from an injectable model
//!
//! ```no_run
//! use fogwatch_core::{FogEngine, Reading, latency::FixedLatency};
//!
//! let engine = FogEngine::new("FOG_NODE_01", Box::new(FixedLatency::new(15)));
//!
//! let reading = Reading {
//!     device_id: "CAM_001".into(),
//!     location: "Main Street Junction".into(),
//!     vehicle_count: 82,
//!     average_speed: Some(24.0),
//!     generated_at: 0,
//! };
//!
//! let decision = engine.process(&reading);
//! assert!(decision.forward); // 82 vehicles is High congestion
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod cloud;
pub mod errors;
pub mod fog;
pub mod history;
pub mod latency;
pub mod logsink;
pub mod response;
pub mod store;
pub mod telemetry;
pub mod time;

// Public API
pub use cloud::{CloudAction, CloudAggregator, CloudRecord, CloudSummary, Trend};
pub use errors::{CloudError, StoreError};
pub use fog::{FogCounters, FogDecision, FogEngine, FogStats};
pub use logsink::{LogEntry, LogKind, LogSink};
pub use response::{
    BatchResponse, DeviceError, DeviceOutcome, LatencyBreakdown, PipelineResponse, ResponseStatus,
};
pub use store::{CounterField, MemoryStore, StatsStore, StoredRecord};
pub use telemetry::{CongestionLevel, Decision, ProcessedReading, Reading};

/// Crate version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_exists() {
        assert!(!VERSION.is_empty());
    }
}
