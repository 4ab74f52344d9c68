//! Fog Decision Engine
//!
//! ## Overview
//!
//! The fog node is the low-latency tier between edge devices and the cloud.
//! For every reading it performs four pieces of work, all cheap enough to
//! run inline:
//!
//! 1. **Classify** the congestion level from the vehicle count
//! 2. **Predict** the next interval's level from a short rolling history
//! 3. **Decide** whether the reading is worth cloud analytics
//! 4. **Count** the decision, keeping the node's statistics consistent
//!
//! ```text
//! Reading ──→ classify ──→ predict ──→ decide ──┬──→ Forward to Cloud
//!                 │            │                └──→ Handle Locally
//!                 └────── history window ──→ counters
//! ```
//!
//! ## Concurrency Contract
//!
//! Multiple device pipelines call [`FogEngine::process`] concurrently. The
//! engine owns its mutable state (the history window and the counters) in
//! a single mutex-guarded state object. One lock acquisition covers the
//! history append, the prediction, the forwarding decision, and the counter
//! update, so no caller can ever observe counters that disagree with a
//! decision. The critical section is pure arithmetic and never blocks.
//!
//! Callers get read access to the counters only through
//! [`FogEngine::stats`], which returns a snapshot; raw mutable state is
//! never exposed.
//!
//! ## Forwarding Policy
//!
//! A reading is forwarded when its classification is `High` OR its count
//! exceeds [`FORWARD_COUNT_THRESHOLD`]. Since `High` starts at 70 and the
//! count clause starts at 61, the clause only matters for `Medium` readings
//! in the 61..=69 band. The overlap is kept as literal policy.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use serde::Serialize;

use crate::{
    history::TrendHistory,
    latency::{LatencyModel, FOG_TRANSIT},
    telemetry::{
        CongestionLevel, Decision, ProcessedReading, Reading, FORWARD_COUNT_THRESHOLD,
        PREDICTED_COUNT_CEILING,
    },
};

/// Per-node decision counters
///
/// Invariant: `total_processed == forwarded_to_cloud + filtered_locally`
/// at every observable point, and all three only grow. The engine enforces
/// this by updating them in the same critical section as the decision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FogCounters {
    /// Readings this node has processed
    pub total_processed: u64,
    /// Readings forwarded to the cloud tier
    pub forwarded_to_cloud: u64,
    /// Readings filtered at the fog tier
    pub filtered_locally: u64,
}

impl FogCounters {
    /// Record one decision
    pub fn record(&mut self, forwarded: bool) {
        self.total_processed += 1;
        if forwarded {
            self.forwarded_to_cloud += 1;
        } else {
            self.filtered_locally += 1;
        }
    }

    /// Share of readings the fog tier kept away from the cloud
    pub fn cloud_reduction_percent(&self) -> f64 {
        if self.total_processed == 0 {
            return 0.0;
        }
        self.filtered_locally as f64 / self.total_processed as f64 * 100.0
    }
}

/// Snapshot of a fog node's statistics
#[derive(Debug, Clone, Serialize)]
pub struct FogStats {
    /// Node the snapshot describes
    pub node_id: String,
    /// Decision counters at snapshot time
    #[serde(flatten)]
    pub counters: FogCounters,
    /// Share of readings handled without cloud involvement
    pub cloud_reduction_percent: f64,
    /// Entries currently in the trend history window
    pub history_len: usize,
}

/// Outcome of processing one reading
#[derive(Debug, Clone)]
pub struct FogDecision {
    /// The enriched reading
    pub processed: ProcessedReading,
    /// Whether the reading goes to the cloud tier
    pub forward: bool,
}

impl FogDecision {
    /// The routing decision as a wire-shaped value
    pub fn decision(&self) -> Decision {
        if self.forward {
            Decision::ForwardToCloud
        } else {
            Decision::HandleLocally
        }
    }
}

/// Engine state mutated by concurrent pipelines, guarded as one unit
struct NodeState {
    history: TrendHistory,
    counters: FogCounters,
}

/// Stateful classifier and filter for one fog node
pub struct FogEngine {
    node_id: String,
    latency: Box<dyn LatencyModel>,
    state: Mutex<NodeState>,
}

impl FogEngine {
    /// Create an engine for `node_id` with the given latency model
    pub fn new(node_id: impl Into<String>, latency: Box<dyn LatencyModel>) -> Self {
        Self {
            node_id: node_id.into(),
            latency,
            state: Mutex::new(NodeState {
                history: TrendHistory::new(),
                counters: FogCounters::default(),
            }),
        }
    }

    /// Node this engine speaks for
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// Process one reading: classify, predict, decide, count
    ///
    /// Infallible by contract: malformed input was already defaulted by the
    /// reading source, and out-of-range counts are classified, not rejected.
    pub fn process(&self, reading: &Reading) -> FogDecision {
        let started = Instant::now();

        let classification = CongestionLevel::classify(reading.vehicle_count);
        let fog_latency_ms = self.latency.draw(FOG_TRANSIT);

        let (predicted, forward) = {
            let mut state = self.state();

            state.history.push(reading.vehicle_count);
            let predicted = match state.history.trend() {
                None => classification,
                Some(trend) => {
                    let projected = (reading.vehicle_count as f64 + trend)
                        .clamp(0.0, PREDICTED_COUNT_CEILING);
                    CongestionLevel::classify_value(projected)
                }
            };

            let forward = Self::should_forward(classification, reading.vehicle_count);
            state.counters.record(forward);

            (predicted, forward)
        };

        let processing_time_ms = started.elapsed().as_secs_f64() * 1000.0;

        let processed = ProcessedReading {
            device_id: reading.device_id.clone(),
            location: reading.location.clone(),
            vehicle_count: reading.vehicle_count,
            average_speed: reading.average_speed,
            generated_at: reading.generated_at,
            congestion_level: classification,
            predicted_congestion: predicted,
            fog_node_id: self.node_id.clone(),
            fog_latency_ms,
            processing_time_ms,
        };

        log::debug!(
            "{}: {} vehicles at {} → {} ({}), predicted {}",
            self.node_id,
            reading.vehicle_count,
            reading.location,
            classification,
            if forward { "forward" } else { "local" },
            predicted,
        );

        FogDecision { processed, forward }
    }

    /// Forwarding policy: `High`, or any count above the forward threshold
    ///
    /// The count clause overlaps the `High` threshold; it only adds the
    /// `Medium` band 61..=69. Preserved as literal policy.
    pub fn should_forward(level: CongestionLevel, vehicle_count: u32) -> bool {
        level == CongestionLevel::High || vehicle_count > FORWARD_COUNT_THRESHOLD
    }

    /// Snapshot of the node's counters and window occupancy
    pub fn stats(&self) -> FogStats {
        let state = self.state();
        FogStats {
            node_id: self.node_id.clone(),
            counters: state.counters,
            cloud_reduction_percent: state.counters.cloud_reduction_percent(),
            history_len: state.history.len(),
        }
    }

    /// Clear counters and history; the explicit external reset operation
    pub fn reset(&self) {
        let mut state = self.state();
        state.history.clear();
        state.counters = FogCounters::default();
    }

    /// Lock the node state
    ///
    /// A poisoned mutex only means another caller panicked mid-section; the
    /// state itself is a consistent unit, so recover the guard and continue.
    fn state(&self) -> MutexGuard<'_, NodeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
