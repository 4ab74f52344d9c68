//! Telemetry Types for the Edge → Fog → Cloud Pipeline
//!
//! ## Overview
//!
//! This module defines the data that flows through FogWatch's three-tier
//! hierarchy. Each tier consumes the previous tier's output and enriches it:
//!
//! ```text
//! Edge Device → Reading → Fog Engine → ProcessedReading → Cloud Aggregator
//!                  ↓                        ↓                    ↓
//!              raw counts            classification        CloudRecord
//! ```
//!
//! ## Immutability
//!
//! A [`Reading`] is created once by an edge device and consumed within a
//! single pipeline pass. A [`ProcessedReading`] is created exclusively by the
//! fog engine and never mutated afterwards; the cloud tier only reads it.
//! This write-once discipline is what lets the concurrent dispatcher hand
//! these values between tasks without any locking: each device's data is
//! exclusively owned by its own pipeline.
//!
//! ## Classification Thresholds
//!
//! Congestion classification is a pure function of `vehicle_count` with fixed
//! boundaries. Both boundaries are inclusive on the upper side:
//!
//! ```text
//! count:   0 ......... 29 | 30 ......... 69 | 70 .........
//! level:        Low       |     Medium      |     High
//! ```
//!
//! The forwarding policy additionally forwards any reading above
//! [`FORWARD_COUNT_THRESHOLD`] vehicles, which makes `Medium` readings
//! forward-eligible only inside the 61..=69 band. That overlap is deliberate
//! policy, kept as-is.

use serde::{Deserialize, Serialize};

use crate::time::Timestamp;

/// Vehicle count at which classification moves from `Low` to `Medium`.
pub const MEDIUM_CONGESTION_THRESHOLD: u32 = 30;

/// Vehicle count at which classification moves from `Medium` to `High`.
pub const HIGH_CONGESTION_THRESHOLD: u32 = 70;

/// Vehicle count above which a reading is forwarded to the cloud tier
/// regardless of its congestion level.
pub const FORWARD_COUNT_THRESHOLD: u32 = 60;

/// Upper clamp applied to predicted vehicle counts before classification.
pub const PREDICTED_COUNT_CEILING: f64 = 120.0;

/// Discrete congestion classification of a traffic volume
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CongestionLevel {
    /// Fewer than 30 vehicles
    Low,
    /// 30 to 69 vehicles
    Medium,
    /// 70 vehicles or more
    High,
}

impl CongestionLevel {
    /// Classify a raw vehicle count.
    ///
    /// Pure function of the count; out-of-range values are simply classified,
    /// never rejected.
    pub fn classify(vehicle_count: u32) -> Self {
        Self::classify_value(vehicle_count as f64)
    }

    /// Classify a continuous vehicle-count value.
    ///
    /// Used for predicted counts, which carry a fractional trend component.
    pub fn classify_value(value: f64) -> Self {
        if value < MEDIUM_CONGESTION_THRESHOLD as f64 {
            CongestionLevel::Low
        } else if value < HIGH_CONGESTION_THRESHOLD as f64 {
            CongestionLevel::Medium
        } else {
            CongestionLevel::High
        }
    }

    /// Get human-readable name
    pub const fn name(&self) -> &'static str {
        match self {
            CongestionLevel::Low => "Low",
            CongestionLevel::Medium => "Medium",
            CongestionLevel::High => "High",
        }
    }
}

impl core::fmt::Display for CongestionLevel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// Fog-tier routing decision for one reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    /// Reading crosses the forwarding policy; cloud analytics run on it
    #[serde(rename = "Forward to Cloud")]
    ForwardToCloud,
    /// Reading is filtered at the fog tier; no cloud processing needed
    #[serde(rename = "Handle Locally")]
    HandleLocally,
}

impl Decision {
    /// Get human-readable name
    pub const fn name(&self) -> &'static str {
        match self {
            Decision::ForwardToCloud => "Forward to Cloud",
            Decision::HandleLocally => "Handle Locally",
        }
    }
}

impl core::fmt::Display for Decision {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

fn unknown_label() -> String {
    "Unknown".to_owned()
}

/// Raw telemetry reading produced by one edge device
///
/// Ephemeral: created by the reading source, consumed by the fog engine
/// within the same pipeline pass. Malformed upstream payloads are tolerated
/// at this boundary: missing fields deserialize to zero/`"Unknown"`
/// defaults rather than failing the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reading {
    /// Producing device (e.g. "CAM_001")
    #[serde(default = "unknown_label")]
    pub device_id: String,
    /// Monitored location (e.g. "Main Street Junction")
    #[serde(default = "unknown_label")]
    pub location: String,
    /// Number of vehicles detected; non-negative by construction
    #[serde(default)]
    pub vehicle_count: u32,
    /// Average vehicle speed in km/h, when the device measures it
    #[serde(default)]
    pub average_speed: Option<f32>,
    /// When the device produced the reading (milliseconds)
    #[serde(default)]
    pub generated_at: Timestamp,
}

/// A reading enriched by the fog tier
///
/// Created exclusively by the fog engine; never mutated afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessedReading {
    /// Producing device
    pub device_id: String,
    /// Monitored location
    pub location: String,
    /// Number of vehicles detected
    pub vehicle_count: u32,
    /// Average vehicle speed in km/h, when measured
    pub average_speed: Option<f32>,
    /// When the device produced the reading
    pub generated_at: Timestamp,
    /// Congestion classification of this reading
    pub congestion_level: CongestionLevel,
    /// Predicted congestion for the next interval, from the node's history
    pub predicted_congestion: CongestionLevel,
    /// Fog node that processed the reading
    pub fog_node_id: String,
    /// Simulated fog transit latency, reported not awaited
    pub fog_latency_ms: u32,
    /// Wall-clock time the fog engine spent on this reading
    pub processing_time_ms: f64,
}
