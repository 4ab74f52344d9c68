//! Transport-Layer Response Contracts
//!
//! The shapes any surrounding web or export layer must preserve when it
//! reports a pipeline pass or a dispatched batch. They serialize exactly as
//! the UI consumes them, notably the decision strings `"Forward to Cloud"`
//! / `"Handle Locally"` and the lowercase `status` discriminants.

use serde::Serialize;

use crate::{
    cloud::CloudRecord,
    telemetry::{Decision, ProcessedReading},
};

/// Outcome discriminant carried by every response shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    /// The operation completed
    Success,
    /// The operation failed; see the accompanying message
    Error,
}

/// Latency attribution for one pipeline pass, in milliseconds
#[derive(Debug, Clone, Copy, Serialize)]
pub struct LatencyBreakdown {
    /// Edge device to fog node hop
    pub edge_to_fog: u32,
    /// Fog node to cloud hop; zero when the reading stayed local
    pub fog_to_cloud: u32,
    /// Sum of both hops
    pub total: u32,
}

impl LatencyBreakdown {
    /// Breakdown from the two hop figures
    pub fn new(edge_to_fog: u32, fog_to_cloud: u32) -> Self {
        Self {
            edge_to_fog,
            fog_to_cloud,
            total: edge_to_fog + fog_to_cloud,
        }
    }
}

/// Full result of one device's pipeline pass
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResponse {
    /// Always `Success`; failed passes become [`DeviceError`] entries
    pub status: ResponseStatus,
    /// The reading as the fog tier enriched it
    pub processed: ProcessedReading,
    /// Whether the reading reached the cloud tier
    pub forwarded: bool,
    /// The fog tier's routing decision
    pub decision: Decision,
    /// Cloud analytics, present iff forwarded and stored
    pub cloud_record: Option<CloudRecord>,
    /// Latency attribution for the pass
    pub latency_ms: LatencyBreakdown,
}

/// Error entry for a device whose pipeline failed
#[derive(Debug, Clone, Serialize)]
pub struct DeviceError {
    /// Always `Error`
    pub status: ResponseStatus,
    /// Device whose pipeline failed
    pub device_id: String,
    /// What went wrong
    pub message: String,
}

impl DeviceError {
    /// Error entry for `device_id`
    pub fn new(device_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Error,
            device_id: device_id.into(),
            message: message.into(),
        }
    }
}

/// Per-device slot in a batch result
///
/// Serializes untagged: a slot is either the full pipeline response or the
/// error entry, distinguished by its `status` field.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum DeviceOutcome {
    /// The device's pipeline completed
    Pipeline(Box<PipelineResponse>),
    /// The device's pipeline failed; siblings were not affected
    Failed(DeviceError),
}

impl DeviceOutcome {
    /// Whether this slot carries a completed pass
    pub fn is_success(&self) -> bool {
        matches!(self, DeviceOutcome::Pipeline(_))
    }

    /// Device the slot belongs to
    pub fn device_id(&self) -> &str {
        match self {
            DeviceOutcome::Pipeline(response) => &response.processed.device_id,
            DeviceOutcome::Failed(error) => &error.device_id,
        }
    }
}

/// Result of one dispatched batch
#[derive(Debug, Clone, Serialize)]
pub struct BatchResponse {
    /// `Success` when the batch ran; per-device failures live in `results`
    pub status: ResponseStatus,
    /// Devices the caller asked for; `results` always has exactly this many
    pub requested_count: usize,
    /// One outcome per dispatched device
    pub results: Vec<DeviceOutcome>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::CongestionLevel;

    fn processed() -> ProcessedReading {
        ProcessedReading {
            device_id: "CAM_001".into(),
            location: "Main Street Junction".into(),
            vehicle_count: 65,
            average_speed: None,
            generated_at: 1000,
            congestion_level: CongestionLevel::Medium,
            predicted_congestion: CongestionLevel::Medium,
            fog_node_id: "FOG_NODE_01".into(),
            fog_latency_ms: 15,
            processing_time_ms: 0.2,
        }
    }

    #[test]
    fn latency_breakdown_totals() {
        let latency = LatencyBreakdown::new(20, 75);
        assert_eq!(latency.total, 95);

        let local = LatencyBreakdown::new(20, 0);
        assert_eq!(local.total, 20);
    }

    #[test]
    fn pipeline_response_wire_shape() {
        let response = PipelineResponse {
            status: ResponseStatus::Success,
            processed: processed(),
            forwarded: true,
            decision: Decision::ForwardToCloud,
            cloud_record: None,
            latency_ms: LatencyBreakdown::new(12, 60),
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["decision"], "Forward to Cloud");
        assert_eq!(json["latency_ms"]["total"], 72);
        assert!(json["cloud_record"].is_null());
    }

    #[test]
    fn outcome_slots_serialize_untagged() {
        let failed = DeviceOutcome::Failed(DeviceError::new("CAM_002", "cloud storage failed"));
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["device_id"], "CAM_002");

        assert!(!failed.is_success());
        assert_eq!(failed.device_id(), "CAM_002");
    }
}
