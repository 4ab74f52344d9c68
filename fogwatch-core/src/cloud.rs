//! Cloud Aggregation Analytics
//!
//! ## Overview
//!
//! The cloud tier only ever sees readings the fog tier chose to forward,
//! which is what makes its heavier analytics affordable. For each forwarded
//! reading it:
//!
//! 1. Selects an action and recommendation from a fixed decision table
//! 2. Computes the rolling mean of the newest stored vehicle counts
//! 3. Labels the trend against that mean
//! 4. Durably appends the record, receiving a monotonic record id
//!
//! ## Failure Atomicity
//!
//! The analytics are computed from the previously stored records *plus* the
//! incoming value, so the durable append is the last fallible step. When it
//! fails the operation fails whole: no [`CloudRecord`] is returned, the
//! cumulative count does not advance, and the caller is told storage did
//! not occur. Nothing to roll back, nothing silently dropped.
//!
//! ## Decision Table
//!
//! Evaluated top to bottom on `(congestion_level, vehicle_count)`:
//!
//! | Condition            | Action              | Recommendation            |
//! |----------------------|---------------------|---------------------------|
//! | High or count > 80   | AlertTrafficControl | officers, alternate routes|
//! | Medium or count > 50 | MonitorClosely      | adjust signal timings     |
//! | otherwise            | NoAction            | continue monitoring       |

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use crate::{
    errors::CloudError,
    store::{StatsStore, StoredRecord},
    telemetry::{CongestionLevel, ProcessedReading},
    time::{Clock, Timestamp},
};

/// Vehicle count above which the alert action fires regardless of level.
pub const ALERT_COUNT_THRESHOLD: u32 = 80;

/// Vehicle count above which the monitor action fires regardless of level.
pub const MONITOR_COUNT_THRESHOLD: u32 = 50;

/// Records included in the rolling average, newest first.
pub const ROLLING_WINDOW: usize = 10;

const REC_ALERT: &str = "Deploy additional traffic officers and activate alternate routes";
const REC_MONITOR: &str = "Adjust traffic signal timings to improve flow";
const REC_NORMAL: &str = "Traffic flow is normal, continue monitoring";

/// Action the cloud tier recommends for a stored reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CloudAction {
    /// Traffic is normal
    NoAction,
    /// Elevated traffic, watch it
    MonitorClosely,
    /// Critical congestion, escalate
    AlertTrafficControl,
}

impl CloudAction {
    /// Get wire-format name
    pub const fn name(&self) -> &'static str {
        match self {
            CloudAction::NoAction => "NO_ACTION",
            CloudAction::MonitorClosely => "MONITOR_CLOSELY",
            CloudAction::AlertTrafficControl => "ALERT_TRAFFIC_CONTROL",
        }
    }
}

/// Direction of the latest reading against the rolling average
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    /// Latest count strictly above the rolling average
    Increasing,
    /// Latest count at or below the rolling average
    Decreasing,
}

/// Analytics record produced for one forwarded reading
#[derive(Debug, Clone, Serialize)]
pub struct CloudRecord {
    /// Monotonic id assigned by the durable store (1-based)
    pub record_id: u64,
    /// The reading as the fog tier enriched it
    pub processed: ProcessedReading,
    /// Selected action
    pub action: CloudAction,
    /// Operator-facing recommendation
    pub recommendation: &'static str,
    /// Mean vehicle count over the newest stored records, this one included
    pub average_recent: f64,
    /// Direction of this reading against that mean
    pub trend: Trend,
    /// When the record was stored
    pub stored_at: Timestamp,
}

/// Aggregate view of the cloud tier's activity
#[derive(Debug, Clone, Serialize)]
pub struct CloudSummary {
    /// Records stored since startup
    pub total_records: u64,
    /// Most recent record, if any
    pub latest: Option<CloudRecord>,
}

/// Select action and recommendation for a reading
///
/// Pure function of the level and count; rows are evaluated in order.
pub fn select_action(level: CongestionLevel, vehicle_count: u32) -> (CloudAction, &'static str) {
    if level == CongestionLevel::High || vehicle_count > ALERT_COUNT_THRESHOLD {
        (CloudAction::AlertTrafficControl, REC_ALERT)
    } else if level == CongestionLevel::Medium || vehicle_count > MONITOR_COUNT_THRESHOLD {
        (CloudAction::MonitorClosely, REC_MONITOR)
    } else {
        (CloudAction::NoAction, REC_NORMAL)
    }
}

/// Heavy-analytics tier consuming forwarded readings
pub struct CloudAggregator {
    store: Arc<dyn StatsStore>,
    clock: Box<dyn Clock>,
    stored: AtomicU64,
    latest: Mutex<Option<CloudRecord>>,
}

impl CloudAggregator {
    /// Create an aggregator persisting through `store`, stamping with `clock`
    pub fn new(store: Arc<dyn StatsStore>, clock: Box<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            stored: AtomicU64::new(0),
            latest: Mutex::new(None),
        }
    }

    /// Store a forwarded reading and return its analytics record
    ///
    /// Only called for readings the fog engine marked for forwarding. Fails
    /// whole on store errors: no record, no count advance.
    pub fn store(&self, processed: &ProcessedReading) -> Result<CloudRecord, CloudError> {
        let previous = self
            .store
            .query_recent(&processed.fog_node_id, ROLLING_WINDOW - 1)?;

        let mut sum = processed.vehicle_count as f64;
        for record in &previous {
            sum += record.vehicle_count as f64;
        }
        let average_recent = sum / (previous.len() + 1) as f64;

        let trend = if (processed.vehicle_count as f64) > average_recent {
            Trend::Increasing
        } else {
            Trend::Decreasing
        };

        let (action, recommendation) = select_action(
            processed.congestion_level,
            processed.vehicle_count,
        );

        let stored_at = self.clock.now();

        // Last fallible step: nothing above has been made observable yet
        let record_id = self.store.append(StoredRecord {
            node_id: processed.fog_node_id.clone(),
            device_id: processed.device_id.clone(),
            location: processed.location.clone(),
            vehicle_count: processed.vehicle_count,
            congestion_level: processed.congestion_level,
            stored_at,
        })?;

        self.stored.fetch_add(1, Ordering::Relaxed);

        let record = CloudRecord {
            record_id,
            processed: processed.clone(),
            action,
            recommendation,
            average_recent,
            trend,
            stored_at,
        };

        log::info!(
            "stored record {} from {}: action {}, average {:.2}",
            record_id,
            processed.device_id,
            action.name(),
            average_recent,
        );

        *self.latest() = Some(record.clone());
        Ok(record)
    }

    /// Records stored since startup
    pub fn records_stored(&self) -> u64 {
        self.stored.load(Ordering::Relaxed)
    }

    /// Summary of the tier's activity
    pub fn summary(&self) -> CloudSummary {
        CloudSummary {
            total_records: self.records_stored(),
            latest: self.latest().clone(),
        }
    }

    fn latest(&self) -> MutexGuard<'_, Option<CloudRecord>> {
        self.latest.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
