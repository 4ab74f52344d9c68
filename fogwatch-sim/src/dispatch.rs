//! Concurrent Batch Dispatcher
//!
//! ## Overview
//!
//! The dispatcher fans a batch of device pipelines out to independent tokio
//! tasks and joins them all before assembling one aggregate result:
//!
//! ```text
//!             ┌→ worker: CAM_002 → fog → cloud ──┐
//! dispatch ───┼→ worker: CAM_004 → fog ──────────┼──→ join all → batch
//!             └→ worker: CAM_005 → fog → cloud ──┘
//! ```
//!
//! Each worker runs the full pass for exactly one device: generate a
//! reading, wait out the edge→fog hop, run the fog engine, and (only for
//! forwarded readings) wait out the fog→cloud hop and store in the cloud
//! tier. Workers share the fog engine, the cloud aggregator, and the log
//! sink through `Arc`s; all three serialize their own mutations, so the
//! dispatcher never touches counters directly.
//!
//! ## Isolation Guarantees
//!
//! - A worker failure (storage error, even a panic) becomes that device's
//!   error entry; siblings run to completion and appear in the result.
//! - The batch result always holds exactly `count` entries.
//! - The join loop is a bulk-synchronous barrier: nothing is assembled
//!   until every worker has finished.
//! - A device's transit delays are awaited on the timer, not slept, so one
//!   slow hop never stalls another device's pipeline.

use std::sync::Arc;

use rand::seq::SliceRandom;
use thiserror::Error;

use fogwatch_core::{
    errors::CloudError,
    latency::{EDGE_TO_FOG, FOG_TO_CLOUD},
    logsink::LogKind,
    time::SystemClock,
    BatchResponse, CloudAggregator, DeviceError, DeviceOutcome, FogEngine, LatencyBreakdown,
    LogSink, PipelineResponse, ResponseStatus,
};

use crate::{
    delay::{RandomDelay, TransitDelay},
    source::{sample_devices, DeviceProfile, EdgeDevice, ReadingSource},
};

/// Most devices one batch may fan out to.
pub const MAX_BATCH_DEVICES: usize = 5;

/// Batch-level dispatch failures
///
/// Per-device failures never surface here; they become error entries in
/// the batch result.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// Requested batch size is outside the allowed range
    #[error("batch size {requested} outside 1..={limit}")]
    InvalidCount {
        /// What the caller asked for
        requested: usize,
        /// Largest allowed batch
        limit: usize,
    },

    /// More devices requested than the pool holds
    #[error("device pool holds {available} devices, {requested} requested")]
    PoolExhausted {
        /// What the caller asked for
        requested: usize,
        /// Pool size
        available: usize,
    },
}

/// Fans device pipelines out to parallel workers and joins the results
pub struct Dispatcher {
    devices: Vec<Arc<EdgeDevice>>,
    fog: Arc<FogEngine>,
    cloud: Arc<CloudAggregator>,
    delay: Arc<dyn TransitDelay>,
    sink: Arc<LogSink>,
}

impl Dispatcher {
    /// Start building a dispatcher around the two stateful tiers
    pub fn builder(fog: Arc<FogEngine>, cloud: Arc<CloudAggregator>) -> DispatcherBuilder {
        DispatcherBuilder::new(fog, cloud)
    }

    /// Run pipelines for `count` distinct devices in parallel
    ///
    /// Selects `count` devices without replacement, launches one worker per
    /// device, and blocks until every worker completed. The result carries
    /// exactly `count` entries, success or error.
    pub async fn dispatch_batch(&self, count: usize) -> Result<BatchResponse, DispatchError> {
        if count == 0 || count > MAX_BATCH_DEVICES {
            return Err(DispatchError::InvalidCount {
                requested: count,
                limit: MAX_BATCH_DEVICES,
            });
        }
        if count > self.devices.len() {
            return Err(DispatchError::PoolExhausted {
                requested: count,
                available: self.devices.len(),
            });
        }

        let selected: Vec<Arc<EdgeDevice>> = self
            .devices
            .choose_multiple(&mut rand::thread_rng(), count)
            .cloned()
            .collect();

        let mut workers = Vec::with_capacity(count);
        for device in selected {
            let device_id = device.device_id().to_owned();
            let worker = tokio::spawn(run_pipeline(
                device,
                Arc::clone(&self.fog),
                Arc::clone(&self.cloud),
                Arc::clone(&self.delay),
                Arc::clone(&self.sink),
            ));
            workers.push((device_id, worker));
        }

        // Join barrier: every worker lands in `results` before assembly
        let mut results = Vec::with_capacity(count);
        for (device_id, worker) in workers {
            let outcome = match worker.await {
                Ok(Ok(response)) => DeviceOutcome::Pipeline(Box::new(response)),
                Ok(Err(err)) => {
                    log::warn!("pipeline for {device_id} failed: {err}");
                    DeviceOutcome::Failed(DeviceError::new(&device_id, err.to_string()))
                }
                Err(join_err) => {
                    let message = if join_err.is_panic() {
                        "pipeline worker panicked".to_owned()
                    } else {
                        join_err.to_string()
                    };
                    log::error!("pipeline for {device_id} died: {message}");
                    self.sink
                        .push(LogKind::Error, format!("[ERROR] {device_id}: {message}"));
                    DeviceOutcome::Failed(DeviceError::new(&device_id, message))
                }
            };
            results.push(outcome);
        }

        Ok(BatchResponse {
            status: ResponseStatus::Success,
            requested_count: count,
            results,
        })
    }

    /// Run the pipeline for one randomly chosen device
    pub async fn dispatch_one(&self) -> Result<DeviceOutcome, DispatchError> {
        let device = self
            .devices
            .choose(&mut rand::thread_rng())
            .cloned()
            .ok_or(DispatchError::PoolExhausted {
                requested: 1,
                available: 0,
            })?;

        let device_id = device.device_id().to_owned();
        let outcome = match run_pipeline(
            device,
            Arc::clone(&self.fog),
            Arc::clone(&self.cloud),
            Arc::clone(&self.delay),
            Arc::clone(&self.sink),
        )
        .await
        {
            Ok(response) => DeviceOutcome::Pipeline(Box::new(response)),
            Err(err) => DeviceOutcome::Failed(DeviceError::new(device_id, err.to_string())),
        };

        Ok(outcome)
    }

    /// Profile snapshots of the device pool
    pub fn device_info(&self) -> Vec<DeviceProfile> {
        self.devices.iter().map(|device| device.info()).collect()
    }

    /// The fog tier the dispatcher feeds
    pub fn fog(&self) -> &FogEngine {
        &self.fog
    }

    /// The cloud tier forwarded readings land in
    pub fn cloud(&self) -> &CloudAggregator {
        &self.cloud
    }

    /// The shared observability sink
    pub fn sink(&self) -> &LogSink {
        &self.sink
    }
}

/// One device's full pipeline pass
///
/// Runs inside its own task; everything here is either task-local or
/// reached through a tier that serializes its own state.
async fn run_pipeline(
    device: Arc<EdgeDevice>,
    fog: Arc<FogEngine>,
    cloud: Arc<CloudAggregator>,
    delay: Arc<dyn TransitDelay>,
    sink: Arc<LogSink>,
) -> Result<PipelineResponse, CloudError> {
    let reading = device.generate();
    sink.push(
        LogKind::Info,
        format!(
            "[EDGE] {} generated data: {} vehicles at {}",
            reading.device_id, reading.vehicle_count, reading.location
        ),
    );

    let edge_to_fog = delay.pause(EDGE_TO_FOG).await;
    sink.push(LogKind::Success, format!("[LATENCY] Edge → Fog: {edge_to_fog}ms"));

    let decision = fog.process(&reading);
    sink.push(
        LogKind::Info,
        format!(
            "[FOG] Processing complete. Congestion: {}",
            decision.processed.congestion_level
        ),
    );

    let forwarded = decision.forward;
    let routing = decision.decision();

    let (cloud_record, fog_to_cloud) = if forwarded {
        let fog_to_cloud = delay.pause(FOG_TO_CLOUD).await;
        sink.push(LogKind::Warning, format!("[LATENCY] Fog → Cloud: {fog_to_cloud}ms"));

        match cloud.store(&decision.processed) {
            Ok(record) => {
                sink.push(
                    LogKind::Warning,
                    format!("[CLOUD] Data stored. Action: {}", record.action.name()),
                );
                (Some(record), fog_to_cloud)
            }
            Err(err) => {
                sink.push(
                    LogKind::Error,
                    format!("[CLOUD] Storage failed for {}: {err}", reading.device_id),
                );
                return Err(err);
            }
        }
    } else {
        sink.push(
            LogKind::Success,
            "[FOG] Normal traffic handled locally. Cloud processing not needed",
        );
        (None, 0)
    };

    Ok(PipelineResponse {
        status: ResponseStatus::Success,
        processed: decision.processed,
        forwarded,
        decision: routing,
        cloud_record,
        latency_ms: LatencyBreakdown::new(edge_to_fog, fog_to_cloud),
    })
}

/// Builder wiring a dispatcher's collaborators
///
/// Defaults: the five-device sample pool, production random delays, and a
/// fresh wall-clock log sink.
pub struct DispatcherBuilder {
    devices: Option<Vec<Arc<EdgeDevice>>>,
    fog: Arc<FogEngine>,
    cloud: Arc<CloudAggregator>,
    delay: Arc<dyn TransitDelay>,
    sink: Option<Arc<LogSink>>,
}

impl DispatcherBuilder {
    /// Builder around the two stateful tiers
    pub fn new(fog: Arc<FogEngine>, cloud: Arc<CloudAggregator>) -> Self {
        Self {
            devices: None,
            fog,
            cloud,
            delay: Arc::new(RandomDelay),
            sink: None,
        }
    }

    /// Use a specific device pool
    pub fn devices(mut self, devices: Vec<Arc<EdgeDevice>>) -> Self {
        self.devices = Some(devices);
        self
    }

    /// Use a specific delay strategy (tests pass [`InstantDelay`])
    ///
    /// [`InstantDelay`]: crate::delay::InstantDelay
    pub fn delay(mut self, delay: Arc<dyn TransitDelay>) -> Self {
        self.delay = delay;
        self
    }

    /// Share an existing log sink
    pub fn sink(mut self, sink: Arc<LogSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Build the dispatcher
    pub fn build(self) -> Dispatcher {
        Dispatcher {
            devices: self
                .devices
                .unwrap_or_else(|| sample_devices(Arc::new(SystemClock))),
            fog: self.fog,
            cloud: self.cloud,
            delay: self.delay,
            sink: self
                .sink
                .unwrap_or_else(|| Arc::new(LogSink::new(Box::new(SystemClock)))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delay::InstantDelay;
    use fogwatch_core::latency::FixedLatency;
    use fogwatch_core::time::FixedClock;
    use fogwatch_core::{MemoryStore, StatsStore};

    fn dispatcher() -> Dispatcher {
        let store = Arc::new(MemoryStore::new());
        let fog = Arc::new(FogEngine::new(
            "FOG_NODE_CENTRAL",
            Box::new(FixedLatency::new(15)),
        ));
        let cloud = Arc::new(CloudAggregator::new(
            store as Arc<dyn StatsStore>,
            Box::new(FixedClock::new(9_000)),
        ));

        Dispatcher::builder(fog, cloud)
            .delay(Arc::new(InstantDelay))
            .sink(Arc::new(LogSink::new(Box::new(FixedClock::new(9_000)))))
            .build()
    }

    #[tokio::test]
    async fn batch_size_is_validated() {
        let dispatcher = dispatcher();

        let zero = dispatcher.dispatch_batch(0).await.unwrap_err();
        assert!(matches!(zero, DispatchError::InvalidCount { requested: 0, .. }));

        let six = dispatcher.dispatch_batch(6).await.unwrap_err();
        assert!(matches!(six, DispatchError::InvalidCount { requested: 6, .. }));
    }

    #[tokio::test]
    async fn batch_returns_one_entry_per_device() {
        let dispatcher = dispatcher();

        let batch = dispatcher.dispatch_batch(3).await.unwrap();
        assert_eq!(batch.requested_count, 3);
        assert_eq!(batch.results.len(), 3);
        assert_eq!(batch.status, ResponseStatus::Success);

        // Without replacement: all selected devices are distinct
        let mut ids: Vec<&str> = batch.results.iter().map(|r| r.device_id()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 3);
    }

    #[tokio::test]
    async fn instant_delays_surface_in_the_breakdown() {
        let dispatcher = dispatcher();

        let outcome = dispatcher.dispatch_one().await.unwrap();
        let DeviceOutcome::Pipeline(response) = outcome else {
            panic!("single dispatch should succeed with a memory store");
        };

        assert_eq!(response.latency_ms.edge_to_fog, EDGE_TO_FOG.min_ms);
        if response.forwarded {
            assert_eq!(response.latency_ms.fog_to_cloud, FOG_TO_CLOUD.min_ms);
            assert!(response.cloud_record.is_some());
        } else {
            assert_eq!(response.latency_ms.fog_to_cloud, 0);
            assert!(response.cloud_record.is_none());
        }
        assert_eq!(
            response.latency_ms.total,
            response.latency_ms.edge_to_fog + response.latency_ms.fog_to_cloud
        );
    }
}
