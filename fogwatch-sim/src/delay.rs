//! Transit Delay Strategies
//!
//! ## Overview
//!
//! The hops between tiers take time; the simulation models that time as a
//! non-blocking wait attributed to one device's pipeline. The wait is
//! behind the [`TransitDelay`] trait so production runs sleep for a drawn
//! interval while tests run batches with zero wall-clock delay.
//!
//! Because the waits are `await`s on the tokio timer, a slow hop for one
//! device never blocks its siblings, which is the dispatcher's whole point.
//!
//! This module also provides [`UniformLatency`], the production model for
//! the fog engine's *reported* latency figure (core keeps the trait; the
//! random draw lives here with the rest of the RNG usage).

use async_trait::async_trait;
use rand::Rng;

use fogwatch_core::latency::{LatencyModel, LatencyWindow};

/// Non-blocking wait for one hop crossing
#[async_trait]
pub trait TransitDelay: Send + Sync {
    /// Wait out one crossing of `window`, returning the drawn milliseconds
    async fn pause(&self, window: LatencyWindow) -> u32;
}

/// Production delay: uniform draw, real timer sleep
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomDelay;

#[async_trait]
impl TransitDelay for RandomDelay {
    async fn pause(&self, window: LatencyWindow) -> u32 {
        let ms = rand::thread_rng().gen_range(window.min_ms..=window.max_ms);
        tokio::time::sleep(std::time::Duration::from_millis(ms as u64)).await;
        ms
    }
}

/// Test delay: reports the window's floor, never sleeps
#[derive(Debug, Clone, Copy, Default)]
pub struct InstantDelay;

#[async_trait]
impl TransitDelay for InstantDelay {
    async fn pause(&self, window: LatencyWindow) -> u32 {
        window.min_ms
    }
}

/// Production model for the fog engine's reported transit latency
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformLatency;

impl LatencyModel for UniformLatency {
    fn draw(&self, window: LatencyWindow) -> u32 {
        rand::thread_rng().gen_range(window.min_ms..=window.max_ms)
    }
}
