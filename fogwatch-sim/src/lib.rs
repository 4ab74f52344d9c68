//! Device simulation and concurrent dispatch for FogWatch
//!
//! Sits on top of `fogwatch-core` and adds the moving parts of the
//! simulation: randomized edge devices, non-blocking transit delays, and
//! the dispatcher that fans a batch of device pipelines out to parallel
//! workers.
//!
//! ```no_run
//! use std::sync::Arc;
//! use fogwatch_core::{CloudAggregator, FogEngine, MemoryStore, StatsStore};
//! use fogwatch_core::time::SystemClock;
//! use fogwatch_sim::{delay::UniformLatency, dispatch::Dispatcher};
//!
//! # async fn demo() {
//! let store = Arc::new(MemoryStore::new());
//! let fog = Arc::new(FogEngine::new("FOG_NODE_CENTRAL", Box::new(UniformLatency)));
//! let cloud = Arc::new(CloudAggregator::new(
//!     store as Arc<dyn StatsStore>,
//!     Box::new(SystemClock),
//! ));
//!
//! let dispatcher = Dispatcher::builder(fog, cloud).build();
//! let batch = dispatcher.dispatch_batch(5).await.unwrap();
//! assert_eq!(batch.results.len(), 5);
//! # }
//! ```

pub mod delay;
pub mod dispatch;
pub mod source;

pub use delay::{InstantDelay, RandomDelay, TransitDelay, UniformLatency};
pub use dispatch::{DispatchError, Dispatcher, DispatcherBuilder, MAX_BATCH_DEVICES};
pub use source::{sample_devices, DeviceProfile, EdgeDevice, ReadingSource};
