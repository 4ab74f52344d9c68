//! Time management for the simulation
//!
//! Provides a clock abstraction so production code stamps readings with wall
//! clock time while tests pin time to fixed values.

use std::sync::atomic::{AtomicU64, Ordering};

/// Timestamp in milliseconds since epoch
pub type Timestamp = u64;

/// Source of timestamps for readings, records, and log entries
pub trait Clock: Send + Sync {
    /// Current timestamp in milliseconds
    fn now(&self) -> Timestamp;
}

/// Wall clock backed by the operating system
#[derive(Debug, Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        use std::time::{SystemTime, UNIX_EPOCH};

        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as Timestamp
    }
}

/// Fixed clock for testing
///
/// Interior mutability so a shared clock can be advanced mid-test.
#[derive(Debug, Default)]
pub struct FixedClock {
    timestamp: AtomicU64,
}

impl FixedClock {
    /// Create a clock pinned at `timestamp`
    pub fn new(timestamp: Timestamp) -> Self {
        Self {
            timestamp: AtomicU64::new(timestamp),
        }
    }

    /// Pin the clock to a new timestamp
    pub fn set(&self, timestamp: Timestamp) {
        self.timestamp.store(timestamp, Ordering::Relaxed);
    }

    /// Move the clock forward by `ms` milliseconds
    pub fn advance(&self, ms: u64) {
        self.timestamp.fetch_add(ms, Ordering::Relaxed);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        self.timestamp.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_advances() {
        let clock = FixedClock::new(1000);
        assert_eq!(clock.now(), 1000);

        clock.advance(500);
        assert_eq!(clock.now(), 1500);

        clock.set(100);
        assert_eq!(clock.now(), 100);
    }

    #[test]
    fn system_clock_is_nonzero() {
        assert!(SystemClock.now() > 0);
    }
}
