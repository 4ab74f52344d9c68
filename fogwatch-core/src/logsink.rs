//! Capped Observability Log Sink
//!
//! Append-only sink the UI tier reads for its live console view. Holds the
//! newest [`LOG_CAPACITY`] entries; appending past capacity discards the
//! oldest first. Pure observability, never authoritative state, so
//! discarding is always safe.
//!
//! The sink is shared across concurrent dispatcher workers; a mutex over a
//! bounded deque keeps appends serialized without any sizing surprises.

use std::sync::{Mutex, MutexGuard, PoisonError};

use heapless::Deque;
use serde::Serialize;

use crate::time::{Clock, Timestamp};

/// Maximum retained log entries.
pub const LOG_CAPACITY: usize = 100;

/// Severity/flavor of one log entry, mirrored in the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    /// Routine progress
    Info,
    /// A locally handled reading or fast hop
    Success,
    /// Cloud involvement or slow hop
    Warning,
    /// A failed pipeline step
    Error,
}

/// One sink entry
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    /// When the entry was appended
    pub timestamp: Timestamp,
    /// Entry flavor
    pub kind: LogKind,
    /// Human-readable message
    pub message: String,
}

/// Bounded, shared, append-only log sink
pub struct LogSink {
    clock: Box<dyn Clock>,
    entries: Mutex<Deque<LogEntry, LOG_CAPACITY>>,
}

impl LogSink {
    /// Create a sink stamping entries with `clock`
    pub fn new(clock: Box<dyn Clock>) -> Self {
        Self {
            clock,
            entries: Mutex::new(Deque::new()),
        }
    }

    /// Append an entry, discarding the oldest when at capacity
    pub fn push(&self, kind: LogKind, message: impl Into<String>) {
        let entry = LogEntry {
            timestamp: self.clock.now(),
            kind,
            message: message.into(),
        };

        let mut entries = self.entries();
        if entries.is_full() {
            entries.pop_front();
        }
        entries.push_back(entry).ok();
    }

    /// Copy of the retained entries, oldest first
    pub fn snapshot(&self) -> Vec<LogEntry> {
        self.entries().iter().cloned().collect()
    }

    /// Number of retained entries
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    /// Check if the sink is empty
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Discard all entries; the explicit external clear operation
    pub fn clear(&self) {
        self.entries().clear();
    }

    fn entries(&self) -> MutexGuard<'_, Deque<LogEntry, LOG_CAPACITY>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::FixedClock;

    fn sink() -> LogSink {
        LogSink::new(Box::new(FixedClock::new(1000)))
    }

    #[test]
    fn appends_in_order() {
        let sink = sink();
        sink.push(LogKind::Info, "first");
        sink.push(LogKind::Warning, "second");

        let entries = sink.snapshot();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].message, "first");
        assert_eq!(entries[1].kind, LogKind::Warning);
    }

    #[test]
    fn cap_discards_oldest_first() {
        let sink = sink();
        for i in 0..150 {
            sink.push(LogKind::Info, format!("entry {i}"));
        }

        assert_eq!(sink.len(), LOG_CAPACITY);
        let entries = sink.snapshot();
        assert_eq!(entries[0].message, "entry 50");
        assert_eq!(entries[LOG_CAPACITY - 1].message, "entry 149");
    }

    #[test]
    fn clear_empties_the_sink() {
        let sink = sink();
        sink.push(LogKind::Error, "boom");
        sink.clear();
        assert!(sink.is_empty());
    }
}
