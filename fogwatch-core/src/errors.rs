//! Error Types for the Fallible Component Boundaries
//!
//! ## Design Philosophy
//!
//! FogWatch keeps errors where the failure modes actually are:
//!
//! 1. **The fog engine is infallible.** Malformed readings are tolerated by
//!    defaulting, never rejected, so `process` returns a decision, not a
//!    `Result`.
//! 2. **The stats store can fail**, and when it does the failure must be a
//!    value the caller sees: a cloud record that was not stored must not
//!    look stored.
//! 3. **Errors are values at component boundaries.** Nothing is thrown past
//!    a tier; the dispatcher turns a worker's error into that device's error
//!    entry and the batch carries on.
//!
//! Variants carry `&'static str` reasons so errors stay `Copy`-cheap and
//! allocation-free on the failure path.

use thiserror_no_std::Error;

/// Result type for stats store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Failures of the durable stats store collaborator
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    /// Backend cannot be reached at all
    #[error("storage backend unavailable: {reason}")]
    Unavailable {
        /// What made the backend unreachable
        reason: &'static str,
    },

    /// Backend refused the write
    #[error("write rejected: {reason}")]
    WriteFailed {
        /// Why the write was refused
        reason: &'static str,
    },
}

/// Failures of the cloud aggregation tier
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloudError {
    /// Durable append (or the preceding history query) did not happen;
    /// no record was produced and no counter advanced
    #[error("cloud storage failed: {0}")]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_displays_reason() {
        let err = StoreError::WriteFailed { reason: "disk full" };
        assert_eq!(err.to_string(), "write rejected: disk full");
    }

    #[test]
    fn cloud_error_wraps_store_error() {
        let err = CloudError::from(StoreError::Unavailable { reason: "offline" });
        assert!(matches!(err, CloudError::Store(StoreError::Unavailable { .. })));
    }
}
