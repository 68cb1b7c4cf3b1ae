//! Error types for threadsafe object operations

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while waiting on or publishing to an object
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ObjectError {
    /// Object declared with an unsupported number of fields
    #[error("Invalid field count: {count} (must be 1..={max})")]
    InvalidFieldCount {
        /// Requested field count
        count: usize,
        /// Largest supported field count
        max: usize,
    },

    /// Field index outside the object's field range
    #[error("Field index {index} out of range for object with {size} fields")]
    InvalidField {
        /// Offending index
        index: usize,
        /// Number of fields in the object
        size: usize,
    },

    /// Snapshot taken from an object with a different shape
    #[error("Snapshot covers {snapshot_len} fields, object has {size}")]
    SnapshotMismatch {
        /// Number of fields recorded in the snapshot
        snapshot_len: usize,
        /// Number of fields in the object
        size: usize,
    },

    /// Field baseline is ahead of the object's own counter
    #[error("Baseline {baseline} for field {field} is ahead of its modification count {current}")]
    BaselineAhead {
        /// Field whose baseline is ahead
        field: usize,
        /// Count supplied by the caller
        baseline: u64,
        /// Count held by the object
        current: u64,
    },

    /// Total baseline is ahead of the object's own total counter
    #[error("Baseline total {baseline} is ahead of the total modification count {current}")]
    TotalBaselineAhead {
        /// Total supplied by the caller
        baseline: u64,
        /// Total held by the object
        current: u64,
    },

    /// A waiter on a single field slept across more than one publish
    #[error(
        "Missed update on field {field}: expected modification count {expected}, observed {observed}"
    )]
    MissedUpdate {
        /// Field being waited on
        field: usize,
        /// Count the waiter expected to wake up to
        expected: u64,
        /// Count actually observed
        observed: u64,
    },

    /// A waiter on any field slept across more than one publish
    #[error("Missed updates: expected total modification count {expected}, observed {observed}")]
    MissedUpdates {
        /// Total count the waiter expected to wake up to
        expected: u64,
        /// Total count actually observed
        observed: u64,
    },

    /// More than one field changed between two observations
    #[error("Fields {first} and {second} both changed between two observations")]
    MultipleFieldsChanged {
        /// Lowest changed field index
        first: usize,
        /// Next changed field index
        second: usize,
    },

    /// One field advanced by more than one between two observations
    #[error("Field {field} advanced by {delta} between two observations")]
    FieldSkipped {
        /// Field that advanced
        field: usize,
        /// Observed counter delta
        delta: u64,
    },

    /// The total count advanced but no field counter did
    #[error("Total modification count advanced but no field changed")]
    NoFieldChanged,

    /// Bounded wait expired before the awaited publish
    #[error("Wait timed out after {timeout:?}")]
    Timeout {
        /// Requested wait bound
        timeout: Duration,
    },
}

impl ObjectError {
    /// True for contract violations, i.e. lost or merged updates.
    ///
    /// Argument errors and timeouts are ordinary results and return false.
    pub fn is_violation(&self) -> bool {
        matches!(
            self,
            Self::MissedUpdate { .. }
                | Self::MissedUpdates { .. }
                | Self::MultipleFieldsChanged { .. }
                | Self::FieldSkipped { .. }
                | Self::NoFieldChanged
        )
    }
}

/// Result type for threadsafe object operations
pub type ObjectResult<T> = Result<T, ObjectError>;
