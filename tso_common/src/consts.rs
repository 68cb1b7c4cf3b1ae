//! System-wide constants for the workspace.
//!
//! Single source of truth for numeric limits.

/// Maximum number of fields a single threadsafe object can carry.
///
/// Counter storage is fixed-capacity, so this bounds both the tuple arities
/// that implement the field traits and the size of a counter snapshot.
pub const MAX_FIELDS: usize = 12;

/// Default control cycle time in microseconds (1 kHz = 1000 µs).
pub const CYCLE_TIME_US: u64 = 1000;
