//! Prelude module for common re-exports.
//!
//! ```rust
//! use tso_common::prelude::*;
//! ```

use std::time::Duration;

// ─── Logging ────────────────────────────────────────────────────────
pub use crate::config::LogLevel;

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, SharedConfig, Validate};

// ─── System Constants ───────────────────────────────────────────────
pub use crate::consts::{CYCLE_TIME_US, MAX_FIELDS};

/// Default control cycle time as Duration.
pub const DEFAULT_CYCLE_TIME: Duration = Duration::from_micros(CYCLE_TIME_US);
