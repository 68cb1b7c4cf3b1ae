//! # Threadsafe Object Demo
//!
//! A slider-driven current controller built entirely on shared objects.
//!
//! # Module Structure
//!
//! - [`config`] - TOML configuration (`[shared]`, `[object]`, `[demo]`)
//! - [`devices`] - Simulated analog sensor and motor
//! - [`pipeline`] - Sensor, controller, motor and logger threads
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   (f64, u64)   ┌──────────────┐    (f64,)     ┌──────────────┐
//! │ AnalogSensor ├───────────────►│  Controller  ├──────────────►│    Motor     │
//! │  (clock)     │  measurement   │ gain*(m-off) │ current target│ first order  │
//! └──────────────┘                └──────────────┘               └──────┬───────┘
//!                                                                       │ (f64, u64)
//!                                                                       ▼
//!                                                                ┌──────────────┐
//!                                                                │    Logger    │
//!                                                                └──────────────┘
//! ```

#![deny(missing_docs)]

pub mod config;
pub mod devices;
pub mod pipeline;

pub use crate::config::{DemoConfig, PipelineConfig};
pub use crate::devices::{AnalogSensor, Motor};
pub use crate::pipeline::{Pipeline, PipelineError, PipelineStats};
