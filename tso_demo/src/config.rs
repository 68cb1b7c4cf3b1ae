//! Demo configuration.
//!
//! ```toml
//! [shared]
//! service_name = "tso-demo"
//! log_level = "info"
//!
//! [object]
//! violation_policy = "report"
//!
//! [demo]
//! cycle_period_us = 1000
//! cycles = 5000
//! gain = 4.0
//! offset = 0.5
//! report_every = 1000
//! ```

use serde::Deserialize;
use std::time::Duration;
use tso::prelude::{CYCLE_TIME_US, ConfigError, SharedConfig, Validate};
use tso_object::ObjectConfig;

/// Full demo configuration file. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DemoConfig {
    /// Service identity and log level.
    #[serde(default)]
    pub shared: SharedConfig,
    /// Settings applied to every object in the pipeline.
    #[serde(default)]
    pub object: ObjectConfig,
    /// Pipeline timing and control law.
    #[serde(default)]
    pub demo: PipelineConfig,
}

impl Validate for DemoConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        self.demo.validate()
    }
}

/// Pipeline timing and control law.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Sensor sampling period in microseconds.
    pub cycle_period_us: u64,
    /// Number of sensor samples to produce; runs until interrupted if unset.
    pub cycles: Option<u64>,
    /// Controller gain: `target = gain * (measurement - offset)`.
    pub gain: f64,
    /// Controller offset.
    pub offset: f64,
    /// Log a motor status line every this many motor cycles.
    pub report_every: u64,
    /// Bound on each consumer wait, so consumers notice shutdown.
    pub wait_timeout_ms: u64,
    /// Frequency of the simulated slider sweep.
    pub slider_hz: f64,
    /// Fraction of the remaining error the simulated motor closes per cycle.
    pub motor_response: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            cycle_period_us: CYCLE_TIME_US,
            cycles: None,
            gain: 4.0,
            offset: 0.5,
            report_every: 1000,
            wait_timeout_ms: 100,
            slider_hz: 0.5,
            motor_response: 0.2,
        }
    }
}

impl Validate for PipelineConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        for (key, value) in [
            ("cycle_period_us", self.cycle_period_us),
            ("report_every", self.report_every),
            ("wait_timeout_ms", self.wait_timeout_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::invalid("demo", key, "must be positive"));
            }
        }
        for (key, value) in [
            ("gain", self.gain),
            ("offset", self.offset),
            ("slider_hz", self.slider_hz),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::invalid(
                    "demo",
                    key,
                    format!("must be finite, got {value}"),
                ));
            }
        }
        if !(self.motor_response > 0.0 && self.motor_response <= 1.0) {
            return Err(ConfigError::invalid(
                "demo",
                "motor_response",
                format!("must be in (0, 1], got {}", self.motor_response),
            ));
        }
        Ok(())
    }
}

impl PipelineConfig {

    /// Sensor sampling period.
    pub fn cycle_period(&self) -> Duration {
        Duration::from_micros(self.cycle_period_us)
    }

    /// Bound on each consumer wait.
    pub fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.wait_timeout_ms)
    }
}
