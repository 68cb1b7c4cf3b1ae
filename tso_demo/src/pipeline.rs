//! Sensor -> controller -> motor -> logger pipeline.
//!
//! Four threads, connected only through shared objects:
//!
//! ```text
//! sensor ──measurement──► controller ──current target──► motor ──status──► logger
//! ```
//!
//! The sensor thread is the clock. Every other thread blocks on an object
//! wait with a bounded timeout, so once the sensor stops (cycle budget
//! reached or shutdown requested) the consumers drain what is left and exit.

use crate::config::PipelineConfig;
use crate::devices::{
    AnalogSensor, CURRENT_TARGET, MEASURED_CURRENT, MEASUREMENT, MOTOR_CYCLE, Motor,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};
use tso_object::{InputOutput, ObjectConfig, ObjectError};

/// Errors that stop the pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A wait failed with something other than a timeout or a tolerated
    /// violation.
    #[error("Object error in {stage}: {source}")]
    Object {
        /// Pipeline stage that failed
        stage: &'static str,
        /// Underlying error
        #[source]
        source: ObjectError,
    },

    /// A pipeline thread panicked.
    #[error("Pipeline thread panicked: {stage}")]
    ThreadPanicked {
        /// Pipeline stage whose thread panicked
        stage: &'static str,
    },

    /// Spawning a pipeline thread failed.
    #[error("Failed to spawn {stage} thread: {source}")]
    Spawn {
        /// Pipeline stage
        stage: &'static str,
        /// Source IO error
        #[source]
        source: std::io::Error,
    },
}

type StageHandle<T> = JoinHandle<Result<T, PipelineError>>;

/// Per-stage counters collected when the pipeline stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Sensor samples published.
    pub samples: u64,
    /// Current targets commanded by the controller.
    pub commands: u64,
    /// Times the controller fell behind the sensor and resynchronized.
    pub controller_resyncs: u64,
    /// Motor cycles completed.
    pub motor_cycles: u64,
    /// Status lines written by the logger.
    pub reports: u64,
}

/// Running flag plus the devices it drives.
///
/// The flag is raised at construction, so a shutdown request that arrives
/// before [`run`](Self::run) is honored rather than overwritten.
pub struct Pipeline {
    config: PipelineConfig,
    running: Arc<AtomicBool>,
    sensor: Arc<AnalogSensor>,
    motor: Arc<Motor>,
}

impl Pipeline {
    /// Build devices for `config`.
    pub fn new(config: PipelineConfig, object_config: &ObjectConfig) -> Self {
        Self {
            config,
            running: Arc::new(AtomicBool::new(true)),
            sensor: Arc::new(AnalogSensor::new(object_config, config.slider_hz)),
            motor: Arc::new(Motor::new(object_config, config.motor_response)),
        }
    }

    /// Flag cleared to request shutdown, e.g. from a signal handler.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Sensor driven by the pipeline.
    pub fn sensor(&self) -> &AnalogSensor {
        &self.sensor
    }

    /// Motor driven by the pipeline.
    pub fn motor(&self) -> &Motor {
        &self.motor
    }

    /// Run until the cycle budget is spent or shutdown is requested.
    ///
    /// Returns immediately with empty stats if the flag was already cleared.
    pub fn run(&self) -> Result<PipelineStats, PipelineError> {
        info!(
            period_us = self.config.cycle_period_us,
            cycles = ?self.config.cycles,
            "pipeline starting"
        );

        // Consumers take their baselines before the sensor publishes anything.
        let logger = self.spawn_logger()?;
        let motor = self.spawn_motor()?;
        let controller = self.spawn_controller()?;
        let sensor = self.spawn_sensor()?;

        let samples = join("sensor", sensor)?;
        let (commands, controller_resyncs) = join("controller", controller)??;
        let motor_cycles = join("motor", motor)??;
        let reports = join("logger", logger)??;

        let stats = PipelineStats {
            samples,
            commands,
            controller_resyncs,
            motor_cycles,
            reports,
        };
        info!(?stats, "pipeline stopped");
        Ok(stats)
    }

    fn spawn_sensor(&self) -> Result<JoinHandle<u64>, PipelineError> {
        let sensor = Arc::clone(&self.sensor);
        let running = Arc::clone(&self.running);
        let config = self.config;

        spawn("sensor", move || {
            let period = config.cycle_period();
            let start = Instant::now();
            let mut next = start;
            let mut samples = 0;

            while running.load(Ordering::SeqCst) && config.cycles.is_none_or(|c| samples < c) {
                sensor.sample(samples, start.elapsed().as_secs_f64());
                samples += 1;

                next += period;
                let now = Instant::now();
                if next > now {
                    thread::sleep(next - now);
                }
            }

            running.store(false, Ordering::SeqCst);
            debug!(samples, "sensor stopped");
            samples
        })
    }

    fn spawn_controller(&self) -> Result<StageHandle<(u64, u64)>, PipelineError> {
        let measurement = self.sensor.measurement();
        let motor = Arc::clone(&self.motor);
        let running = Arc::clone(&self.running);
        let config = self.config;
        let mut seen = measurement.modification_count(MEASUREMENT).unwrap_or(0);

        spawn("controller", move || {
            let mut commands = 0;
            let mut resyncs = 0;

            loop {
                match measurement
                    .wait_for_update_since::<MEASUREMENT>(seen, Some(config.wait_timeout()))
                {
                    Ok(()) => seen += 1,
                    Err(ObjectError::Timeout { .. }) => {
                        if running.load(Ordering::SeqCst) {
                            continue;
                        }
                        break;
                    }
                    Err(err) if err.is_violation() => {
                        warn!(error = %err, "controller fell behind sensor, resynchronizing");
                        resyncs += 1;
                        seen = measurement.modification_count(MEASUREMENT).unwrap_or(seen);
                    }
                    Err(source) => {
                        return Err(PipelineError::Object {
                            stage: "controller",
                            source,
                        });
                    }
                }

                let target = config.gain * (measurement.get::<MEASUREMENT>() - config.offset);
                motor.set_current_target(target);
                commands += 1;
            }

            debug!(commands, resyncs, "controller stopped");
            Ok((commands, resyncs))
        })
    }

    fn spawn_motor(&self) -> Result<StageHandle<u64>, PipelineError> {
        let motor = Arc::clone(&self.motor);
        let command = motor.input();
        let running = Arc::clone(&self.running);
        let config = self.config;
        let mut cursor = command.snapshot();

        spawn("motor", move || {
            let mut cycles = 0;

            loop {
                // Only the latest target matters to the motor, so commands
                // that arrive faster than it cycles are coalesced.
                match command.wait_for_any_updates_since(&cursor, Some(config.wait_timeout())) {
                    Ok(changed) => {
                        cursor = changed.current().clone();
                        if changed.contains(CURRENT_TARGET) {
                            cycles = motor.step();
                        }
                    }
                    Err(ObjectError::Timeout { .. }) => {
                        if running.load(Ordering::SeqCst) {
                            continue;
                        }
                        break;
                    }
                    Err(source) => {
                        return Err(PipelineError::Object {
                            stage: "motor",
                            source,
                        });
                    }
                }
            }

            debug!(cycles, "motor stopped");
            Ok(cycles)
        })
    }

    fn spawn_logger(&self) -> Result<StageHandle<u64>, PipelineError> {
        let status = self.motor.output();
        let running = Arc::clone(&self.running);
        let config = self.config;
        let mut cursor = status.snapshot();

        spawn("logger", move || {
            let mut last_bucket = 0;
            let mut reports = 0;

            loop {
                // Status fields are written back to back, so one wakeup may
                // cover both of them.
                match status.wait_for_any_updates_since(&cursor, Some(config.wait_timeout())) {
                    Ok(changed) => {
                        cursor = changed.current().clone();
                        if !changed.contains(MOTOR_CYCLE) {
                            continue;
                        }
                        let cycle = status.get::<MOTOR_CYCLE>();
                        let bucket = cycle / config.report_every;
                        if bucket > last_bucket {
                            last_bucket = bucket;
                            reports += 1;
                            info!(
                                cycle,
                                current = status.get::<MEASURED_CURRENT>(),
                                "motor status"
                            );
                        }
                    }
                    Err(ObjectError::Timeout { .. }) => {
                        if running.load(Ordering::SeqCst) {
                            continue;
                        }
                        break;
                    }
                    Err(source) => {
                        return Err(PipelineError::Object {
                            stage: "logger",
                            source,
                        });
                    }
                }
            }

            debug!(reports, "logger stopped");
            Ok(reports)
        })
    }
}

fn spawn<T, F>(stage: &'static str, body: F) -> Result<JoinHandle<T>, PipelineError>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    thread::Builder::new()
        .name(format!("tso-{stage}"))
        .spawn(body)
        .map_err(|source| PipelineError::Spawn { stage, source })
}

fn join<T>(stage: &'static str, handle: JoinHandle<T>) -> Result<T, PipelineError> {
    handle
        .join()
        .map_err(|_| PipelineError::ThreadPanicked { stage })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn short_run() -> PipelineConfig {
        PipelineConfig {
            cycle_period_us: 200,
            cycles: Some(100),
            report_every: 25,
            wait_timeout_ms: 20,
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn test_pipeline_runs_to_cycle_budget() {
        let pipeline = Pipeline::new(short_run(), &ObjectConfig::default());
        let stats = pipeline.run().unwrap();

        assert_eq!(stats.samples, 100);
        assert!(stats.commands > 0 && stats.commands <= stats.samples);
        assert!(stats.motor_cycles > 0 && stats.motor_cycles <= stats.commands);
        assert_eq!(
            pipeline.motor().output().get::<MOTOR_CYCLE>(),
            stats.motor_cycles
        );
        assert!(!pipeline.running_flag().load(Ordering::SeqCst));
    }

    #[test]
    fn test_cleared_flag_stops_pipeline() {
        let config = PipelineConfig {
            cycles: None,
            ..short_run()
        };
        let pipeline = Pipeline::new(config, &ObjectConfig::default());
        let flag = pipeline.running_flag();
        let measurement = pipeline.sensor().measurement();

        // The sensor only publishes once the pipeline is running.
        let stopper = thread::spawn(move || {
            let started = measurement
                .wait_for_update_since::<MEASUREMENT>(0, Some(Duration::from_secs(5)));
            thread::sleep(Duration::from_millis(20));
            flag.store(false, Ordering::SeqCst);
            started
        });

        let stats = pipeline.run().unwrap();
        assert!(stopper.join().unwrap().is_ok());
        assert!(stats.samples > 0);
    }

    #[test]
    fn test_shutdown_before_run_is_honored() {
        let pipeline = Pipeline::new(short_run(), &ObjectConfig::default());
        assert!(pipeline.running_flag().load(Ordering::SeqCst));
        pipeline.running_flag().store(false, Ordering::SeqCst);

        let stats = pipeline.run().unwrap();
        assert_eq!(stats.samples, 0);
        assert_eq!(stats.commands, 0);
        assert_eq!(stats.motor_cycles, 0);
        assert_eq!(pipeline.sensor().measurement().total_modification_count(), 0);
    }
}
