//! Simulated devices.
//!
//! Each device owns its shared objects and fixes the meaning of their field
//! indices. Controllers and loggers only ever talk to a device through
//! those objects.

use std::f64::consts::TAU;
use tso_object::{InputOutput, ObjectConfig, SharedObject, ThreadsafeObject};

/// Sensor field: latest measurement, normalized to `[0, 1]`.
pub const MEASUREMENT: usize = 0;
/// Sensor field: index of the sample that produced `MEASUREMENT`.
pub const SAMPLE_INDEX: usize = 1;
/// Sensor record layout.
pub type SensorRecord = (f64, u64);

/// Motor command field: current target in amperes.
pub const CURRENT_TARGET: usize = 0;
/// Motor command record layout.
pub type MotorCommand = (f64,);

/// Motor status field: measured current in amperes.
pub const MEASURED_CURRENT: usize = 0;
/// Motor status field: number of completed motor cycles.
pub const MOTOR_CYCLE: usize = 1;
/// Motor status record layout.
pub type MotorStatus = (f64, u64);

/// Analog slider sweeping sinusoidally between 0 and 1.
pub struct AnalogSensor {
    measurement: SharedObject<SensorRecord>,
    frequency_hz: f64,
}

impl AnalogSensor {
    /// Create a sensor sweeping at `frequency_hz`.
    pub fn new(config: &ObjectConfig, frequency_hz: f64) -> Self {
        Self {
            measurement: ThreadsafeObject::with_config((0.0, 0), config).into_shared(),
            frequency_hz,
        }
    }

    /// Measurement channel.
    pub fn measurement(&self) -> SharedObject<SensorRecord> {
        self.measurement.clone()
    }

    /// Take sample `index` at time `t` seconds and publish it.
    ///
    /// The sample index is published before the measurement, so a consumer
    /// woken by the measurement reads a matching index.
    pub fn sample(&self, index: u64, t: f64) -> f64 {
        let value = 0.5 + 0.5 * (TAU * self.frequency_hz * t).sin();
        self.measurement.set::<SAMPLE_INDEX>(index);
        self.measurement.set::<MEASUREMENT>(value);
        value
    }
}

/// Current-controlled motor with a first-order current response.
pub struct Motor {
    command: SharedObject<MotorCommand>,
    status: SharedObject<MotorStatus>,
    response: f64,
}

impl Motor {
    /// Create a motor closing `response` of its current error per cycle.
    pub fn new(config: &ObjectConfig, response: f64) -> Self {
        Self {
            command: ThreadsafeObject::with_config((0.0,), config).into_shared(),
            status: ThreadsafeObject::with_config((0.0, 0), config).into_shared(),
            response,
        }
    }

    /// Command a new current target.
    pub fn set_current_target(&self, target: f64) {
        self.command.set::<CURRENT_TARGET>(target);
    }

    /// Run one motor cycle against the latest target; returns the cycle
    /// number just completed.
    pub fn step(&self) -> u64 {
        let target = self.command.get::<CURRENT_TARGET>();
        let measured = self.status.get::<MEASURED_CURRENT>();
        let cycle = self.status.get::<MOTOR_CYCLE>() + 1;

        self.status
            .set::<MEASURED_CURRENT>(measured + (target - measured) * self.response);
        self.status.set::<MOTOR_CYCLE>(cycle);
        cycle
    }
}

impl InputOutput for Motor {
    type Input = MotorCommand;
    type Output = MotorStatus;

    fn input(&self) -> SharedObject<MotorCommand> {
        self.command.clone()
    }

    fn output(&self) -> SharedObject<MotorStatus> {
        self.status.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sensor_sample_range_and_order() {
        let sensor = AnalogSensor::new(&ObjectConfig::default(), 1.0);
        for index in 0..100 {
            let value = sensor.sample(index, index as f64 * 0.01);
            assert!((0.0..=1.0).contains(&value));
        }

        let measurement = sensor.measurement();
        assert_eq!(measurement.get::<SAMPLE_INDEX>(), 99);
        assert_eq!(measurement.modification_count(MEASUREMENT), Some(100));
        assert_eq!(measurement.total_modification_count(), 200);
    }

    #[test]
    fn test_motor_converges_to_target() {
        let motor = Motor::new(&ObjectConfig::default(), 0.5);
        motor.set_current_target(2.0);

        for _ in 0..40 {
            motor.step();
        }

        let status = motor.output();
        assert!((status.get::<MEASURED_CURRENT>() - 2.0).abs() < 1e-6);
        assert_eq!(status.get::<MOTOR_CYCLE>(), 40);
        assert_eq!(motor.input().modification_count(CURRENT_TARGET), Some(1));
    }
}
