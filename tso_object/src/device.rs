//! Device-facing channel pairs
//!
//! A device (motor, sensor, composite actuator) exposes one object it reads
//! commands from and one object it publishes measurements to. Each device
//! fixes the meaning of its field indices; the objects assign none.

use crate::fields::FieldTuple;
use crate::object::SharedObject;

/// A device driven through a pair of shared objects.
pub trait InputOutput {
    /// Commands written by controllers and consumed by the device.
    type Input: FieldTuple;
    /// Measurements published by the device.
    type Output: FieldTuple;

    /// Command channel.
    fn input(&self) -> SharedObject<Self::Input>;

    /// Measurement channel.
    fn output(&self) -> SharedObject<Self::Output>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ThreadsafeObject;

    struct Loopback {
        command: SharedObject<(f64,)>,
        measurement: SharedObject<(f64, u64)>,
    }

    impl Loopback {
        fn step(&self) {
            let command = self.command.get::<0>();
            let cycle = self.measurement.get::<1>();
            self.measurement.set::<0>(command * 0.5);
            self.measurement.set::<1>(cycle + 1);
        }
    }

    impl InputOutput for Loopback {
        type Input = (f64,);
        type Output = (f64, u64);

        fn input(&self) -> SharedObject<Self::Input> {
            self.command.clone()
        }

        fn output(&self) -> SharedObject<Self::Output> {
            self.measurement.clone()
        }
    }

    #[test]
    fn test_device_channels_are_shared() {
        let device = Loopback {
            command: ThreadsafeObject::default().into_shared(),
            measurement: ThreadsafeObject::default().into_shared(),
        };

        device.input().set::<0>(4.0);
        device.step();

        let output = device.output();
        assert_eq!(output.get::<0>(), 2.0);
        assert_eq!(output.get::<1>(), 1);
        assert_eq!(output.total_modification_count(), 2);
    }
}
