//! Device-driver traits for the physical parts the hardware backends talk to.
//!
//! Vendor drivers implement these traits and are handed to the backends by a
//! [`DeviceProvider`][crate::registry::DeviceProvider].  The backends only
//! ever talk to the traits, so a driver can be swapped without touching the
//! facades or the binding logic.

use fieldbot_types::FieldbotError;

/// A smart motor controller on the CAN bus.
///
/// Units are those of the motor shaft: radians and radians per second.
/// Gear reductions are applied by the backend that owns the controller.
pub trait MotorController: Send {
    /// CAN identifier this controller answers on.
    fn id(&self) -> u32;

    /// Open-loop voltage command.
    ///
    /// # Errors
    ///
    /// Returns [`FieldbotError::HardwareFault`] if the controller rejects the
    /// frame or is not on the bus.
    fn set_voltage(&mut self, volts: f64) -> Result<(), FieldbotError>;

    /// Onboard closed-loop velocity command with an arbitrary feedforward.
    fn set_velocity(&mut self, rad_per_sec: f64, ff_volts: f64) -> Result<(), FieldbotError>;

    /// Onboard closed-loop position command.
    fn set_position(&mut self, rad: f64) -> Result<(), FieldbotError>;

    fn position(&self) -> f64;

    fn velocity(&self) -> f64;

    fn applied_volts(&self) -> f64;
}

/// An inertial measurement unit reporting heading.
pub trait GyroDevice: Send {
    fn id(&self) -> u32;

    /// `false` once the device has stopped answering status frames.
    fn connected(&self) -> bool;

    /// Yaw in radians, counter-clockwise positive.
    fn yaw(&self) -> f64;

    /// Yaw rate in radians per second.
    fn yaw_rate(&self) -> f64;
}

/// A discrete sensor such as a beam break.
pub trait DigitalInput: Send {
    fn channel(&self) -> u32;

    /// `true` when the sensor is tripped.
    fn get(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockMotor {
        id: u32,
        volts: f64,
    }

    impl MotorController for MockMotor {
        fn id(&self) -> u32 {
            self.id
        }
        fn set_voltage(&mut self, volts: f64) -> Result<(), FieldbotError> {
            self.volts = volts;
            Ok(())
        }
        fn set_velocity(&mut self, _rad_per_sec: f64, ff_volts: f64) -> Result<(), FieldbotError> {
            self.volts = ff_volts;
            Ok(())
        }
        fn set_position(&mut self, _rad: f64) -> Result<(), FieldbotError> {
            Ok(())
        }
        fn position(&self) -> f64 {
            0.0
        }
        fn velocity(&self) -> f64 {
            0.0
        }
        fn applied_volts(&self) -> f64 {
            self.volts
        }
    }

    #[test]
    fn motor_controller_is_object_safe() {
        let mut motor: Box<dyn MotorController> = Box::new(MockMotor { id: 9, volts: 0.0 });
        motor.set_voltage(6.0).unwrap();
        assert_eq!(motor.id(), 9);
        assert!((motor.applied_volts() - 6.0).abs() < f64::EPSILON);
    }
}
