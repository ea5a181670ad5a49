//! [`BenchRegistry`] – stub device drivers for running real-hardware mode on a
//! bench or in CI.
//!
//! Builds a [`DeviceRegistry`] whose every slot is backed by a stub driver that
//! records commands without touching a bus.  The real-hardware construction
//! path can then be exercised end to end without a robot.
//!
//! # Stub behaviour
//!
//! | Driver | Stub behaviour |
//! |---|---|
//! | [`MotorController`] | Echoes the last setpoint: `velocity()` returns the last velocity command, `position()` the last position command, `applied_volts()` the last voltage or feedforward. |
//! | [`GyroDevice`] | Always connected, yaw fixed at zero. |
//! | [`DigitalInput`] | Never tripped. |
//!
//! # Example
//!
//! ```rust
//! use fieldbot_hal::bench::BenchRegistry;
//! use fieldbot_hal::ports::PortMap;
//! use fieldbot_hal::registry::DeviceProvider;
//!
//! let ports = PortMap::default().resolve().unwrap();
//! let mut devices = BenchRegistry::for_ports(&ports).build();
//! assert!(devices.open_motor(ports.flywheel_motor).is_ok());
//! ```

use fieldbot_types::FieldbotError;

use crate::device::{DigitalInput, GyroDevice, MotorController};
use crate::ports::ResolvedPorts;
use crate::registry::DeviceRegistry;

// ─────────────────────────────────────────────────────────────────────────────
// Stub motor
// ─────────────────────────────────────────────────────────────────────────────

pub struct BenchMotor {
    id: u32,
    position: f64,
    velocity: f64,
    volts: f64,
}

impl BenchMotor {
    pub fn new(id: u32) -> Box<Self> {
        Box::new(Self {
            id,
            position: 0.0,
            velocity: 0.0,
            volts: 0.0,
        })
    }
}

impl MotorController for BenchMotor {
    fn id(&self) -> u32 {
        self.id
    }

    fn set_voltage(&mut self, volts: f64) -> Result<(), FieldbotError> {
        self.volts = volts;
        Ok(())
    }

    fn set_velocity(&mut self, rad_per_sec: f64, ff_volts: f64) -> Result<(), FieldbotError> {
        self.velocity = rad_per_sec;
        self.volts = ff_volts;
        Ok(())
    }

    fn set_position(&mut self, rad: f64) -> Result<(), FieldbotError> {
        self.position = rad;
        Ok(())
    }

    fn position(&self) -> f64 {
        self.position
    }

    fn velocity(&self) -> f64 {
        self.velocity
    }

    fn applied_volts(&self) -> f64 {
        self.volts
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Stub gyro and beam break
// ─────────────────────────────────────────────────────────────────────────────

struct BenchGyro {
    id: u32,
}

impl GyroDevice for BenchGyro {
    fn id(&self) -> u32 {
        self.id
    }

    fn connected(&self) -> bool {
        true
    }

    fn yaw(&self) -> f64 {
        0.0
    }

    fn yaw_rate(&self) -> f64 {
        0.0
    }
}

struct BenchInput {
    channel: u32,
}

impl DigitalInput for BenchInput {
    fn channel(&self) -> u32 {
        self.channel
    }

    fn get(&self) -> bool {
        false
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// BenchRegistry builder
// ─────────────────────────────────────────────────────────────────────────────

/// Builder that constructs a [`DeviceRegistry`] populated with stub drivers.
#[derive(Default)]
pub struct BenchRegistry {
    motor_ids: Vec<u32>,
    gyro_ids: Vec<u32>,
    input_channels: Vec<u32>,
}

impl BenchRegistry {
    pub fn builder() -> Self {
        Self::default()
    }

    /// Stub every device named in a validated port table.
    pub fn for_ports(ports: &ResolvedPorts) -> Self {
        let mut builder = Self::builder();
        for module in &ports.modules {
            builder = builder
                .with_motor(module.drive_motor)
                .with_motor(module.steer_motor);
        }
        builder
            .with_gyro(ports.gyro)
            .with_motor(ports.flywheel_motor)
            .with_motor(ports.intake_motor)
            .with_digital_input(ports.intake_beam_break)
    }

    pub fn with_motor(mut self, id: u32) -> Self {
        self.motor_ids.push(id);
        self
    }

    pub fn with_gyro(mut self, id: u32) -> Self {
        self.gyro_ids.push(id);
        self
    }

    pub fn with_digital_input(mut self, channel: u32) -> Self {
        self.input_channels.push(channel);
        self
    }

    /// Consume the builder and return a fully populated [`DeviceRegistry`].
    pub fn build(self) -> DeviceRegistry {
        let mut registry = DeviceRegistry::new();

        for id in self.motor_ids {
            registry.register_motor(BenchMotor::new(id));
        }

        for id in self.gyro_ids {
            registry.register_gyro(Box::new(BenchGyro { id }));
        }

        for channel in self.input_channels {
            registry.register_digital_input(Box::new(BenchInput { channel }));
        }

        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::PortMap;
    use crate::registry::DeviceProvider;

    #[test]
    fn for_ports_stubs_every_assignment() {
        let ports = PortMap::default().resolve().unwrap();
        let registry = BenchRegistry::for_ports(&ports).build();
        // 8 module motors + flywheel + intake + gyro + beam break.
        assert_eq!(registry.remaining(), 12);
    }

    #[test]
    fn bench_motor_echoes_setpoints() {
        let mut motor = BenchMotor::new(3);
        motor.set_velocity(12.5, 0.4).unwrap();
        motor.set_position(1.0).unwrap();
        assert!((motor.velocity() - 12.5).abs() < f64::EPSILON);
        assert!((motor.applied_volts() - 0.4).abs() < f64::EPSILON);
        assert!((motor.position() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn bench_gyro_and_input_are_quiet() {
        let mut registry = BenchRegistry::builder()
            .with_gyro(20)
            .with_digital_input(0)
            .build();
        let gyro = registry.open_gyro(20).unwrap();
        assert!(gyro.connected());
        assert_eq!(gyro.yaw(), 0.0);
        assert!(!registry.open_digital_input(0).unwrap().get());
    }
}
