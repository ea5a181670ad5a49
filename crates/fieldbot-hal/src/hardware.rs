//! Hardware-backed implementations of the backend contracts.
//!
//! Each backend owns the device drivers it was built from.  Driver errors are
//! logged and surface in the inputs (`connected`, zeroed readings); they never
//! abort the control cycle.

use fieldbot_types::{FieldbotError, Rotation2d};
use tracing::warn;

use crate::device::{DigitalInput, GyroDevice, MotorController};
use crate::io::{
    FlywheelInputs, FlywheelIo, GyroInputs, GyroIo, IntakeInputs, IntakeIo, ModuleInputs,
    ModuleIo, ModuleState,
};

/// Mark4 L3 drive reduction.
pub const DRIVE_GEAR_RATIO: f64 = 6.12;
/// Mark4 steer reduction.
pub const STEER_GEAR_RATIO: f64 = 12.8;
/// Two-inch wheels.
pub const WHEEL_RADIUS_M: f64 = 0.0508;
pub const FLYWHEEL_GEAR_RATIO: f64 = 1.5;
/// Roller voltage while collecting.
pub const INTAKE_VOLTS: f64 = 9.0;
/// Roller voltage while feeding the flywheel.
pub const LAUNCH_VOLTS: f64 = 12.0;

fn log_fault(component: &str, result: Result<(), FieldbotError>) {
    if let Err(e) = result {
        warn!(component, error = %e, "device command failed");
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Gyro
// ─────────────────────────────────────────────────────────────────────────────

pub struct GyroIoHardware {
    gyro: Box<dyn GyroDevice>,
    yaw_offset: f64,
}

impl GyroIoHardware {
    pub fn new(gyro: Box<dyn GyroDevice>) -> Self {
        Self {
            gyro,
            yaw_offset: 0.0,
        }
    }
}

impl GyroIo for GyroIoHardware {
    fn update_inputs(&mut self, inputs: &mut GyroInputs) {
        inputs.connected = self.gyro.connected();
        if inputs.connected {
            inputs.yaw = Rotation2d::from_radians(self.gyro.yaw() - self.yaw_offset);
            inputs.yaw_velocity = self.gyro.yaw_rate();
        } else {
            inputs.yaw_velocity = 0.0;
        }
    }

    fn reset_yaw(&mut self, yaw: Rotation2d) {
        self.yaw_offset = self.gyro.yaw() - yaw.radians();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Swerve module
// ─────────────────────────────────────────────────────────────────────────────

pub struct ModuleIoHardware {
    drive: Box<dyn MotorController>,
    steer: Box<dyn MotorController>,
    steer_offset_rad: f64,
}

impl ModuleIoHardware {
    pub fn new(
        drive: Box<dyn MotorController>,
        steer: Box<dyn MotorController>,
        steer_offset_rad: f64,
    ) -> Self {
        Self {
            drive,
            steer,
            steer_offset_rad,
        }
    }

    fn label(&self) -> String {
        format!("module drive {}", self.drive.id())
    }
}

impl ModuleIo for ModuleIoHardware {
    fn update_inputs(&mut self, inputs: &mut ModuleInputs) {
        inputs.drive_position_m = self.drive.position() / DRIVE_GEAR_RATIO * WHEEL_RADIUS_M;
        inputs.drive_velocity_mps = self.drive.velocity() / DRIVE_GEAR_RATIO * WHEEL_RADIUS_M;
        inputs.drive_applied_volts = self.drive.applied_volts();
        inputs.steer_angle =
            Rotation2d::from_radians(self.steer.position() / STEER_GEAR_RATIO - self.steer_offset_rad);
    }

    fn set_target(&mut self, state: ModuleState) {
        let label = self.label();
        let wheel_rad_per_sec = state.speed_mps / WHEEL_RADIUS_M * DRIVE_GEAR_RATIO;
        log_fault(&label, self.drive.set_velocity(wheel_rad_per_sec, 0.0));
        let steer_rad = (state.angle.radians() + self.steer_offset_rad) * STEER_GEAR_RATIO;
        log_fault(&label, self.steer.set_position(steer_rad));
    }

    fn set_drive_voltage(&mut self, volts: f64) {
        let label = self.label();
        log_fault(&label, self.drive.set_voltage(volts));
        log_fault(
            &label,
            self.steer.set_position(self.steer_offset_rad * STEER_GEAR_RATIO),
        );
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Flywheel
// ─────────────────────────────────────────────────────────────────────────────

pub struct FlywheelIoHardware {
    motor: Box<dyn MotorController>,
}

impl FlywheelIoHardware {
    pub fn new(motor: Box<dyn MotorController>) -> Self {
        Self { motor }
    }
}

impl FlywheelIo for FlywheelIoHardware {
    fn update_inputs(&mut self, inputs: &mut FlywheelInputs) {
        inputs.position_rad = self.motor.position() / FLYWHEEL_GEAR_RATIO;
        inputs.velocity_rad_per_sec = self.motor.velocity() / FLYWHEEL_GEAR_RATIO;
        inputs.applied_volts = self.motor.applied_volts();
    }

    fn set_voltage(&mut self, volts: f64) {
        log_fault("flywheel", self.motor.set_voltage(volts));
    }

    fn set_velocity(&mut self, rad_per_sec: f64, ff_volts: f64) {
        log_fault(
            "flywheel",
            self.motor
                .set_velocity(rad_per_sec * FLYWHEEL_GEAR_RATIO, ff_volts),
        );
    }

    fn stop(&mut self) {
        log_fault("flywheel", self.motor.set_voltage(0.0));
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Intake
// ─────────────────────────────────────────────────────────────────────────────

pub struct IntakeIoHardware {
    motor: Box<dyn MotorController>,
    beam_break: Box<dyn DigitalInput>,
}

impl IntakeIoHardware {
    pub fn new(motor: Box<dyn MotorController>, beam_break: Box<dyn DigitalInput>) -> Self {
        Self { motor, beam_break }
    }
}

impl IntakeIo for IntakeIoHardware {
    fn update_inputs(&mut self, inputs: &mut IntakeInputs) {
        inputs.note_detected = self.beam_break.get();
        inputs.applied_volts = self.motor.applied_volts();
    }

    fn set_running(&mut self, running: bool) {
        let volts = if running { INTAKE_VOLTS } else { 0.0 };
        log_fault("intake", self.motor.set_voltage(volts));
    }

    fn launch_note(&mut self) {
        log_fault("intake", self.motor.set_voltage(LAUNCH_VOLTS));
    }
}
