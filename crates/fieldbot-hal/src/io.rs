//! Backend contracts consumed by the subsystem facades.
//!
//! Each subsystem kind has one trait listing exactly the operations the
//! facade calls.  Three families implement them:
//!
//! | Family | Types | Behaviour |
//! |---|---|---|
//! | hardware | [`crate::hardware`] | drive device drivers opened from the port table |
//! | simulation | [`crate::sim::io`] | read and write the simulated world |
//! | inert | `Replay*` below | accept every command, do nothing |
//!
//! Every method has a no-op default, so the inert family is just an empty
//! `impl` block.  Inputs are refreshed once per cycle through
//! `update_inputs`; commands never return errors; backends log faults
//! themselves and report them through the `connected` style input fields.

use fieldbot_types::Rotation2d;

// ─────────────────────────────────────────────────────────────────────────────
// Gyro
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GyroInputs {
    pub connected: bool,
    pub yaw: Rotation2d,
    /// rad/s
    pub yaw_velocity: f64,
}

pub trait GyroIo {
    fn update_inputs(&mut self, _inputs: &mut GyroInputs) {}

    /// Re-zero the reported yaw to `yaw`.
    fn reset_yaw(&mut self, _yaw: Rotation2d) {}
}

// ─────────────────────────────────────────────────────────────────────────────
// Swerve module
// ─────────────────────────────────────────────────────────────────────────────

/// Desired or measured state of one swerve module.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ModuleState {
    pub speed_mps: f64,
    pub angle: Rotation2d,
}

impl ModuleState {
    pub fn new(speed_mps: f64, angle: Rotation2d) -> Self {
        Self { speed_mps, angle }
    }

    /// Reverse the wheel instead of steering more than a quarter turn.
    pub fn optimize(self, current: Rotation2d) -> Self {
        let delta = self.angle.rotate_by(current.inverse()).radians();
        if delta.abs() > std::f64::consts::FRAC_PI_2 {
            Self::new(
                -self.speed_mps,
                self.angle.rotate_by(Rotation2d::from_radians(std::f64::consts::PI)),
            )
        } else {
            self
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ModuleInputs {
    pub drive_position_m: f64,
    pub drive_velocity_mps: f64,
    pub drive_applied_volts: f64,
    pub steer_angle: Rotation2d,
}

pub trait ModuleIo {
    fn update_inputs(&mut self, _inputs: &mut ModuleInputs) {}

    /// Closed-loop wheel speed and steer angle.
    fn set_target(&mut self, _state: ModuleState) {}

    /// Open-loop drive voltage with the wheel held straight; used by
    /// characterization sweeps.
    fn set_drive_voltage(&mut self, _volts: f64) {}
}

// ─────────────────────────────────────────────────────────────────────────────
// Flywheel
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FlywheelInputs {
    pub position_rad: f64,
    pub velocity_rad_per_sec: f64,
    pub applied_volts: f64,
}

pub trait FlywheelIo {
    fn update_inputs(&mut self, _inputs: &mut FlywheelInputs) {}

    fn set_voltage(&mut self, _volts: f64) {}

    fn set_velocity(&mut self, _rad_per_sec: f64, _ff_volts: f64) {}

    fn stop(&mut self) {}
}

// ─────────────────────────────────────────────────────────────────────────────
// Intake
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IntakeInputs {
    pub note_detected: bool,
    pub applied_volts: f64,
}

pub trait IntakeIo {
    fn update_inputs(&mut self, _inputs: &mut IntakeInputs) {}

    /// Run or stop the rollers in the collecting direction.
    fn set_running(&mut self, _running: bool) {}

    /// Push the held note into the flywheel.
    fn launch_note(&mut self) {}
}

// ─────────────────────────────────────────────────────────────────────────────
// Inert backends
// ─────────────────────────────────────────────────────────────────────────────

/// Gyro backend for replay; reports nothing.
pub struct ReplayGyro;
impl GyroIo for ReplayGyro {}

/// Module backend for replay; reports nothing.
pub struct ReplayModule;
impl ModuleIo for ReplayModule {}

/// Flywheel backend for replay; reports nothing.
pub struct ReplayFlywheel;
impl FlywheelIo for ReplayFlywheel {}

/// Intake backend for replay; reports nothing.
pub struct ReplayIntake;
impl IntakeIo for ReplayIntake {}
