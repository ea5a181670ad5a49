//! Simulation-backed implementations of the backend contracts.
//!
//! Every backend holds a clone of the same [`SimWorldHandle`], so commands
//! land in one world and readings come back from it.

use fieldbot_types::Rotation2d;

use super::SimWorldHandle;
use crate::io::{
    FlywheelInputs, FlywheelIo, GyroInputs, GyroIo, IntakeInputs, IntakeIo, ModuleInputs,
    ModuleIo, ModuleState,
};

pub struct GyroIoSim {
    world: SimWorldHandle,
}

impl GyroIoSim {
    pub fn new(world: SimWorldHandle) -> Self {
        Self { world }
    }
}

impl GyroIo for GyroIoSim {
    fn update_inputs(&mut self, inputs: &mut GyroInputs) {
        let world = self.world.borrow();
        let gyro = world.drive.gyro();
        inputs.connected = true;
        inputs.yaw = gyro.yaw();
        inputs.yaw_velocity = gyro.yaw_rate();
    }

    fn reset_yaw(&mut self, yaw: Rotation2d) {
        self.world.borrow_mut().drive.gyro_mut().reset(yaw);
    }
}

pub struct ModuleIoSim {
    world: SimWorldHandle,
    index: usize,
}

impl ModuleIoSim {
    pub fn new(world: SimWorldHandle, index: usize) -> Self {
        Self { world, index }
    }
}

impl ModuleIo for ModuleIoSim {
    fn update_inputs(&mut self, inputs: &mut ModuleInputs) {
        let world = self.world.borrow();
        if let Some(module) = world.drive.module(self.index) {
            inputs.drive_position_m = module.position_m();
            inputs.drive_velocity_mps = module.speed_mps();
            inputs.drive_applied_volts = module.applied_volts();
            inputs.steer_angle = module.angle();
        }
    }

    fn set_target(&mut self, state: ModuleState) {
        if let Some(module) = self.world.borrow_mut().drive.module_mut(self.index) {
            module.set_target(state);
        }
    }

    fn set_drive_voltage(&mut self, volts: f64) {
        if let Some(module) = self.world.borrow_mut().drive.module_mut(self.index) {
            module.set_drive_voltage(volts);
        }
    }
}

pub struct FlywheelIoSim {
    world: SimWorldHandle,
}

impl FlywheelIoSim {
    pub fn new(world: SimWorldHandle) -> Self {
        Self { world }
    }
}

impl FlywheelIo for FlywheelIoSim {
    fn update_inputs(&mut self, inputs: &mut FlywheelInputs) {
        let world = self.world.borrow();
        inputs.position_rad = world.flywheel.position_rad();
        inputs.velocity_rad_per_sec = world.flywheel.velocity_rad_per_sec();
        inputs.applied_volts = world.flywheel.applied_volts();
    }

    fn set_voltage(&mut self, volts: f64) {
        self.world.borrow_mut().flywheel.set_voltage(volts);
    }

    fn set_velocity(&mut self, rad_per_sec: f64, _ff_volts: f64) {
        self.world.borrow_mut().flywheel.set_velocity(rad_per_sec);
    }

    fn stop(&mut self) {
        self.world.borrow_mut().flywheel.coast();
    }
}

/// Intake attached to the simulated drivetrain body.  Launching hands the
/// held note to the arena as a projectile.
pub struct IntakeIoSim {
    world: SimWorldHandle,
}

impl IntakeIoSim {
    pub fn new(world: SimWorldHandle) -> Self {
        Self { world }
    }
}

impl IntakeIo for IntakeIoSim {
    fn update_inputs(&mut self, inputs: &mut IntakeInputs) {
        let world = self.world.borrow();
        inputs.note_detected = world.intake.holding_note();
        inputs.applied_volts = if world.intake.is_running() {
            crate::hardware::INTAKE_VOLTS
        } else {
            0.0
        };
    }

    fn set_running(&mut self, running: bool) {
        self.world.borrow_mut().intake.set_running(running);
    }

    fn launch_note(&mut self) {
        self.world.borrow_mut().launch_note();
    }
}
