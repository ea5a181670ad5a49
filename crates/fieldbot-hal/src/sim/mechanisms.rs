//! Flywheel and intake models that live in the simulated world.

use fieldbot_types::{Pose2d, Translation2d};

use crate::hardware::FLYWHEEL_GEAR_RATIO;
use crate::sim::arena::Arena;

/// NEO free speed (5676 rpm).
const NEO_FREE_SPEED_RAD_PER_SEC: f64 = 594.4;
const NOMINAL_VOLTAGE: f64 = 12.0;

#[derive(Debug, Clone, Copy, PartialEq)]
enum FlywheelCommand {
    Coast,
    Voltage(f64),
    Velocity(f64),
}

/// First-order flywheel: velocity relaxes toward the commanded target.
#[derive(Debug, Clone, PartialEq)]
pub struct FlywheelSimulation {
    free_speed_rad_per_sec: f64,
    time_constant_s: f64,
    coast_time_constant_s: f64,
    command: FlywheelCommand,
    velocity_rad_per_sec: f64,
    position_rad: f64,
    applied_volts: f64,
}

impl Default for FlywheelSimulation {
    fn default() -> Self {
        Self {
            free_speed_rad_per_sec: NEO_FREE_SPEED_RAD_PER_SEC / FLYWHEEL_GEAR_RATIO,
            time_constant_s: 0.08,
            coast_time_constant_s: 1.5,
            command: FlywheelCommand::Coast,
            velocity_rad_per_sec: 0.0,
            position_rad: 0.0,
            applied_volts: 0.0,
        }
    }
}

impl FlywheelSimulation {
    pub fn set_voltage(&mut self, volts: f64) {
        self.command = FlywheelCommand::Voltage(volts.clamp(-NOMINAL_VOLTAGE, NOMINAL_VOLTAGE));
    }

    pub fn set_velocity(&mut self, rad_per_sec: f64) {
        self.command = FlywheelCommand::Velocity(rad_per_sec);
    }

    pub fn coast(&mut self) {
        self.command = FlywheelCommand::Coast;
    }

    pub fn velocity_rad_per_sec(&self) -> f64 {
        self.velocity_rad_per_sec
    }

    pub fn position_rad(&self) -> f64 {
        self.position_rad
    }

    pub fn applied_volts(&self) -> f64 {
        self.applied_volts
    }

    pub fn step(&mut self, dt: f64) {
        let free = self.free_speed_rad_per_sec;
        let (target, tau) = match self.command {
            FlywheelCommand::Coast => (0.0, self.coast_time_constant_s),
            FlywheelCommand::Voltage(volts) => (volts / NOMINAL_VOLTAGE * free, self.time_constant_s),
            FlywheelCommand::Velocity(v) => (v.clamp(-free, free), self.time_constant_s),
        };
        self.applied_volts = match self.command {
            FlywheelCommand::Coast => 0.0,
            _ => target / free * NOMINAL_VOLTAGE,
        };
        let alpha = (dt / tau).min(1.0);
        self.velocity_rad_per_sec += (target - self.velocity_rad_per_sec) * alpha;
        self.position_rad += self.velocity_rad_per_sec * dt;
    }
}

/// Over-the-bumper intake on the front of the drivetrain body.
#[derive(Debug, Clone, PartialEq)]
pub struct IntakeSimulation {
    running: bool,
    holding_note: bool,
    /// How far past the front bumper notes are collected.
    zone_depth_m: f64,
    zone_width_m: f64,
}

impl Default for IntakeSimulation {
    fn default() -> Self {
        Self {
            running: false,
            holding_note: false,
            zone_depth_m: 0.2,
            zone_width_m: 0.6,
        }
    }
}

impl IntakeSimulation {
    pub fn set_running(&mut self, running: bool) {
        self.running = running;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn holding_note(&self) -> bool {
        self.holding_note
    }

    pub fn load_note(&mut self) {
        self.holding_note = true;
    }

    /// Hand the held note over to the shooter.
    pub fn take_note(&mut self) -> bool {
        std::mem::replace(&mut self.holding_note, false)
    }

    /// Collect a note lying in the pickup zone if the rollers are running.
    pub fn step(&mut self, robot: Pose2d, bumper_length_m: f64, arena: &mut Arena) {
        if !self.running || self.holding_note {
            return;
        }
        let front = bumper_length_m / 2.0;
        let depth = self.zone_depth_m;
        let half_width = self.zone_width_m / 2.0;
        let in_zone = |note: Translation2d| {
            let local = robot.relative_point(note);
            local.x >= front && local.x <= front + depth && local.y.abs() <= half_width
        };
        if arena.take_note_within(in_zone) {
            self.holding_note = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldbot_types::Rotation2d;

    #[test]
    fn flywheel_tracks_velocity_target() {
        let mut sim = FlywheelSimulation::default();
        sim.set_velocity(150.0);
        for _ in 0..100 {
            sim.step(0.02);
        }
        assert!((sim.velocity_rad_per_sec() - 150.0).abs() < 0.01);
        assert!(sim.applied_volts() > 0.0);
    }

    #[test]
    fn flywheel_coasts_down_slowly() {
        let mut sim = FlywheelSimulation::default();
        sim.set_velocity(200.0);
        for _ in 0..100 {
            sim.step(0.02);
        }
        sim.coast();
        sim.step(0.02);
        assert!(sim.velocity_rad_per_sec() > 190.0);
        assert_eq!(sim.applied_volts(), 0.0);
    }

    #[test]
    fn intake_collects_note_in_front_of_bumper() {
        let mut arena = Arena::new();
        arena.place_note(Translation2d::new(3.45, 3.0));
        let mut intake = IntakeSimulation::default();
        let robot = Pose2d::new(3.0, 3.0, Rotation2d::ZERO);

        intake.step(robot, 0.74, &mut arena);
        assert!(!intake.holding_note(), "rollers stopped");

        intake.set_running(true);
        intake.step(robot, 0.74, &mut arena);
        assert!(intake.holding_note());
        assert!(arena.resting_notes().is_empty());
        assert!(intake.take_note());
        assert!(!intake.take_note());
    }

    #[test]
    fn intake_ignores_note_behind_robot() {
        let mut arena = Arena::new();
        arena.place_note(Translation2d::new(2.55, 3.0));
        let mut intake = IntakeSimulation::default();
        intake.set_running(true);
        intake.step(Pose2d::new(3.0, 3.0, Rotation2d::ZERO), 0.74, &mut arena);
        assert!(!intake.holding_note());
    }
}
