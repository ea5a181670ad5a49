//! [`Drive`] – four-module swerve drivetrain facade.
//!
//! Commands are converted to module states with inverse kinematics,
//! desaturated to the configured top speed and optimised against the
//! measured steer angle before reaching the backends.  The pose is
//! dead-reckoned from module displacements and gyro yaw in
//! [`Drive::periodic`].

use fieldbot_hal::io::{GyroInputs, GyroIo, ModuleInputs, ModuleIo, ModuleState};
use fieldbot_hal::MODULE_COUNT;
use fieldbot_types::{ChassisSpeeds, Pose2d, Rotation2d, Translation2d};
use tracing::debug;

use super::Characterizable;

/// Half of the module spacing, both axes.
const MODULE_OFFSET_M: f64 = 0.325;

#[derive(Debug, Clone, PartialEq)]
pub struct DriveConfig {
    pub max_linear_speed_mps: f64,
    pub max_angular_speed_rps: f64,
    /// FL, FR, BL, BR relative to the robot centre.
    pub module_locations: [Translation2d; MODULE_COUNT],
}

impl DriveConfig {
    pub fn drive_base_radius(&self) -> f64 {
        self.module_locations
            .iter()
            .map(Translation2d::norm)
            .fold(0.0, f64::max)
    }
}

impl Default for DriveConfig {
    fn default() -> Self {
        let module_locations = [
            Translation2d::new(MODULE_OFFSET_M, MODULE_OFFSET_M),
            Translation2d::new(MODULE_OFFSET_M, -MODULE_OFFSET_M),
            Translation2d::new(-MODULE_OFFSET_M, MODULE_OFFSET_M),
            Translation2d::new(-MODULE_OFFSET_M, -MODULE_OFFSET_M),
        ];
        let max_linear_speed_mps = 4.69;
        let radius = MODULE_OFFSET_M.hypot(MODULE_OFFSET_M);
        Self {
            max_linear_speed_mps,
            max_angular_speed_rps: max_linear_speed_mps / radius,
            module_locations,
        }
    }
}

pub struct Drive {
    config: DriveConfig,
    gyro: Box<dyn GyroIo>,
    gyro_inputs: GyroInputs,
    modules: [Box<dyn ModuleIo>; MODULE_COUNT],
    module_inputs: [ModuleInputs; MODULE_COUNT],
    last_positions: Option<[f64; MODULE_COUNT]>,
    setpoints: [ModuleState; MODULE_COUNT],
    pose: Pose2d,
    /// Added to gyro yaw to get the pose heading.
    yaw_offset: Rotation2d,
}

impl Drive {
    pub fn new(
        config: DriveConfig,
        gyro: Box<dyn GyroIo>,
        modules: [Box<dyn ModuleIo>; MODULE_COUNT],
    ) -> Self {
        Self {
            config,
            gyro,
            gyro_inputs: GyroInputs::default(),
            modules,
            module_inputs: [ModuleInputs::default(); MODULE_COUNT],
            last_positions: None,
            setpoints: [ModuleState::default(); MODULE_COUNT],
            pose: Pose2d::default(),
            yaw_offset: Rotation2d::ZERO,
        }
    }

    pub fn config(&self) -> &DriveConfig {
        &self.config
    }

    /// Refresh backend inputs and advance odometry.
    pub fn periodic(&mut self) {
        self.gyro.update_inputs(&mut self.gyro_inputs);
        for (io, inputs) in self.modules.iter_mut().zip(self.module_inputs.iter_mut()) {
            io.update_inputs(inputs);
        }

        let positions = self.module_inputs.map(|m| m.drive_position_m);
        let Some(last) = self.last_positions.replace(positions) else {
            return;
        };

        let mut dx = 0.0;
        let mut dy = 0.0;
        let mut turn = 0.0;
        let mut lever = 0.0;
        for i in 0..MODULE_COUNT {
            let travel = Translation2d::new(positions[i] - last[i], 0.0)
                .rotate_by(self.module_inputs[i].steer_angle);
            let loc = self.config.module_locations[i];
            dx += travel.x;
            dy += travel.y;
            turn += loc.x * travel.y - loc.y * travel.x;
            lever += loc.x * loc.x + loc.y * loc.y;
        }
        let n = MODULE_COUNT as f64;
        let displacement = Translation2d::new(dx / n, dy / n);

        let heading_before = self.pose.rotation;
        let heading_after = if self.gyro_inputs.connected {
            self.gyro_inputs.yaw.rotate_by(self.yaw_offset)
        } else {
            heading_before.rotate_by(Rotation2d::from_radians(turn / lever))
        };
        self.pose = Pose2d {
            translation: self
                .pose
                .translation
                .plus(displacement.rotate_by(heading_before)),
            rotation: heading_after,
        };
    }

    /// Drive at robot-relative `speeds`.
    pub fn run_velocity(&mut self, speeds: ChassisSpeeds) {
        let mut states = self.config.module_locations.map(|loc| {
            let v = Translation2d::new(
                speeds.vx - speeds.omega * loc.y,
                speeds.vy + speeds.omega * loc.x,
            );
            ModuleState::new(v.norm(), v.angle())
        });

        let fastest = states.iter().map(|s| s.speed_mps).fold(0.0, f64::max);
        if fastest > self.config.max_linear_speed_mps {
            let scale = self.config.max_linear_speed_mps / fastest;
            for state in &mut states {
                state.speed_mps *= scale;
            }
        }

        for i in 0..MODULE_COUNT {
            let current = self.module_inputs[i].steer_angle;
            let state = if states[i].speed_mps.abs() < 1e-6 {
                ModuleState::new(0.0, current)
            } else {
                states[i].optimize(current)
            };
            self.setpoints[i] = state;
            self.modules[i].set_target(state);
        }
    }

    /// Drive at `speeds` expressed in the field frame.
    pub fn drive_field_relative(&mut self, speeds: ChassisSpeeds) {
        let robot = ChassisSpeeds::from_field_relative(speeds, self.pose.rotation);
        self.run_velocity(robot);
    }

    pub fn stop(&mut self) {
        self.run_velocity(ChassisSpeeds::default());
    }

    /// Stop with the wheels turned towards the centre so the robot resists
    /// being pushed.
    pub fn stop_with_x(&mut self) {
        for i in 0..MODULE_COUNT {
            let state = ModuleState::new(0.0, self.config.module_locations[i].angle());
            self.setpoints[i] = state;
            self.modules[i].set_target(state);
        }
    }

    pub fn pose(&self) -> Pose2d {
        self.pose
    }

    /// Reset odometry to `pose`.  The gyro itself is not re-zeroed.
    pub fn set_pose(&mut self, pose: Pose2d) {
        debug!(x = pose.x(), y = pose.y(), heading_deg = pose.rotation.degrees(), "drive pose reset");
        self.pose = pose;
        self.yaw_offset = pose.rotation.rotate_by(self.gyro_inputs.yaw.inverse());
    }

    /// Last commanded module states.
    pub fn module_setpoints(&self) -> [ModuleState; MODULE_COUNT] {
        self.setpoints
    }

    /// Measured module states.
    pub fn module_states(&self) -> [ModuleState; MODULE_COUNT] {
        self.module_inputs
            .map(|m| ModuleState::new(m.drive_velocity_mps, m.steer_angle))
    }
}

impl Characterizable for Drive {
    fn run_characterization(&mut self, volts: f64) {
        for module in &mut self.modules {
            module.set_drive_voltage(volts);
        }
    }

    /// Mean wheel speed, m/s.
    fn characterization_velocity(&self) -> f64 {
        let total: f64 = self.module_inputs.iter().map(|m| m.drive_velocity_mps).sum();
        total / MODULE_COUNT as f64
    }

    fn end_characterization(&mut self) {
        self.run_characterization(0.0);
    }
}
