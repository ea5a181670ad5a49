//! Kinematic swerve drivetrain body with its gyro and module simulations.
//!
//! Modules track their commanded wheel speed through a first-order lag and
//! slew their steer angle at a bounded rate.  The body pose is integrated
//! from the forward kinematics of the four module velocity vectors.

use fieldbot_types::{ChassisSpeeds, Pose2d, Rotation2d, Translation2d};

use crate::hardware::{DRIVE_GEAR_RATIO, WHEEL_RADIUS_M};
use crate::io::ModuleState;
use crate::ports::MODULE_COUNT;
use crate::sim::arena::{FIELD_LENGTH_M, FIELD_WIDTH_M};

/// Kraken X60 free speed (6000 rpm).
pub const KRAKEN_X60_FREE_SPEED_RAD_PER_SEC: f64 = 628.3;

const NOMINAL_VOLTAGE: f64 = 12.0;

#[derive(Debug, Clone, PartialEq)]
pub struct DriveSimConfig {
    pub mass_kg: f64,
    pub track_width_m: f64,
    pub wheelbase_m: f64,
    pub bumper_length_m: f64,
    pub bumper_width_m: f64,
    pub max_module_speed_mps: f64,
    /// Wheel speed lag; heavier robots respond slower.
    pub drive_time_constant_s: f64,
    pub steer_rate_rad_per_sec: f64,
    pub initial_pose: Pose2d,
}

impl Default for DriveSimConfig {
    fn default() -> Self {
        Self {
            mass_kg: 45.0,
            track_width_m: 0.65,
            wheelbase_m: 0.65,
            bumper_length_m: 0.74,
            bumper_width_m: 0.74,
            max_module_speed_mps: KRAKEN_X60_FREE_SPEED_RAD_PER_SEC / DRIVE_GEAR_RATIO
                * WHEEL_RADIUS_M,
            drive_time_constant_s: 0.12,
            steer_rate_rad_per_sec: 4.0 * std::f64::consts::PI,
            initial_pose: Pose2d::new(3.0, 3.0, Rotation2d::ZERO),
        }
    }
}

impl DriveSimConfig {
    /// Module positions relative to the robot centre: FL, FR, BL, BR.
    pub fn module_locations(&self) -> [Translation2d; MODULE_COUNT] {
        let x = self.wheelbase_m / 2.0;
        let y = self.track_width_m / 2.0;
        [
            Translation2d::new(x, y),
            Translation2d::new(x, -y),
            Translation2d::new(-x, y),
            Translation2d::new(-x, -y),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ModuleCommand {
    Target(ModuleState),
    Voltage(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModuleSimulation {
    location: Translation2d,
    command: ModuleCommand,
    speed_mps: f64,
    angle: Rotation2d,
    position_m: f64,
    applied_volts: f64,
}

impl ModuleSimulation {
    fn new(location: Translation2d) -> Self {
        Self {
            location,
            command: ModuleCommand::Voltage(0.0),
            speed_mps: 0.0,
            angle: Rotation2d::ZERO,
            position_m: 0.0,
            applied_volts: 0.0,
        }
    }

    pub fn set_target(&mut self, state: ModuleState) {
        self.command = ModuleCommand::Target(state);
    }

    pub fn set_drive_voltage(&mut self, volts: f64) {
        self.command = ModuleCommand::Voltage(volts);
    }

    pub fn speed_mps(&self) -> f64 {
        self.speed_mps
    }

    pub fn angle(&self) -> Rotation2d {
        self.angle
    }

    pub fn position_m(&self) -> f64 {
        self.position_m
    }

    pub fn applied_volts(&self) -> f64 {
        self.applied_volts
    }

    fn velocity_vector(&self) -> Translation2d {
        Translation2d::new(self.speed_mps * self.angle.cos(), self.speed_mps * self.angle.sin())
    }

    fn step(&mut self, dt: f64, config: &DriveSimConfig) {
        let max = config.max_module_speed_mps;
        let (target_speed, target_angle) = match self.command {
            ModuleCommand::Target(state) => (state.speed_mps, state.angle),
            ModuleCommand::Voltage(volts) => (volts / NOMINAL_VOLTAGE * max, Rotation2d::ZERO),
        };
        let target_speed = target_speed.clamp(-max, max);
        self.applied_volts = target_speed / max * NOMINAL_VOLTAGE;

        let alpha = (dt / config.drive_time_constant_s).min(1.0);
        self.speed_mps += (target_speed - self.speed_mps) * alpha;

        let error = target_angle.rotate_by(self.angle.inverse()).radians();
        let max_step = config.steer_rate_rad_per_sec * dt;
        self.angle = self
            .angle
            .rotate_by(Rotation2d::from_radians(error.clamp(-max_step, max_step)));

        self.position_m += self.speed_mps * dt;
    }
}

/// Simulated IMU.  Reads the body heading, offset by the last re-zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GyroSimulation {
    heading: Rotation2d,
    yaw_rate: f64,
    offset: Rotation2d,
}

impl GyroSimulation {
    pub fn yaw(&self) -> Rotation2d {
        self.heading.rotate_by(self.offset.inverse())
    }

    pub fn yaw_rate(&self) -> f64 {
        self.yaw_rate
    }

    /// Make the current heading read as `yaw`.
    pub fn reset(&mut self, yaw: Rotation2d) {
        self.offset = self.heading.rotate_by(yaw.inverse());
    }

    fn update(&mut self, heading: Rotation2d, yaw_rate: f64) {
        self.heading = heading;
        self.yaw_rate = yaw_rate;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwerveDriveSimulation {
    config: DriveSimConfig,
    modules: [ModuleSimulation; MODULE_COUNT],
    gyro: GyroSimulation,
    pose: Pose2d,
    robot_speeds: ChassisSpeeds,
}

impl SwerveDriveSimulation {
    pub fn new(config: DriveSimConfig) -> Self {
        let modules = config.module_locations().map(ModuleSimulation::new);
        let mut gyro = GyroSimulation::default();
        gyro.update(config.initial_pose.rotation, 0.0);
        Self {
            pose: config.initial_pose,
            config,
            modules,
            gyro,
            robot_speeds: ChassisSpeeds::default(),
        }
    }

    pub fn config(&self) -> &DriveSimConfig {
        &self.config
    }

    /// Ground-truth pose of the simulated body.
    pub fn pose(&self) -> Pose2d {
        self.pose
    }

    /// Teleport the body, e.g. when the field is reset.
    pub fn set_pose(&mut self, pose: Pose2d) {
        self.pose = pose;
        self.gyro.update(pose.rotation, self.gyro.yaw_rate());
    }

    pub fn field_relative_speeds(&self) -> ChassisSpeeds {
        self.robot_speeds.to_field_relative(self.pose.rotation)
    }

    pub fn module(&self, index: usize) -> Option<&ModuleSimulation> {
        self.modules.get(index)
    }

    pub fn module_mut(&mut self, index: usize) -> Option<&mut ModuleSimulation> {
        self.modules.get_mut(index)
    }

    pub fn gyro(&self) -> &GyroSimulation {
        &self.gyro
    }

    pub fn gyro_mut(&mut self) -> &mut GyroSimulation {
        &mut self.gyro
    }

    pub fn step(&mut self, dt: f64) {
        for module in &mut self.modules {
            module.step(dt, &self.config);
        }

        // Forward kinematics: mean translation, least-squares rotation.
        let n = self.modules.len() as f64;
        let mut vx = 0.0;
        let mut vy = 0.0;
        let mut moment = 0.0;
        let mut radius_sq = 0.0;
        for module in &self.modules {
            let v = module.velocity_vector();
            let r = module.location;
            vx += v.x;
            vy += v.y;
            moment += r.x * v.y - r.y * v.x;
            radius_sq += r.x * r.x + r.y * r.y;
        }
        let omega = if radius_sq > 0.0 { moment / radius_sq } else { 0.0 };
        self.robot_speeds = ChassisSpeeds::new(vx / n, vy / n, omega);

        let field = self.field_relative_speeds();
        let half_length = self.config.bumper_length_m / 2.0;
        let half_width = self.config.bumper_width_m / 2.0;
        let x = (self.pose.x() + field.vx * dt).clamp(half_length, FIELD_LENGTH_M - half_length);
        let y = (self.pose.y() + field.vy * dt).clamp(half_width, FIELD_WIDTH_M - half_width);
        let heading = self.pose.rotation.rotate_by(Rotation2d::from_radians(omega * dt));
        self.pose = Pose2d::new(x, y, heading);
        self.gyro.update(heading, omega);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drive_all(sim: &mut SwerveDriveSimulation, state: ModuleState) {
        for i in 0..MODULE_COUNT {
            sim.module_mut(i).unwrap().set_target(state);
        }
    }

    #[test]
    fn starts_at_configured_pose() {
        let sim = SwerveDriveSimulation::new(DriveSimConfig::default());
        assert_eq!(sim.pose(), Pose2d::new(3.0, 3.0, Rotation2d::ZERO));
    }

    #[test]
    fn straight_drive_moves_forward() {
        let mut sim = SwerveDriveSimulation::new(DriveSimConfig::default());
        drive_all(&mut sim, ModuleState::new(2.0, Rotation2d::ZERO));
        for _ in 0..100 {
            sim.step(0.02);
        }
        assert!(sim.pose().x() > 5.0);
        assert!((sim.pose().y() - 3.0).abs() < 1e-9);
        assert!(sim.pose().rotation.radians().abs() < 1e-9);
    }

    #[test]
    fn spinning_in_place_turns_without_translating() {
        let mut sim = SwerveDriveSimulation::new(DriveSimConfig::default());
        let locations = sim.config().module_locations();
        // Tangential direction for counter-clockwise rotation; steer first.
        let angles = locations.map(|loc| loc.angle().rotate_by(Rotation2d::from_degrees(90.0)));
        for (i, angle) in angles.iter().enumerate() {
            sim.module_mut(i).unwrap().set_target(ModuleState::new(0.0, *angle));
        }
        for _ in 0..25 {
            sim.step(0.02);
        }
        for (i, angle) in angles.iter().enumerate() {
            sim.module_mut(i).unwrap().set_target(ModuleState::new(1.0, *angle));
        }
        for _ in 0..50 {
            sim.step(0.02);
        }
        assert!(sim.gyro().yaw_rate() > 0.0);
        assert!((sim.pose().x() - 3.0).abs() < 0.05);
        assert!((sim.pose().y() - 3.0).abs() < 0.05);
    }

    #[test]
    fn pose_is_clamped_inside_field() {
        let mut sim = SwerveDriveSimulation::new(DriveSimConfig::default());
        drive_all(&mut sim, ModuleState::new(-5.0, Rotation2d::ZERO));
        for _ in 0..200 {
            sim.step(0.02);
        }
        assert!((sim.pose().x() - 0.37).abs() < 1e-9);
    }

    #[test]
    fn gyro_reset_rezeroes_reading() {
        let mut sim = SwerveDriveSimulation::new(DriveSimConfig::default());
        sim.set_pose(Pose2d::new(3.0, 3.0, Rotation2d::from_degrees(30.0)));
        sim.gyro_mut().reset(Rotation2d::ZERO);
        assert!(sim.gyro().yaw().radians().abs() < 1e-9);
    }

    #[test]
    fn voltage_command_points_wheels_forward() {
        let mut sim = SwerveDriveSimulation::new(DriveSimConfig::default());
        for i in 0..MODULE_COUNT {
            sim.module_mut(i).unwrap().set_drive_voltage(6.0);
        }
        for _ in 0..100 {
            sim.step(0.02);
        }
        let module = sim.module(0).unwrap();
        let half_speed = sim.config().max_module_speed_mps / 2.0;
        assert!((module.speed_mps() - half_speed).abs() < 0.01);
        assert!((module.applied_volts() - 6.0).abs() < 1e-9);
    }
}
