//! Simulated world for simulation mode.
//!
//! [`SimWorld`] owns the drivetrain body, the flywheel and intake models and
//! the arena of game pieces.  The simulation backends in [`io`] share it
//! through a [`SimWorldHandle`]; the control cycle is single-threaded, so the
//! handle is an `Rc<RefCell<_>>` and never crosses threads.
//!
//! | Part | Type |
//! |---|---|
//! | drivetrain body, gyro, modules | [`drive::SwerveDriveSimulation`] |
//! | flywheel | [`mechanisms::FlywheelSimulation`] |
//! | intake | [`mechanisms::IntakeSimulation`] |
//! | notes on the carpet and in flight | [`arena::Arena`] |

pub mod arena;
pub mod drive;
pub mod io;
pub mod mechanisms;

use std::cell::RefCell;
use std::rc::Rc;

use fieldbot_types::{Pose3d, Translation2d};

use self::arena::{Arena, NoteProjectile};
use self::drive::{DriveSimConfig, SwerveDriveSimulation};
use self::mechanisms::{FlywheelSimulation, IntakeSimulation};
use crate::hardware::WHEEL_RADIUS_M;

/// Shared handle to the simulated world.
pub type SimWorldHandle = Rc<RefCell<SimWorld>>;

/// Shooter pitch above horizontal.
const LAUNCH_PITCH_DEG: f64 = 55.0;
/// Height at which the note leaves the shooter.
const LAUNCH_HEIGHT_M: f64 = 0.45;
/// Shooter exit point ahead of the robot centre.
const LAUNCH_OFFSET_M: f64 = 0.2;
/// Fraction of flywheel rim speed imparted to the note.
const LAUNCH_EFFICIENCY: f64 = 0.5;

#[derive(Debug, Clone, PartialEq)]
pub struct SimWorldConfig {
    pub drive: DriveSimConfig,
    /// Start holding a note, as at the beginning of a match.
    pub preload_note: bool,
}

impl Default for SimWorldConfig {
    fn default() -> Self {
        Self {
            drive: DriveSimConfig::default(),
            preload_note: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SimWorld {
    pub drive: SwerveDriveSimulation,
    pub flywheel: FlywheelSimulation,
    pub intake: IntakeSimulation,
    pub arena: Arena,
}

impl SimWorld {
    /// Build the world with the drivetrain at its initial pose and the field
    /// set up for autonomous.
    pub fn new(config: SimWorldConfig) -> Self {
        let mut intake = IntakeSimulation::default();
        if config.preload_note {
            intake.load_note();
        }
        let mut arena = Arena::new();
        arena.reset_field_for_auto();
        Self {
            drive: SwerveDriveSimulation::new(config.drive),
            flywheel: FlywheelSimulation::default(),
            intake,
            arena,
        }
    }

    pub fn into_handle(self) -> SimWorldHandle {
        Rc::new(RefCell::new(self))
    }

    /// Advance every part of the world by `dt` seconds.
    pub fn step(&mut self, dt: f64) {
        self.drive.step(dt);
        self.flywheel.step(dt);
        let bumper = self.drive.config().bumper_length_m;
        self.intake.step(self.drive.pose(), bumper, &mut self.arena);
        self.arena.step(dt);
    }

    /// Fire the held note using the current flywheel speed, robot pose and
    /// field-relative chassis velocity.  Returns `false` when no note is held.
    pub fn launch_note(&mut self) -> bool {
        if !self.intake.take_note() {
            return false;
        }
        let pose = self.drive.pose();
        let chassis = self.drive.field_relative_speeds();
        let exit_speed = self.flywheel.velocity_rad_per_sec() * WHEEL_RADIUS_M * LAUNCH_EFFICIENCY;
        let pitch = LAUNCH_PITCH_DEG.to_radians();
        let horizontal = exit_speed * pitch.cos();
        let exit = pose.transform_point(Translation2d::new(LAUNCH_OFFSET_M, 0.0));

        self.arena.launch(NoteProjectile {
            pose: Pose3d {
                x: exit.x,
                y: exit.y,
                z: LAUNCH_HEIGHT_M,
                pitch: -pitch,
                yaw: pose.rotation.radians(),
                ..Default::default()
            },
            velocity: [
                horizontal * pose.rotation.cos() + chassis.vx,
                horizontal * pose.rotation.sin() + chassis.vy,
                exit_speed * pitch.sin(),
            ],
        });
        true
    }

    pub fn game_pieces_by_type(&self, kind: &str) -> Option<Vec<Pose3d>> {
        self.arena.game_pieces_by_type(kind)
    }
}
