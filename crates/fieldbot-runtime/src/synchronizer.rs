//! [`SimulationSynchronizer`] – advances the simulated world once per cycle.
//!
//! Outside simulation mode the synchronizer holds no world and every call is
//! a no-op.  In simulation mode a world is mandatory; losing access to it is
//! a [`FieldbotError::SimulationDesync`], never a silent skip.

use fieldbot_hal::sim::arena::NOTE_TYPE;
use fieldbot_hal::SimWorldHandle;
use fieldbot_types::{ConfigError, FieldbotError, OperatingMode, Pose2d, TelemetryValue};
use tracing::trace;

use crate::recorder::TelemetrySink;
use crate::subsystems::Drive;

pub const ROBOT_POSITION_KEY: &str = "FieldSimulation/RobotPosition";
pub const NOTES_KEY: &str = "FieldSimulation/Notes";

pub struct SimulationSynchronizer {
    world: Option<SimWorldHandle>,
}

impl SimulationSynchronizer {
    /// # Errors
    ///
    /// - [`FieldbotError::SimulationDesync`] – simulation mode without a world.
    /// - [`ConfigError::Invalid`] – a world supplied in any other mode.
    pub fn new(mode: OperatingMode, world: Option<SimWorldHandle>) -> Result<Self, FieldbotError> {
        match (mode, world) {
            (OperatingMode::Simulation, None) => Err(FieldbotError::SimulationDesync(
                "simulation mode selected but no simulated world was built".to_string(),
            )),
            (OperatingMode::Simulation, Some(world)) => Ok(Self { world: Some(world) }),
            (_, None) => Ok(Self { world: None }),
            (other, Some(_)) => Err(ConfigError::Invalid(format!(
                "a simulated world must not exist in {other} mode"
            ))
            .into()),
        }
    }

    pub fn is_active(&self) -> bool {
        self.world.is_some()
    }

    /// Step the world by `dt` seconds and publish the robot and note poses.
    ///
    /// # Errors
    ///
    /// [`FieldbotError::SimulationDesync`] if the world is already borrowed,
    /// i.e. something holds it across the cycle boundary.
    pub fn tick(&mut self, dt: f64, sink: &mut dyn TelemetrySink) -> Result<(), FieldbotError> {
        let Some(world) = &self.world else {
            return Ok(());
        };
        let mut world = world.try_borrow_mut().map_err(|e| {
            FieldbotError::SimulationDesync(format!("simulated world unavailable: {e}"))
        })?;
        world.step(dt);

        let pose = world.drive.pose();
        trace!(x = pose.x(), y = pose.y(), "simulated robot pose");
        sink.record(ROBOT_POSITION_KEY, TelemetryValue::Pose(pose));
        if let Some(notes) = world.game_pieces_by_type(NOTE_TYPE) {
            sink.record(NOTES_KEY, TelemetryValue::Poses3d(notes));
        }
        Ok(())
    }

    /// Ground-truth pose of the simulated body, when simulating.
    pub fn simulated_pose(&self) -> Option<Pose2d> {
        self.world.as_ref().map(|w| w.borrow().drive.pose())
    }

    /// The simulated pose when simulating, otherwise the drivetrain's
    /// estimate.
    pub fn resolve_current_pose(&self, drive: &Drive) -> Pose2d {
        self.simulated_pose().unwrap_or_else(|| drive.pose())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::MemorySink;
    use crate::subsystems::DriveConfig;
    use fieldbot_hal::io::{ModuleIo, ReplayGyro, ReplayModule};
    use fieldbot_hal::{SimWorld, SimWorldConfig};
    use fieldbot_types::Rotation2d;

    fn replay_drive() -> Drive {
        let modules = std::array::from_fn(|_| Box::new(ReplayModule) as Box<dyn ModuleIo>);
        Drive::new(DriveConfig::default(), Box::new(ReplayGyro), modules)
    }

    #[test]
    fn inactive_outside_simulation() {
        for mode in [OperatingMode::Real, OperatingMode::Replay] {
            let mut sync = SimulationSynchronizer::new(mode, None).unwrap();
            let mut sink = MemorySink::new();
            for _ in 0..10 {
                sync.tick(0.02, &mut sink).unwrap();
            }
            assert!(!sync.is_active());
            assert_eq!(sink.write_count(), 0);
        }
    }

    #[test]
    fn simulation_without_world_is_desync() {
        let err = SimulationSynchronizer::new(OperatingMode::Simulation, None)
            .err()
            .unwrap();
        assert!(matches!(err, FieldbotError::SimulationDesync(_)));
    }

    #[test]
    fn world_in_real_mode_is_rejected() {
        let world = SimWorld::new(SimWorldConfig::default()).into_handle();
        let err = SimulationSynchronizer::new(OperatingMode::Real, Some(world))
            .err()
            .unwrap();
        assert!(matches!(err, FieldbotError::Config(ConfigError::Invalid(_))));
    }

    #[test]
    fn tick_publishes_pose_and_notes() {
        let world = SimWorld::new(SimWorldConfig::default()).into_handle();
        let mut sync =
            SimulationSynchronizer::new(OperatingMode::Simulation, Some(world.clone())).unwrap();
        let mut sink = MemorySink::new();
        sync.tick(0.02, &mut sink).unwrap();

        assert_eq!(
            sink.latest(ROBOT_POSITION_KEY),
            Some(&TelemetryValue::Pose(Pose2d::new(3.0, 3.0, Rotation2d::ZERO)))
        );
        let Some(TelemetryValue::Poses3d(notes)) = sink.latest(NOTES_KEY) else {
            panic!("notes not published");
        };
        assert_eq!(notes.len(), 11);
    }

    #[test]
    fn held_borrow_is_desync() {
        let world = SimWorld::new(SimWorldConfig::default()).into_handle();
        let mut sync =
            SimulationSynchronizer::new(OperatingMode::Simulation, Some(world.clone())).unwrap();
        let _held = world.borrow();
        let err = sync.tick(0.02, &mut MemorySink::new()).unwrap_err();
        assert!(matches!(err, FieldbotError::SimulationDesync(_)));
    }

    #[test]
    fn resolve_pose_prefers_simulation() {
        let mut drive = replay_drive();
        drive.set_pose(Pose2d::new(1.0, 1.0, Rotation2d::ZERO));

        let real = SimulationSynchronizer::new(OperatingMode::Real, None).unwrap();
        assert_eq!(real.resolve_current_pose(&drive), Pose2d::new(1.0, 1.0, Rotation2d::ZERO));

        let world = SimWorld::new(SimWorldConfig::default()).into_handle();
        let sim = SimulationSynchronizer::new(OperatingMode::Simulation, Some(world)).unwrap();
        assert_eq!(sim.resolve_current_pose(&drive), Pose2d::new(3.0, 3.0, Rotation2d::ZERO));
    }
}
