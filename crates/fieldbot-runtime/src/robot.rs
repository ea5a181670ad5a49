//! [`Robot`] – the composition root.
//!
//! Owns the facades (inside the [`RobotContext`]), the scheduler with its
//! binding table, the routine catalog, the telemetry sink and the loop
//! watchdog.  Mode-specific work ends once the [`HardwareSelector`] has
//! built the subsystem set; everything after that is shared by all modes.
//!
//! # Cycle
//!
//! | Phase | Work |
//! |---|---|
//! | `subsystems` | refresh facade inputs, advance odometry |
//! | `scheduler` | poll bindings, schedule defaults, run actions |
//! | `simulation` | step the simulated world, publish its state |
//! | `visualization` | publish the held note at the resolved pose (not on a real robot) |
//!
//! # Example
//!
//! ```
//! use fieldbot_runtime::recorder::NullSink;
//! use fieldbot_runtime::robot::{Robot, RobotConfig, RobotState};
//! use fieldbot_runtime::selector::HardwareSelector;
//! use fieldbot_types::{InputSnapshot, OperatingMode};
//!
//! let mut robot = Robot::new(
//!     &RobotConfig::default(),
//!     OperatingMode::Simulation,
//!     HardwareSelector::new(),
//!     None,
//!     Box::new(NullSink),
//! )
//! .unwrap();
//! robot.set_state(RobotState::Teleop);
//! robot.cycle(InputSnapshot::default(), 0.02).unwrap();
//! ```

use std::fmt;
use std::time::{Duration, Instant};

use fieldbot_kernel::{ActionId, RoutineCatalog, Scheduler, Watchdog};
use fieldbot_types::{FieldbotError, InputSnapshot, OperatingMode};
use tracing::info;

use crate::bindings::{BindingConfig, build_bindings};
use crate::context::RobotContext;
use crate::operator::{FLYWHEEL_SPEED_KEY, OperatorPanel};
use crate::profile::{ControllerProfile, DeviceIdentity, detect_profile};
use crate::recorder::TelemetrySink;
use crate::routines::build_catalog;
use crate::selector::{HardwareSelector, SubsystemSet};
use crate::synchronizer::SimulationSynchronizer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RobotState {
    Disabled,
    Autonomous,
    Teleop,
}

impl fmt::Display for RobotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RobotState::Disabled => write!(f, "disabled"),
            RobotState::Autonomous => write!(f, "autonomous"),
            RobotState::Teleop => write!(f, "teleop"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RobotConfig {
    pub bindings: BindingConfig,
    pub loop_period: Duration,
    /// Routine to preselect in the chooser.
    pub autonomous: Option<String>,
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            bindings: BindingConfig::default(),
            loop_period: Duration::from_millis(20),
            autonomous: None,
        }
    }
}

pub struct Robot {
    mode: OperatingMode,
    profile: ControllerProfile,
    ctx: RobotContext,
    scheduler: Scheduler<RobotContext>,
    catalog: RoutineCatalog<RobotContext>,
    state: RobotState,
    autonomous: Option<ActionId>,
    watchdog: Watchdog,
    sink: Box<dyn TelemetrySink>,
}

impl Robot {
    /// Build the subsystems for `mode`, resolve the controller profile and
    /// assemble the robot.  Starts disabled.
    ///
    /// # Errors
    ///
    /// Any configuration or construction failure; see
    /// [`HardwareSelector::build`] and [`Robot::assemble`].
    pub fn new(
        config: &RobotConfig,
        mode: OperatingMode,
        selector: HardwareSelector,
        device: Option<&DeviceIdentity>,
        sink: Box<dyn TelemetrySink>,
    ) -> Result<Self, FieldbotError> {
        info!(%mode, "starting robot");
        let set = selector.build(mode)?;
        let profile = detect_profile(device);
        Self::assemble(config, set, profile, sink)
    }

    /// Wire an already-built subsystem set.
    ///
    /// # Errors
    ///
    /// - [`FieldbotError::SimulationDesync`] – simulation set without a world.
    /// - [`ConfigError::DuplicateRoutine`](fieldbot_types::ConfigError::DuplicateRoutine)
    ///   or [`ConfigError::UnknownRoutine`](fieldbot_types::ConfigError::UnknownRoutine)
    ///   from the chooser.
    pub fn assemble(
        config: &RobotConfig,
        set: SubsystemSet,
        profile: ControllerProfile,
        sink: Box<dyn TelemetrySink>,
    ) -> Result<Self, FieldbotError> {
        let sync = SimulationSynchronizer::new(set.mode, set.world)?;

        let mut panel = OperatorPanel::new();
        panel.register_number(FLYWHEEL_SPEED_KEY, config.bindings.flywheel_speed_default_rpm);

        let mut catalog = build_catalog(&config.bindings)?;
        if let Some(name) = &config.autonomous {
            catalog.select(name)?;
        }
        let table = build_bindings(&profile, &config.bindings);
        info!(
            bindings = table.len(),
            overlaps = table.overlapping_claims().len(),
            routines = catalog.len(),
            "robot assembled"
        );

        Ok(Self {
            mode: set.mode,
            profile,
            ctx: RobotContext {
                drive: set.drive,
                flywheel: set.flywheel,
                intake: set.intake,
                panel,
                sync,
                input: InputSnapshot::default(),
            },
            scheduler: Scheduler::new(table),
            catalog,
            state: RobotState::Disabled,
            autonomous: None,
            watchdog: Watchdog::new(config.loop_period),
            sink,
        })
    }

    pub fn mode(&self) -> OperatingMode {
        self.mode
    }

    pub fn profile(&self) -> &ControllerProfile {
        &self.profile
    }

    pub fn state(&self) -> RobotState {
        self.state
    }

    pub fn context(&self) -> &RobotContext {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut RobotContext {
        &mut self.ctx
    }

    pub fn scheduler(&self) -> &Scheduler<RobotContext> {
        &self.scheduler
    }

    pub fn catalog(&self) -> &RoutineCatalog<RobotContext> {
        &self.catalog
    }

    /// Operator chooser selection; read on the next entry to autonomous.
    ///
    /// # Errors
    ///
    /// [`ConfigError::UnknownRoutine`](fieldbot_types::ConfigError::UnknownRoutine).
    pub fn select_autonomous(&mut self, name: &str) -> Result<(), FieldbotError> {
        Ok(self.catalog.select(name)?)
    }

    pub fn overrun_count(&self) -> u64 {
        self.watchdog.overrun_count()
    }

    /// Move to `state`.  Entering autonomous reads the chooser once and
    /// schedules its routine; leaving autonomous cancels that routine.
    pub fn set_state(&mut self, state: RobotState) {
        if self.state == state {
            return;
        }
        info!(from = %self.state, to = %state, "robot state change");

        if self.state == RobotState::Autonomous
            && let Some(id) = self.autonomous.take()
            && self.scheduler.cancel(&mut self.ctx, id)
        {
            info!("autonomous routine canceled");
        }

        self.scheduler
            .set_enabled(&mut self.ctx, state != RobotState::Disabled);
        self.state = state;

        if state == RobotState::Autonomous {
            let routine = self.catalog.selected_name().to_string();
            match self.catalog.get_selected() {
                Some(action) => {
                    self.autonomous = self.scheduler.schedule(&mut self.ctx, action);
                    info!(%routine, "autonomous routine started");
                }
                None => info!("no autonomous routine selected"),
            }
        }
    }

    /// Run one control cycle with this cycle's operator input.
    ///
    /// # Errors
    ///
    /// [`FieldbotError::SimulationDesync`] from the synchronizer; the loop
    /// must stop.
    pub fn cycle(&mut self, input: InputSnapshot, dt: f64) -> Result<(), FieldbotError> {
        self.watchdog.begin_cycle(Instant::now());
        self.ctx.input = input;

        self.ctx.drive.periodic();
        self.ctx.flywheel.periodic();
        self.ctx.intake.periodic();
        self.watchdog.mark("subsystems", Instant::now());

        self.scheduler.run(&mut self.ctx, dt);
        if let Some(id) = self.autonomous
            && !self.scheduler.is_scheduled(id)
        {
            info!(routine = self.catalog.selected_name(), "autonomous routine ended");
            self.autonomous = None;
        }
        self.watchdog.mark("scheduler", Instant::now());

        self.ctx.sync.tick(dt, self.sink.as_mut())?;
        self.watchdog.mark("simulation", Instant::now());

        if self.mode != OperatingMode::Real {
            let pose = self.ctx.sync.resolve_current_pose(&self.ctx.drive);
            self.ctx.intake.visualize_note(pose, self.sink.as_mut());
        }
        self.watchdog.mark("visualization", Instant::now());

        self.watchdog.end_cycle(Instant::now());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bindings::{FLYWHEEL_FIXED, FLYWHEEL_TUNABLE, INTAKE_UNTIL_NOTE, LAUNCH_NOTE};
    use crate::recorder::MemorySink;
    use crate::routines::RUN_FLYWHEEL;
    use crate::subsystems::{Flywheel, FlywheelConfig};
    use crate::synchronizer::ROBOT_POSITION_KEY;
    use fieldbot_hal::bench::BenchRegistry;
    use fieldbot_hal::io::FlywheelIo;
    use fieldbot_hal::PortMap;
    use fieldbot_types::{Pose2d, Rotation2d, SubsystemKind, TelemetryValue};
    use std::cell::RefCell;
    use std::f64::consts::PI;
    use std::rc::Rc;

    const DT: f64 = 0.02;

    #[derive(Debug, Clone, PartialEq)]
    enum Command {
        Velocity(f64),
        Stop,
    }

    struct RecordingFlywheel(Rc<RefCell<Vec<Command>>>);

    impl FlywheelIo for RecordingFlywheel {
        fn set_velocity(&mut self, rad_per_sec: f64, _ff_volts: f64) {
            self.0.borrow_mut().push(Command::Velocity(rad_per_sec));
        }
        fn stop(&mut self) {
            self.0.borrow_mut().push(Command::Stop);
        }
    }

    struct SharedSink(Rc<RefCell<MemorySink>>);

    impl TelemetrySink for SharedSink {
        fn record(&mut self, key: &str, value: TelemetryValue) {
            self.0.borrow_mut().record(key, value);
        }
    }

    /// Xbox layout: A = 1, B = 2, X = 3, RB = 6; LT axis 2, RT axis 3.
    fn input(buttons: &[usize], axes: &[(usize, f64)]) -> InputSnapshot {
        let mut snapshot = InputSnapshot {
            axes: vec![0.0; 6],
            buttons: vec![false; 10],
        };
        for b in buttons {
            snapshot.buttons[b - 1] = true;
        }
        for (axis, value) in axes {
            snapshot.axes[*axis] = *value;
        }
        snapshot
    }

    fn sim_robot_with_recorded_flywheel() -> (Robot, Rc<RefCell<Vec<Command>>>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut set = HardwareSelector::new().build(OperatingMode::Simulation).unwrap();
        set.flywheel = Flywheel::new(
            Box::new(RecordingFlywheel(log.clone())),
            FlywheelConfig::for_mode(OperatingMode::Simulation),
        );
        let robot = Robot::assemble(
            &RobotConfig::default(),
            set,
            ControllerProfile::XBOX,
            Box::new(MemorySink::new()),
        )
        .unwrap();
        (robot, log)
    }

    fn count(log: &Rc<RefCell<Vec<Command>>>, command: &Command) -> usize {
        log.borrow().iter().filter(|c| *c == command).count()
    }

    #[test]
    fn holding_a_spins_at_tunable_speed_and_release_stops_once() {
        let (mut robot, log) = sim_robot_with_recorded_flywheel();
        robot.set_state(RobotState::Teleop);
        assert_eq!(robot.context().panel.number(FLYWHEEL_SPEED_KEY), Some(1500.0));

        for _ in 0..5 {
            robot.cycle(input(&[1], &[]), DT).unwrap();
        }
        assert_eq!(robot.context().flywheel.setpoint_rpm(), Some(1500.0));
        assert_eq!(*log.borrow(), vec![Command::Velocity(1500.0 * (2.0 * PI / 60.0))]);

        for _ in 0..5 {
            robot.cycle(input(&[], &[]), DT).unwrap();
        }
        assert_eq!(count(&log, &Command::Stop), 1);
        assert_eq!(log.borrow().len(), 2);
    }

    #[test]
    fn tunable_speed_change_is_followed_next_cycle() {
        let (mut robot, log) = sim_robot_with_recorded_flywheel();
        robot.set_state(RobotState::Teleop);
        robot.cycle(input(&[1], &[]), DT).unwrap();
        robot.context_mut().panel.set_number(FLYWHEEL_SPEED_KEY, 2400.0);
        robot.cycle(input(&[1], &[]), DT).unwrap();
        assert_eq!(robot.context().flywheel.setpoint_rpm(), Some(2400.0));
        assert_eq!(log.borrow().len(), 2);
    }

    #[test]
    fn fixed_speed_binding_preempts_tunable() {
        let (mut robot, log) = sim_robot_with_recorded_flywheel();
        robot.set_state(RobotState::Teleop);

        for _ in 0..3 {
            robot.cycle(input(&[1, 6], &[]), DT).unwrap();
        }
        assert_eq!(
            robot.scheduler().holder_name(SubsystemKind::Flywheel),
            Some(FLYWHEEL_FIXED)
        );
        assert_eq!(robot.context().flywheel.setpoint_rpm(), Some(3000.0));
        assert_eq!(*log.borrow(), vec![Command::Velocity(3000.0 * (2.0 * PI / 60.0))]);

        // Releasing both ends the fixed binding with a zero-speed command.
        robot.cycle(input(&[], &[]), DT).unwrap();
        assert_eq!(log.borrow().last(), Some(&Command::Velocity(0.0)));
        assert_eq!(count(&log, &Command::Stop), 0);
    }

    #[test]
    fn fixed_speed_held_first_keeps_the_flywheel_when_a_is_added() {
        let (mut robot, log) = sim_robot_with_recorded_flywheel();
        robot.set_state(RobotState::Teleop);

        for _ in 0..3 {
            robot.cycle(input(&[6], &[]), DT).unwrap();
        }
        for _ in 0..3 {
            robot.cycle(input(&[1, 6], &[]), DT).unwrap();
        }
        assert_eq!(
            robot.scheduler().holder_name(SubsystemKind::Flywheel),
            Some(FLYWHEEL_FIXED)
        );
        assert_eq!(robot.context().flywheel.setpoint_rpm(), Some(3000.0));
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn tunable_resumes_when_the_bumper_is_released() {
        let (mut robot, log) = sim_robot_with_recorded_flywheel();
        robot.set_state(RobotState::Teleop);

        for _ in 0..3 {
            robot.cycle(input(&[1, 6], &[]), DT).unwrap();
        }
        robot.cycle(input(&[1], &[]), DT).unwrap();
        assert_eq!(
            robot.scheduler().holder_name(SubsystemKind::Flywheel),
            Some(FLYWHEEL_TUNABLE)
        );
        assert_eq!(robot.context().flywheel.setpoint_rpm(), Some(1500.0));

        robot.cycle(input(&[], &[]), DT).unwrap();
        assert_eq!(count(&log, &Command::Stop), 1);
        assert_eq!(count(&log, &Command::Velocity(0.0)), 1);
    }

    #[test]
    fn pose_reset_works_while_disabled_in_real_mode() {
        let ports = PortMap::default().resolve().unwrap();
        let selector =
            HardwareSelector::new().with_devices(BenchRegistry::for_ports(&ports).build());
        let mut robot = Robot::new(
            &RobotConfig::default(),
            OperatingMode::Real,
            selector,
            None,
            Box::new(MemorySink::new()),
        )
        .unwrap();
        assert_eq!(robot.state(), RobotState::Disabled);

        robot.cycle(input(&[], &[]), DT).unwrap();
        robot
            .context_mut()
            .drive
            .set_pose(Pose2d::new(1.0, 2.0, Rotation2d::from_degrees(90.0)));

        robot.cycle(input(&[2], &[]), DT).unwrap();
        assert_eq!(robot.context().drive.pose(), Pose2d::new(1.0, 2.0, Rotation2d::ZERO));
        robot.cycle(input(&[], &[]), DT).unwrap();
        assert!(robot.context().drive.pose().rotation.degrees().abs() < 1e-9);
        assert!(robot.scheduler().active_names().is_empty());
    }

    #[test]
    fn intake_triggers_activate_independently() {
        let (mut robot, _) = sim_robot_with_recorded_flywheel();
        robot.set_state(RobotState::Teleop);
        // The sim world starts with a preloaded note, so launch first.
        robot.cycle(input(&[], &[(3, 0.9)]), DT).unwrap();
        assert_eq!(
            robot.scheduler().holder_name(SubsystemKind::Intake),
            Some(LAUNCH_NOTE)
        );
        robot.cycle(input(&[], &[]), DT).unwrap();
        assert!(robot.scheduler().holder_name(SubsystemKind::Intake).is_none());

        robot.cycle(input(&[], &[(2, 0.9)]), DT).unwrap();
        assert_eq!(
            robot.scheduler().holder_name(SubsystemKind::Intake),
            Some(INTAKE_UNTIL_NOTE)
        );
        assert!(robot.context().intake.applied_volts() >= 0.0);
        robot.cycle(input(&[], &[(2, 0.9)]), DT).unwrap();
        assert!(robot.context().intake.applied_volts() > 0.0);

        robot.cycle(input(&[], &[]), DT).unwrap();
        assert!(robot.scheduler().holder_name(SubsystemKind::Intake).is_none());
    }

    #[test]
    fn trigger_below_threshold_does_nothing() {
        let (mut robot, _) = sim_robot_with_recorded_flywheel();
        robot.set_state(RobotState::Teleop);
        robot.cycle(input(&[], &[(2, 0.5), (3, 0.4)]), DT).unwrap();
        assert!(robot.scheduler().holder_name(SubsystemKind::Intake).is_none());
    }

    #[test]
    fn replay_mode_publishes_no_simulation_state() {
        let shared = Rc::new(RefCell::new(MemorySink::new()));
        let mut robot = Robot::new(
            &RobotConfig::default(),
            OperatingMode::Replay,
            HardwareSelector::new(),
            None,
            Box::new(SharedSink(shared.clone())),
        )
        .unwrap();
        robot.set_state(RobotState::Teleop);
        for _ in 0..10 {
            robot.cycle(input(&[], &[]), DT).unwrap();
        }
        let sink = shared.borrow();
        assert!(sink.latest(ROBOT_POSITION_KEY).is_none());
        // Only the intake marker is written, once per cycle.
        assert_eq!(sink.write_count(), 10);
    }

    #[test]
    fn real_mode_writes_nothing_to_the_sink() {
        let shared = Rc::new(RefCell::new(MemorySink::new()));
        let ports = PortMap::default().resolve().unwrap();
        let selector =
            HardwareSelector::new().with_devices(BenchRegistry::for_ports(&ports).build());
        let mut robot = Robot::new(
            &RobotConfig::default(),
            OperatingMode::Real,
            selector,
            None,
            Box::new(SharedSink(shared.clone())),
        )
        .unwrap();
        robot.set_state(RobotState::Teleop);
        for _ in 0..5 {
            robot.cycle(input(&[], &[]), DT).unwrap();
        }
        assert_eq!(shared.borrow().write_count(), 0);
    }

    #[test]
    fn simulation_publishes_robot_position_each_cycle() {
        let shared = Rc::new(RefCell::new(MemorySink::new()));
        let mut robot = Robot::new(
            &RobotConfig::default(),
            OperatingMode::Simulation,
            HardwareSelector::new(),
            None,
            Box::new(SharedSink(shared.clone())),
        )
        .unwrap();
        robot.cycle(input(&[], &[]), DT).unwrap();
        assert!(matches!(
            shared.borrow().latest(ROBOT_POSITION_KEY),
            Some(TelemetryValue::Pose(_))
        ));
    }

    #[test]
    fn autonomous_reads_chooser_once_and_teleop_cancels_it() {
        let config = RobotConfig {
            autonomous: Some(RUN_FLYWHEEL.to_string()),
            ..Default::default()
        };
        let (set_log, mut robot) = {
            let log = Rc::new(RefCell::new(Vec::new()));
            let mut set = HardwareSelector::new().build(OperatingMode::Simulation).unwrap();
            set.flywheel = Flywheel::new(
                Box::new(RecordingFlywheel(log.clone())),
                FlywheelConfig::for_mode(OperatingMode::Simulation),
            );
            let robot = Robot::assemble(&config, set, ControllerProfile::XBOX, Box::new(MemorySink::new()))
                .unwrap();
            (log, robot)
        };

        robot.set_state(RobotState::Autonomous);
        robot.cycle(input(&[], &[]), DT).unwrap();
        assert_eq!(
            robot.scheduler().holder_name(SubsystemKind::Flywheel),
            Some(RUN_FLYWHEEL)
        );
        // Changing the selection mid-phase has no effect on the running routine.
        robot.select_autonomous(crate::routines::SHOOT_PRELOAD).unwrap();
        robot.cycle(input(&[], &[]), DT).unwrap();
        assert_eq!(
            robot.scheduler().holder_name(SubsystemKind::Flywheel),
            Some(RUN_FLYWHEEL)
        );

        robot.set_state(RobotState::Teleop);
        assert!(robot.scheduler().holder_name(SubsystemKind::Flywheel).is_none());
        assert_eq!(set_log.borrow().last(), Some(&Command::Stop));
    }

    #[test]
    fn run_flywheel_times_out_after_five_seconds() {
        let config = RobotConfig {
            autonomous: Some(RUN_FLYWHEEL.to_string()),
            ..Default::default()
        };
        let mut robot = Robot::new(
            &config,
            OperatingMode::Replay,
            HardwareSelector::new(),
            None,
            Box::new(MemorySink::new()),
        )
        .unwrap();
        robot.set_state(RobotState::Autonomous);
        for _ in 0..249 {
            robot.cycle(input(&[], &[]), DT).unwrap();
        }
        assert!(robot.scheduler().holder_name(SubsystemKind::Flywheel).is_some());
        for _ in 0..2 {
            robot.cycle(input(&[], &[]), DT).unwrap();
        }
        assert!(robot.scheduler().holder_name(SubsystemKind::Flywheel).is_none());
    }

    #[test]
    fn unknown_autonomous_selection_fails_assembly() {
        let config = RobotConfig {
            autonomous: Some("Five Note".to_string()),
            ..Default::default()
        };
        let result = Robot::new(
            &config,
            OperatingMode::Replay,
            HardwareSelector::new(),
            None,
            Box::new(MemorySink::new()),
        );
        assert!(matches!(
            result.err(),
            Some(FieldbotError::Config(fieldbot_types::ConfigError::UnknownRoutine(_)))
        ));
    }

    #[test]
    fn disabling_stops_joystick_drive() {
        let (mut robot, _) = sim_robot_with_recorded_flywheel();
        robot.set_state(RobotState::Teleop);
        robot.cycle(input(&[], &[]), DT).unwrap();
        assert_eq!(
            robot.scheduler().holder_name(SubsystemKind::Drive),
            Some("Joystick Drive")
        );
        robot.set_state(RobotState::Disabled);
        robot.cycle(input(&[], &[]), DT).unwrap();
        assert!(robot.scheduler().active_names().is_empty());
    }
}
