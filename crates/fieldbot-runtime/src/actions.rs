//! Action builders over [`RobotContext`].
//!
//! Every function returns a fresh action; bindings and routines wrap them in
//! factories so each activation starts from clean state.

use fieldbot_kernel::{Action, FnAction, Sequence, StopReason};
use fieldbot_types::{ChassisSpeeds, Pose2d, Rotation2d, SubsystemKind, SweepDirection, SweepKind};
use tracing::{info, trace, warn};

use crate::context::RobotContext;
use crate::operator::FLYWHEEL_SPEED_KEY;
use crate::profile::ControllerProfile;
use crate::subsystems::Characterizable;

/// Quasistatic sweep ramp rate, V/s.
pub const SWEEP_RAMP_VOLTS_PER_SEC: f64 = 1.0;
/// Dynamic sweep step, V.
pub const SWEEP_STEP_VOLTS: f64 = 7.0;
pub const SWEEP_TIMEOUT_S: f64 = 10.0;

pub fn boxed(action: impl Action<RobotContext> + 'static) -> Box<dyn Action<RobotContext>> {
    Box::new(action)
}

// ─────────────────────────────────────────────────────────────────────────────
// Drive
// ─────────────────────────────────────────────────────────────────────────────

/// Joystick shaping limits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JoystickShaping {
    pub deadband: f64,
    pub max_linear_speed_mps: f64,
    pub max_angular_speed_rps: f64,
}

/// Rescale `value` so the output starts at zero at the deadband edge.
fn apply_deadband(value: f64, deadband: f64) -> f64 {
    if value.abs() <= deadband {
        0.0
    } else {
        value.signum() * (value.abs() - deadband) / (1.0 - deadband)
    }
}

/// Map already-negated stick values to field-relative chassis speeds.
///
/// The deadband applies to the linear magnitude, so diagonal motion is not
/// clipped per axis; magnitude and rotation are squared with sign kept.
pub fn shape_joystick(forward: f64, strafe: f64, rotation: f64, shaping: &JoystickShaping) -> ChassisSpeeds {
    let magnitude = apply_deadband(forward.hypot(strafe).min(1.0), shaping.deadband);
    let direction = strafe.atan2(forward);
    let omega = apply_deadband(rotation.clamp(-1.0, 1.0), shaping.deadband);

    let linear = magnitude * magnitude * shaping.max_linear_speed_mps;
    ChassisSpeeds::new(
        linear * direction.cos(),
        linear * direction.sin(),
        omega * omega.abs() * shaping.max_angular_speed_rps,
    )
}

/// Default drivetrain action: read the stick every cycle and drive
/// field-relative.  Stick forward reads negative, hence the negation.
pub fn joystick_drive(profile: ControllerProfile, shaping: JoystickShaping) -> FnAction<RobotContext> {
    FnAction::run("Joystick Drive", SubsystemKind::Drive, move |ctx: &mut RobotContext| {
        let speeds = shape_joystick(
            -ctx.input.axis(profile.forward_axis),
            -ctx.input.axis(profile.strafe_axis),
            -ctx.input.axis(profile.rotation_axis),
            &shaping,
        );
        ctx.drive.drive_field_relative(speeds);
    })
}

/// Re-seat odometry: on the simulated ground truth when simulating,
/// otherwise keep the translation and zero the heading.  Allowed while
/// disabled.
pub fn reset_pose() -> FnAction<RobotContext> {
    FnAction::run_once("Reset Pose", SubsystemKind::Drive, |ctx: &mut RobotContext| {
        let pose = ctx.sync.simulated_pose().unwrap_or_else(|| Pose2d {
            translation: ctx.drive.pose().translation,
            rotation: Rotation2d::ZERO,
        });
        info!(x = pose.x(), y = pose.y(), heading_deg = pose.rotation.degrees(), "pose reset");
        ctx.drive.set_pose(pose);
    })
    .ignoring_disable()
}

/// Hold the wheels crossed while active.
pub fn x_stance() -> FnAction<RobotContext> {
    FnAction::run("X Stance", SubsystemKind::Drive, |ctx: &mut RobotContext| {
        ctx.drive.stop_with_x();
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Flywheel
// ─────────────────────────────────────────────────────────────────────────────

/// Spin at the operator-tunable speed, following changes every cycle, and
/// stop on end.
pub fn flywheel_tunable(name: &str) -> FnAction<RobotContext> {
    FnAction::new(name)
        .claiming(SubsystemKind::Flywheel)
        .on_execute(|ctx: &mut RobotContext, _dt| {
            match ctx.panel.number(FLYWHEEL_SPEED_KEY) {
                Some(rpm) if ctx.flywheel.setpoint_rpm() != Some(rpm) => {
                    ctx.flywheel.run_velocity(rpm)
                }
                Some(_) => {}
                None => {
                    warn!(key = FLYWHEEL_SPEED_KEY, "tunable speed not published; flywheel idle");
                    ctx.flywheel.stop();
                }
            }
        })
        .on_stop(|ctx: &mut RobotContext, _| ctx.flywheel.stop())
}

/// Spin at `rpm`; on end command zero speed rather than coasting.
pub fn flywheel_fixed(rpm: f64) -> FnAction<RobotContext> {
    FnAction::start_end(
        "Flywheel Fixed",
        SubsystemKind::Flywheel,
        move |ctx: &mut RobotContext| ctx.flywheel.run_velocity(rpm),
        |ctx: &mut RobotContext| ctx.flywheel.run_velocity(0.0),
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Intake
// ─────────────────────────────────────────────────────────────────────────────

pub fn intake_until_note() -> FnAction<RobotContext> {
    FnAction::new("Intake Until Note")
        .claiming(SubsystemKind::Intake)
        .on_execute(|ctx: &mut RobotContext, _dt| ctx.intake.run(true))
        .until(|ctx: &RobotContext| ctx.intake.note_detected())
        .on_stop(|ctx: &mut RobotContext, _| ctx.intake.run(false))
}

pub fn launch_note() -> FnAction<RobotContext> {
    FnAction::start_end(
        "Launch Note",
        SubsystemKind::Intake,
        |ctx: &mut RobotContext| ctx.intake.launch(),
        |ctx: &mut RobotContext| ctx.intake.stop(),
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Characterization
// ─────────────────────────────────────────────────────────────────────────────

/// Selects the mechanism a sweep drives.
pub type MechanismAccess = fn(&mut RobotContext) -> &mut dyn Characterizable;

pub fn drive_mechanism(ctx: &mut RobotContext) -> &mut dyn Characterizable {
    &mut ctx.drive
}

pub fn flywheel_mechanism(ctx: &mut RobotContext) -> &mut dyn Characterizable {
    &mut ctx.flywheel
}

/// Open-loop voltage sweep: a 1 V/s ramp (quasistatic) or a 7 V step
/// (dynamic), signed by direction, stopped after [`SWEEP_TIMEOUT_S`].
pub fn characterization(
    name: String,
    claim: SubsystemKind,
    mechanism: MechanismAccess,
    kind: SweepKind,
    direction: SweepDirection,
) -> FnAction<RobotContext> {
    let sign = direction.sign();
    let mut elapsed = 0.0;
    FnAction::new(name)
        .claiming(claim)
        .with_timeout(SWEEP_TIMEOUT_S)
        .on_execute(move |ctx: &mut RobotContext, dt| {
            elapsed += dt;
            let volts = sign
                * match kind {
                    SweepKind::Quasistatic => SWEEP_RAMP_VOLTS_PER_SEC * elapsed,
                    SweepKind::Dynamic => SWEEP_STEP_VOLTS,
                };
            let target = mechanism(ctx);
            target.run_characterization(volts);
            trace!(volts, velocity = target.characterization_velocity(), "sweep sample");
        })
        .on_stop(move |ctx: &mut RobotContext, _| mechanism(ctx).end_characterization())
}

// ─────────────────────────────────────────────────────────────────────────────
// Composed routines
// ─────────────────────────────────────────────────────────────────────────────

const SPIN_UP_TOLERANCE_RPM: f64 = 50.0;
const SPIN_UP_TIMEOUT_S: f64 = 1.5;
const FEED_TIME_S: f64 = 0.5;

/// Spin up, feed the preloaded note, spin down.
pub fn shoot_preload(rpm: f64) -> Sequence<RobotContext> {
    let spin_up = FnAction::new("Spin Up")
        .claiming(SubsystemKind::Flywheel)
        .with_timeout(SPIN_UP_TIMEOUT_S)
        .on_start(move |ctx: &mut RobotContext| ctx.flywheel.run_velocity(rpm))
        .until(|ctx: &RobotContext| ctx.flywheel.at_setpoint(SPIN_UP_TOLERANCE_RPM))
        .on_stop(|ctx: &mut RobotContext, reason: StopReason| {
            if reason.interrupted() && reason != StopReason::TimedOut {
                ctx.flywheel.stop();
            }
        });
    let feed = FnAction::new("Feed")
        .claiming(SubsystemKind::Intake)
        .with_timeout(FEED_TIME_S)
        .on_start(|ctx: &mut RobotContext| ctx.intake.launch())
        .on_stop(|ctx: &mut RobotContext, reason: StopReason| {
            ctx.intake.stop();
            if reason != StopReason::TimedOut {
                ctx.flywheel.stop();
            }
        });
    let spin_down = FnAction::run_once("Spin Down", SubsystemKind::Flywheel, |ctx: &mut RobotContext| {
        ctx.flywheel.stop()
    });

    Sequence::new("Shoot Preload", vec![boxed(spin_up), boxed(feed), boxed(spin_down)])
}
