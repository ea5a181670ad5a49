//! Operator bindings.
//!
//! [`build_bindings`] wires the resolved controller profile to the robot's
//! actions.  Registration order is precedence order:
//!
//! | # | Input | Activation | Action | Claims |
//! |---|---|---|---|---|
//! | – | left stick, right stick X | default | Joystick Drive | Drive |
//! | 1 | B | on press | Reset Pose (also while disabled) | Drive |
//! | 2 | X | while held | X Stance | Drive |
//! | 3 | A | while held | Flywheel Tunable | Flywheel |
//! | 4 | left trigger > threshold | while held | Intake Until Note | Intake |
//! | 5 | right bumper | while held | Flywheel Fixed | Flywheel |
//! | 6 | right trigger > threshold | while held | Launch Note | Intake |
//!
//! While A and the right bumper are both held, Flywheel Fixed wins in either
//! press order.  Releasing the bumper hands the flywheel back to Flywheel
//! Tunable if A is still held.

use fieldbot_kernel::{BindingTable, Trigger};
use fieldbot_types::SubsystemKind;
use serde::{Deserialize, Serialize};

use crate::actions::{self, JoystickShaping, boxed};
use crate::context::RobotContext;
use crate::profile::ControllerProfile;
use crate::subsystems::DriveConfig;

pub const RESET_POSE: &str = "Reset Pose";
pub const X_STANCE: &str = "X Stance";
pub const FLYWHEEL_TUNABLE: &str = "Flywheel Tunable";
pub const INTAKE_UNTIL_NOTE: &str = "Intake Until Note";
pub const FLYWHEEL_FIXED: &str = "Flywheel Fixed";
pub const LAUNCH_NOTE: &str = "Launch Note";

fn default_trigger_threshold() -> f64 {
    0.5
}

fn default_flywheel_speed_rpm() -> f64 {
    1500.0
}

fn default_flywheel_fixed_rpm() -> f64 {
    3000.0
}

fn default_drive_deadband() -> f64 {
    0.1
}

fn default_max_linear_speed() -> f64 {
    DriveConfig::default().max_linear_speed_mps
}

fn default_max_angular_speed() -> f64 {
    DriveConfig::default().max_angular_speed_rps
}

/// Tunables of the binding layer, the `[bindings]` config section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BindingConfig {
    /// Trigger axis value above which the intake bindings fire.
    #[serde(default = "default_trigger_threshold")]
    pub trigger_threshold: f64,

    /// Initial value of the operator-tunable flywheel speed.
    #[serde(default = "default_flywheel_speed_rpm")]
    pub flywheel_speed_default_rpm: f64,

    #[serde(default = "default_flywheel_fixed_rpm")]
    pub flywheel_fixed_rpm: f64,

    #[serde(default = "default_drive_deadband")]
    pub drive_deadband: f64,

    #[serde(default = "default_max_linear_speed")]
    pub max_linear_speed_mps: f64,

    #[serde(default = "default_max_angular_speed")]
    pub max_angular_speed_rps: f64,
}

impl Default for BindingConfig {
    fn default() -> Self {
        Self {
            trigger_threshold: default_trigger_threshold(),
            flywheel_speed_default_rpm: default_flywheel_speed_rpm(),
            flywheel_fixed_rpm: default_flywheel_fixed_rpm(),
            drive_deadband: default_drive_deadband(),
            max_linear_speed_mps: default_max_linear_speed(),
            max_angular_speed_rps: default_max_angular_speed(),
        }
    }
}

impl BindingConfig {
    pub fn shaping(&self) -> JoystickShaping {
        JoystickShaping {
            deadband: self.drive_deadband,
            max_linear_speed_mps: self.max_linear_speed_mps,
            max_angular_speed_rps: self.max_angular_speed_rps,
        }
    }
}

pub fn build_bindings(profile: &ControllerProfile, config: &BindingConfig) -> BindingTable<RobotContext> {
    let profile = *profile;
    let shaping = config.shaping();
    let fixed_rpm = config.flywheel_fixed_rpm;
    let left_trigger = Trigger::AxisAbove {
        axis: profile.left_trigger_axis,
        threshold: config.trigger_threshold,
    };
    let right_trigger = Trigger::AxisAbove {
        axis: profile.right_trigger_axis,
        threshold: config.trigger_threshold,
    };

    BindingTable::builder()
        .default_action(SubsystemKind::Drive, move || {
            boxed(actions::joystick_drive(profile, shaping))
        })
        .on_true(RESET_POSE, Trigger::Button(profile.button_b), || {
            boxed(actions::reset_pose())
        })
        .while_held(X_STANCE, Trigger::Button(profile.button_x), || {
            boxed(actions::x_stance())
        })
        .while_held(FLYWHEEL_TUNABLE, Trigger::Button(profile.button_a), || {
            boxed(actions::flywheel_tunable(FLYWHEEL_TUNABLE))
        })
        .while_held(INTAKE_UNTIL_NOTE, left_trigger, || {
            boxed(actions::intake_until_note())
        })
        .while_held(FLYWHEEL_FIXED, Trigger::Button(profile.right_bumper), move || {
            boxed(actions::flywheel_fixed(fixed_rpm))
        })
        .while_held(LAUNCH_NOTE, right_trigger, || boxed(actions::launch_note()))
        .build()
}
