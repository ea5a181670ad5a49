//! Controller profile resolution.
//!
//! [`detect_profile`] maps the connected device's reported identity to a
//! [`ControllerProfile`]: the raw axis and button indices behind each logical
//! slot.  Binding code only ever reads the logical slots.
//!
//! | Profile | Recognised by | forward / strafe / rotation | triggers L / R | A B X RB |
//! |---|---|---|---|---|
//! | Xbox (XInput) | name contains `xbox`, `xinput` or `x-box` | 1 / 0 / 4 | 2 / 3 | 1 2 3 6 |
//! | DualShock 4 | name contains `wireless controller`, `dualshock` or `ps4` | 1 / 0 / 2 | 3 / 4 | 2 3 1 6 |
//! | Unknown | anything else, or no device | Xbox layout | | |
//!
//! Axes are 0-based and buttons 1-based, as the driver station reports them.

use std::fmt;

use fieldbot_types::InputSnapshot;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// What the input device reports about itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    pub name: String,
    #[serde(default)]
    pub axis_count: usize,
    #[serde(default)]
    pub button_count: usize,
}

impl DeviceIdentity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            axis_count: 6,
            button_count: 10,
        }
    }
}

/// Source of operator input.
pub trait InputDevice {
    /// Identity of the connected device, `None` when nothing is plugged in.
    fn identity(&self) -> Option<DeviceIdentity>;

    /// Sample the device `elapsed_s` seconds after the control loop started.
    fn poll(&mut self, elapsed_s: f64) -> InputSnapshot;
}

/// No device connected: unknown profile, neutral input.
pub struct NoDevice;

impl InputDevice for NoDevice {
    fn identity(&self) -> Option<DeviceIdentity> {
        None
    }

    fn poll(&mut self, _elapsed_s: f64) -> InputSnapshot {
        InputSnapshot::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProfileKind {
    Xbox,
    DualShock4,
    /// Device not recognised; the Xbox layout is used.
    Unknown,
}

impl fmt::Display for ProfileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileKind::Xbox => write!(f, "Xbox"),
            ProfileKind::DualShock4 => write!(f, "DualShock 4"),
            ProfileKind::Unknown => write!(f, "unknown"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerProfile {
    pub kind: ProfileKind,
    pub forward_axis: usize,
    pub strafe_axis: usize,
    pub rotation_axis: usize,
    pub left_trigger_axis: usize,
    pub right_trigger_axis: usize,
    pub button_a: usize,
    pub button_b: usize,
    pub button_x: usize,
    pub right_bumper: usize,
}

impl ControllerProfile {
    pub const XBOX: ControllerProfile = ControllerProfile {
        kind: ProfileKind::Xbox,
        forward_axis: 1,
        strafe_axis: 0,
        rotation_axis: 4,
        left_trigger_axis: 2,
        right_trigger_axis: 3,
        button_a: 1,
        button_b: 2,
        button_x: 3,
        right_bumper: 6,
    };

    /// Face buttons by position: Cross, Circle, Square stand in for A, B, X.
    pub const DUALSHOCK4: ControllerProfile = ControllerProfile {
        kind: ProfileKind::DualShock4,
        forward_axis: 1,
        strafe_axis: 0,
        rotation_axis: 2,
        left_trigger_axis: 3,
        right_trigger_axis: 4,
        button_a: 2,
        button_b: 3,
        button_x: 1,
        right_bumper: 6,
    };

    pub const UNKNOWN: ControllerProfile = ControllerProfile {
        kind: ProfileKind::Unknown,
        ..ControllerProfile::XBOX
    };

    pub fn is_unknown(&self) -> bool {
        self.kind == ProfileKind::Unknown
    }
}

/// Resolve the profile for `device`.  Never fails: an unrecognised or absent
/// device yields [`ControllerProfile::UNKNOWN`] and a warning.
pub fn detect_profile(device: Option<&DeviceIdentity>) -> ControllerProfile {
    let Some(device) = device else {
        warn!("no input device connected; using default controller layout");
        return ControllerProfile::UNKNOWN;
    };

    let name = device.name.to_ascii_lowercase();
    let profile = if ["xbox", "xinput", "x-box"].iter().any(|k| name.contains(k)) {
        ControllerProfile::XBOX
    } else if ["wireless controller", "dualshock", "ps4"]
        .iter()
        .any(|k| name.contains(k))
    {
        ControllerProfile::DUALSHOCK4
    } else {
        warn!(device = %device.name, "unrecognised input device; using default controller layout");
        return ControllerProfile::UNKNOWN;
    };

    info!(device = %device.name, profile = %profile.kind, "controller profile detected");
    profile
}
