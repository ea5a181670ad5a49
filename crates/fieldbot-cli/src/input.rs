//! Scripted operator input for headless runs.
//!
//! A script names the device it pretends to be and lists timed input
//! states.  Each state holds until the next one starts:
//!
//! ```toml
//! device = "Xbox Controller"
//!
//! [[step]]
//! at = 16.0
//! buttons = [1]            # A held
//!
//! [[step]]
//! at = 20.0
//! axes = [0.0, -0.8]       # left stick forward
//! ```

use std::fs;
use std::path::Path;

use fieldbot_runtime::{DeviceIdentity, InputDevice};
use fieldbot_types::{ConfigError, InputSnapshot};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
struct Script {
    device: String,
    #[serde(default, rename = "step")]
    steps: Vec<Step>,
}

#[derive(Debug, Clone, Deserialize)]
struct Step {
    /// Seconds after the loop started.
    at: f64,
    #[serde(default)]
    axes: Vec<f64>,
    /// Held buttons, numbered from 1.
    #[serde(default)]
    buttons: Vec<usize>,
}

pub struct ScriptedDevice {
    identity: DeviceIdentity,
    /// Sorted by start time.
    steps: Vec<(f64, InputSnapshot)>,
}

impl ScriptedDevice {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            details: e.to_string(),
        })?;
        Self::parse(&raw).map_err(|details| ConfigError::Parse {
            path: path.display().to_string(),
            details,
        })
    }

    fn parse(raw: &str) -> Result<Self, String> {
        let script: Script = toml::from_str(raw).map_err(|e| e.to_string())?;
        let identity = DeviceIdentity::new(script.device);

        let mut steps = Vec::with_capacity(script.steps.len());
        for step in script.steps {
            if !step.at.is_finite() || step.at < 0.0 {
                return Err(format!("step time {} is not a non-negative number", step.at));
            }
            if step.axes.len() > identity.axis_count {
                return Err(format!("step at {}s sets {} axes", step.at, step.axes.len()));
            }
            let mut snapshot = InputSnapshot {
                axes: vec![0.0; identity.axis_count],
                buttons: vec![false; identity.button_count],
            };
            snapshot.axes[..step.axes.len()].copy_from_slice(&step.axes);
            for button in step.buttons {
                match button.checked_sub(1).and_then(|i| snapshot.buttons.get_mut(i)) {
                    Some(held) => *held = true,
                    None => return Err(format!("step at {}s holds unknown button {button}", step.at)),
                }
            }
            steps.push((step.at, snapshot));
        }
        steps.sort_by(|a, b| a.0.total_cmp(&b.0));

        Ok(Self { identity, steps })
    }
}

impl InputDevice for ScriptedDevice {
    fn identity(&self) -> Option<DeviceIdentity> {
        Some(self.identity.clone())
    }

    fn poll(&mut self, elapsed_s: f64) -> InputSnapshot {
        self.steps
            .iter()
            .take_while(|(at, _)| *at <= elapsed_s)
            .last()
            .map(|(_, snapshot)| snapshot.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldbot_runtime::{ProfileKind, detect_profile};

    const SCRIPT: &str = r#"
device = "Wireless Controller"

[[step]]
at = 2.0
axes = [0.0, -0.5]

[[step]]
at = 1.0
buttons = [2, 3]
"#;

    #[test]
    fn steps_hold_until_the_next_one() {
        let mut device = ScriptedDevice::parse(SCRIPT).unwrap();
        assert_eq!(device.poll(0.5), InputSnapshot::default());

        let pressed = device.poll(1.5);
        assert!(pressed.button(2) && pressed.button(3));
        assert!(!pressed.button(1));

        let moving = device.poll(30.0);
        assert_eq!(moving.axis(1), -0.5);
        assert!(!moving.button(2));
    }

    #[test]
    fn identity_drives_profile_detection() {
        let device = ScriptedDevice::parse(SCRIPT).unwrap();
        let profile = detect_profile(device.identity().as_ref());
        assert_eq!(profile.kind, ProfileKind::DualShock4);
    }

    #[test]
    fn out_of_range_button_is_rejected() {
        let err = ScriptedDevice::parse(
            r#"
device = "Xbox Controller"
[[step]]
at = 0.0
buttons = [11]
"#,
        )
        .err()
        .unwrap();
        assert!(err.contains("button 11"));
    }

    #[test]
    fn load_reports_the_path() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("script.toml");
        fs::write(&path, "device = 3").expect("write script");
        match ScriptedDevice::load(&path) {
            Err(ConfigError::Parse { path: reported, .. }) => {
                assert!(reported.ends_with("script.toml"));
            }
            _ => panic!("expected a parse error"),
        }
    }
}
