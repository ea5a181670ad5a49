//! Static hardware port table.
//!
//! The defaults mirror the wiring of the competition robot.  The table is
//! injected configuration: the CLI deserialises it from the `[ports]` section
//! of the config file, and any field left out there falls back to these
//! defaults.  [`PortMap::resolve`] validates the table before the hardware
//! selector opens a single device.

use std::collections::HashMap;

use fieldbot_types::ConfigError;
use serde::{Deserialize, Serialize};

/// Number of swerve modules on the drivetrain.
pub const MODULE_COUNT: usize = 4;

/// CAN assignments for one swerve module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModulePorts {
    pub drive_motor: Option<u32>,
    pub steer_motor: Option<u32>,
    /// Steer encoder reading when the wheel points straight ahead.
    #[serde(default)]
    pub steer_offset_rad: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortMap {
    /// Front-left, front-right, back-left, back-right.
    pub modules: Vec<ModulePorts>,
    pub gyro: Option<u32>,
    pub flywheel_motor: Option<u32>,
    pub intake_motor: Option<u32>,
    /// Digital I/O channel of the intake beam break.
    pub intake_beam_break: Option<u32>,
}

impl Default for PortMap {
    fn default() -> Self {
        let module = |drive, steer| ModulePorts {
            drive_motor: Some(drive),
            steer_motor: Some(steer),
            steer_offset_rad: 0.0,
        };
        Self {
            modules: vec![module(1, 2), module(3, 4), module(5, 6), module(7, 8)],
            gyro: Some(20),
            flywheel_motor: Some(9),
            intake_motor: Some(10),
            intake_beam_break: Some(0),
        }
    }
}

/// A fully-populated module assignment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedModule {
    pub drive_motor: u32,
    pub steer_motor: u32,
    pub steer_offset_rad: f64,
}

/// A validated port table; every id is present and unique on its bus.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPorts {
    pub modules: [ResolvedModule; MODULE_COUNT],
    pub gyro: u32,
    pub flywheel_motor: u32,
    pub intake_motor: u32,
    pub intake_beam_break: u32,
}

fn require(value: Option<u32>, name: impl Into<String>) -> Result<u32, ConfigError> {
    value.ok_or_else(|| ConfigError::MissingPort(name.into()))
}

impl PortMap {
    /// Validate the table.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::Invalid`] – the module list does not have exactly
    ///   four entries.
    /// - [`ConfigError::MissingPort`] – an assignment is absent.
    /// - [`ConfigError::DuplicatePort`] – two CAN devices share an id.
    pub fn resolve(&self) -> Result<ResolvedPorts, ConfigError> {
        if self.modules.len() != MODULE_COUNT {
            return Err(ConfigError::Invalid(format!(
                "expected {MODULE_COUNT} drive modules, found {}",
                self.modules.len()
            )));
        }

        let mut modules = [ResolvedModule {
            drive_motor: 0,
            steer_motor: 0,
            steer_offset_rad: 0.0,
        }; MODULE_COUNT];
        for (i, ports) in self.modules.iter().enumerate() {
            modules[i] = ResolvedModule {
                drive_motor: require(ports.drive_motor, format!("module {i} drive motor"))?,
                steer_motor: require(ports.steer_motor, format!("module {i} steer motor"))?,
                steer_offset_rad: ports.steer_offset_rad,
            };
        }

        let resolved = ResolvedPorts {
            modules,
            gyro: require(self.gyro, "gyro")?,
            flywheel_motor: require(self.flywheel_motor, "flywheel motor")?,
            intake_motor: require(self.intake_motor, "intake motor")?,
            intake_beam_break: require(self.intake_beam_break, "intake beam break")?,
        };
        resolved.check_unique_can_ids()?;
        Ok(resolved)
    }
}

impl ResolvedPorts {
    fn check_unique_can_ids(&self) -> Result<(), ConfigError> {
        let mut seen: HashMap<u32, String> = HashMap::new();
        let mut claims: Vec<(u32, String)> = Vec::new();
        for (i, m) in self.modules.iter().enumerate() {
            claims.push((m.drive_motor, format!("module {i} drive motor")));
            claims.push((m.steer_motor, format!("module {i} steer motor")));
        }
        claims.push((self.gyro, "gyro".to_string()));
        claims.push((self.flywheel_motor, "flywheel motor".to_string()));
        claims.push((self.intake_motor, "intake motor".to_string()));

        for (id, name) in claims {
            if let Some(first) = seen.get(&id) {
                return Err(ConfigError::DuplicatePort {
                    id,
                    first: first.clone(),
                    second: name,
                });
            }
            seen.insert(id, name);
        }
        Ok(())
    }
}
