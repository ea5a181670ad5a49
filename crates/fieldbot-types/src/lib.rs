//! Shared vocabulary of the fieldbot workspace: operating modes, subsystem
//! identities, operator input snapshots, telemetry values and the error
//! taxonomy.

pub mod geometry;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use geometry::{ChassisSpeeds, Pose2d, Pose3d, Rotation2d, Translation2d};

/// Which family of subsystem backends the process runs against.
///
/// Chosen once at startup and passed explicitly into the composition root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatingMode {
    /// Hardware-backed drivers wired to the static port table.
    Real,
    /// Physics-simulated world.
    #[serde(alias = "sim")]
    Simulation,
    /// Inert backends; recorded telemetry is consumed instead.
    Replay,
}

impl fmt::Display for OperatingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperatingMode::Real => write!(f, "real"),
            OperatingMode::Simulation => write!(f, "sim"),
            OperatingMode::Replay => write!(f, "replay"),
        }
    }
}

impl FromStr for OperatingMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "real" => Ok(OperatingMode::Real),
            "sim" | "simulation" => Ok(OperatingMode::Simulation),
            "replay" => Ok(OperatingMode::Replay),
            other => Err(ConfigError::UnknownMode(other.to_string())),
        }
    }
}

/// Identity of each facade. Also the unit of exclusive claim in the
/// scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SubsystemKind {
    Drive,
    Flywheel,
    Intake,
}

impl SubsystemKind {
    pub const ALL: [SubsystemKind; 3] = [
        SubsystemKind::Drive,
        SubsystemKind::Flywheel,
        SubsystemKind::Intake,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SubsystemKind::Drive => "Drive",
            SubsystemKind::Flywheel => "Flywheel",
            SubsystemKind::Intake => "Intake",
        }
    }
}

impl fmt::Display for SubsystemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Characterization sweep shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SweepKind {
    /// Slow voltage ramp.
    Quasistatic,
    /// Voltage step.
    Dynamic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SweepDirection {
    Forward,
    Reverse,
}

impl SweepDirection {
    pub fn sign(&self) -> f64 {
        match self {
            SweepDirection::Forward => 1.0,
            SweepDirection::Reverse => -1.0,
        }
    }
}

/// One cycle's worth of raw input from the operator's device.
///
/// Axes are indexed from 0; buttons are indexed from 1, matching the
/// numbering that driver-station software reports. Out-of-range reads return
/// the neutral value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputSnapshot {
    pub axes: Vec<f64>,
    pub buttons: Vec<bool>,
}

impl InputSnapshot {
    pub fn axis(&self, index: usize) -> f64 {
        self.axes.get(index).copied().unwrap_or(0.0)
    }

    pub fn button(&self, index: usize) -> bool {
        index
            .checked_sub(1)
            .and_then(|i| self.buttons.get(i).copied())
            .unwrap_or(false)
    }
}

/// A single value accepted by the telemetry sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum TelemetryValue {
    Pose(Pose2d),
    Poses3d(Vec<Pose3d>),
    Scalar(f64),
    Boolean(bool),
}

/// Fatal startup configuration problems.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("unknown operating mode '{0}' (expected real, sim or replay)")]
    UnknownMode(String),

    #[error("no construction path registered for {0} mode")]
    NoConstructionPath(OperatingMode),

    #[error("hardware port assignment missing: {0}")]
    MissingPort(String),

    #[error("hardware port {id} assigned twice ({first} and {second})")]
    DuplicatePort {
        id: u32,
        first: String,
        second: String,
    },

    #[error("routine '{0}' is already registered")]
    DuplicateRoutine(String),

    #[error("routine '{0}' is not registered")]
    UnknownRoutine(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("failed to read {path}: {details}")]
    Io { path: String, details: String },

    #[error("failed to parse {path}: {details}")]
    Parse { path: String, details: String },
}

/// Workspace-wide error type.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FieldbotError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("hardware fault on {component}: {details}")]
    HardwareFault { component: String, details: String },

    #[error("simulation desynchronized: {0}")]
    SimulationDesync(String),
}
