//! Run configuration – reads `fieldbot.toml`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use fieldbot_hal::PortMap;
use fieldbot_runtime::{BindingConfig, RobotConfig};
use fieldbot_types::{ConfigError, OperatingMode};
use serde::{Deserialize, Serialize};
use tracing::warn;

pub const DEFAULT_CONFIG_FILE: &str = "fieldbot.toml";

/// Length of each scripted match phase, seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchPhases {
    pub disabled_s: f64,
    pub autonomous_s: f64,
    pub teleop_s: f64,
}

impl Default for MatchPhases {
    fn default() -> Self {
        Self {
            disabled_s: 1.0,
            autonomous_s: 15.0,
            teleop_s: 135.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_mode")]
    pub mode: OperatingMode,

    #[serde(default = "default_loop_period_ms")]
    pub loop_period_ms: u64,

    #[serde(default)]
    pub bindings: BindingConfig,

    #[serde(default)]
    pub ports: PortMap,

    #[serde(default, rename = "match")]
    pub phases: MatchPhases,

    /// Routine selected in the chooser at startup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autonomous: Option<String>,

    /// Scripted input timeline; without one no device is connected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_script: Option<PathBuf>,

    /// JSON-lines telemetry output file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telemetry_out: Option<PathBuf>,
}

fn default_mode() -> OperatingMode {
    OperatingMode::Simulation
}
fn default_loop_period_ms() -> u64 {
    20
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            loop_period_ms: default_loop_period_ms(),
            bindings: BindingConfig::default(),
            ports: PortMap::default(),
            phases: MatchPhases::default(),
            autonomous: None,
            input_script: None,
            telemetry_out: None,
        }
    }
}

impl Config {
    pub fn loop_period(&self) -> Duration {
        Duration::from_millis(self.loop_period_ms)
    }

    pub fn robot_config(&self) -> RobotConfig {
        RobotConfig {
            bindings: self.bindings.clone(),
            loop_period: self.loop_period(),
            autonomous: self.autonomous.clone(),
        }
    }
}

/// Load `path`, or defaults when the file does not exist, then apply the
/// environment overrides and validate.
pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
    let mut cfg = read_file(path)?;
    apply_env_overrides(&mut cfg)?;
    validate(&cfg)?;
    Ok(cfg)
}

fn read_file(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let raw = fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.display().to_string(),
        details: e.to_string(),
    })?;
    toml::from_str(&raw).map_err(|e| ConfigError::Parse {
        path: path.display().to_string(),
        details: e.to_string(),
    })
}

fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.loop_period_ms == 0 {
        return Err(ConfigError::Invalid("loop_period_ms must be positive".into()));
    }
    Ok(())
}

/// Apply `FIELDBOT_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `FIELDBOT_MODE` | `mode` |
/// | `FIELDBOT_AUTO` | `autonomous` |
/// | `FIELDBOT_LOOP_PERIOD_MS` | `loop_period_ms` |
/// | `FIELDBOT_FLYWHEEL_RPM` | `bindings.flywheel_speed_default_rpm` |
///
/// Unparseable numbers are ignored; an unknown mode is an error.
pub fn apply_env_overrides(cfg: &mut Config) -> Result<(), ConfigError> {
    if let Ok(v) = std::env::var("FIELDBOT_MODE") {
        cfg.mode = v.parse()?;
    }
    if let Ok(v) = std::env::var("FIELDBOT_AUTO") {
        cfg.autonomous = Some(v);
    }
    if let Ok(v) = std::env::var("FIELDBOT_LOOP_PERIOD_MS") {
        match v.parse::<u64>() {
            Ok(ms) => cfg.loop_period_ms = ms,
            Err(_) => warn!(value = %v, "ignoring invalid FIELDBOT_LOOP_PERIOD_MS"),
        }
    }
    if let Ok(v) = std::env::var("FIELDBOT_FLYWHEEL_RPM") {
        match v.parse::<f64>() {
            Ok(rpm) if rpm.is_finite() => cfg.bindings.flywheel_speed_default_rpm = rpm,
            _ => warn!(value = %v, "ignoring invalid FIELDBOT_FLYWHEEL_RPM"),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &tempfile::TempDir, body: &str) -> PathBuf {
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        fs::write(&path, body).expect("write config");
        path
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let cfg = read_file(&dir.path().join("absent.toml")).expect("load");
        assert_eq!(cfg.loop_period_ms, 20);
        assert_eq!(cfg.bindings, BindingConfig::default());
        assert_eq!(cfg.ports, PortMap::default());
    }

    #[test]
    fn sections_are_parsed_with_defaults_for_the_rest() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = write(
            &dir,
            r#"
mode = "replay"
autonomous = "Run Flywheel"

[bindings]
trigger_threshold = 0.7

[ports]
gyro = 30

[match]
teleop_s = 10.0
"#,
        );
        let cfg = read_file(&path).expect("load");
        assert_eq!(cfg.mode, OperatingMode::Replay);
        assert_eq!(cfg.autonomous.as_deref(), Some("Run Flywheel"));
        assert_eq!(cfg.bindings.trigger_threshold, 0.7);
        assert_eq!(cfg.bindings.flywheel_fixed_rpm, 3000.0);
        assert_eq!(cfg.ports.gyro, Some(30));
        assert_eq!(cfg.ports.modules.len(), 4);
        assert_eq!(cfg.phases.teleop_s, 10.0);
        assert_eq!(cfg.phases.autonomous_s, 15.0);
    }

    #[test]
    fn unknown_mode_in_file_is_a_parse_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = write(&dir, r#"mode = "hovercraft""#);
        assert!(matches!(read_file(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn zero_loop_period_is_rejected() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = write(&dir, "loop_period_ms = 0");
        let cfg = read_file(&path).expect("load");
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));
    }

    // apply_env_overrides reads every FIELDBOT_* variable, so the env
    // cases run in one test.
    #[test]
    fn env_overrides() {
        // SAFETY: this is the only test that touches FIELDBOT_* variables.
        unsafe {
            std::env::set_var("FIELDBOT_MODE", "real");
            std::env::set_var("FIELDBOT_AUTO", "Shoot Preload");
            std::env::set_var("FIELDBOT_LOOP_PERIOD_MS", "10");
            std::env::set_var("FIELDBOT_FLYWHEEL_RPM", "2200");
        }
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg).expect("override");
        assert_eq!(cfg.mode, OperatingMode::Real);
        assert_eq!(cfg.loop_period(), Duration::from_millis(10));
        assert_eq!(cfg.robot_config().autonomous.as_deref(), Some("Shoot Preload"));
        assert_eq!(cfg.bindings.flywheel_speed_default_rpm, 2200.0);

        unsafe {
            std::env::set_var("FIELDBOT_LOOP_PERIOD_MS", "soon");
            std::env::set_var("FIELDBOT_FLYWHEEL_RPM", "fast");
        }
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg).expect("override");
        assert_eq!(cfg.loop_period_ms, 20);
        assert_eq!(cfg.bindings.flywheel_speed_default_rpm, 1500.0);

        unsafe { std::env::set_var("FIELDBOT_MODE", "warp") };
        let err = apply_env_overrides(&mut Config::default()).unwrap_err();
        assert_eq!(err, ConfigError::UnknownMode("warp".into()));

        unsafe {
            for var in ["FIELDBOT_MODE", "FIELDBOT_AUTO", "FIELDBOT_LOOP_PERIOD_MS", "FIELDBOT_FLYWHEEL_RPM"] {
                std::env::remove_var(var);
            }
        }
    }
}
