use std::f64::consts::PI;

use fieldbot_hal::io::{FlywheelInputs, FlywheelIo};
use fieldbot_types::OperatingMode;
use tracing::debug;

use super::Characterizable;

const RPM_TO_RAD_PER_SEC: f64 = 2.0 * PI / 60.0;

/// Velocity feedforward gains.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlywheelConfig {
    /// Static friction, volts.
    pub ks: f64,
    /// Volts per rad/s.
    pub kv: f64,
}

impl FlywheelConfig {
    /// Gains tuned for each backend family.
    pub fn for_mode(mode: OperatingMode) -> Self {
        match mode {
            OperatingMode::Real | OperatingMode::Replay => Self { ks: 0.1, kv: 0.05 },
            OperatingMode::Simulation => Self { ks: 0.0, kv: 0.03 },
        }
    }
}

/// Spin-up actuator facade.  Speeds at this surface are in rpm.
pub struct Flywheel {
    io: Box<dyn FlywheelIo>,
    inputs: FlywheelInputs,
    config: FlywheelConfig,
    setpoint_rpm: Option<f64>,
}

impl Flywheel {
    pub fn new(io: Box<dyn FlywheelIo>, config: FlywheelConfig) -> Self {
        Self {
            io,
            inputs: FlywheelInputs::default(),
            config,
            setpoint_rpm: None,
        }
    }

    pub fn periodic(&mut self) {
        self.io.update_inputs(&mut self.inputs);
    }

    /// Closed-loop velocity with feedforward.
    pub fn run_velocity(&mut self, rpm: f64) {
        let rad_per_sec = rpm * RPM_TO_RAD_PER_SEC;
        let ff = self.config.ks * rad_per_sec.signum() + self.config.kv * rad_per_sec;
        debug!(rpm, ff_volts = ff, "flywheel velocity setpoint");
        self.io.set_velocity(rad_per_sec, ff);
        self.setpoint_rpm = Some(rpm);
    }

    pub fn run_volts(&mut self, volts: f64) {
        self.io.set_voltage(volts);
        self.setpoint_rpm = None;
    }

    pub fn stop(&mut self) {
        self.io.stop();
        self.setpoint_rpm = None;
    }

    pub fn velocity_rpm(&self) -> f64 {
        self.inputs.velocity_rad_per_sec / RPM_TO_RAD_PER_SEC
    }

    /// Last closed-loop target; `None` after `stop` or an open-loop command.
    pub fn setpoint_rpm(&self) -> Option<f64> {
        self.setpoint_rpm
    }

    /// Measured speed within `tolerance_rpm` of the closed-loop target.
    pub fn at_setpoint(&self, tolerance_rpm: f64) -> bool {
        self.setpoint_rpm
            .is_some_and(|target| (self.velocity_rpm() - target).abs() <= tolerance_rpm)
    }
}

impl Characterizable for Flywheel {
    fn run_characterization(&mut self, volts: f64) {
        self.run_volts(volts);
    }

    /// rad/s
    fn characterization_velocity(&self) -> f64 {
        self.inputs.velocity_rad_per_sec
    }

    fn end_characterization(&mut self) {
        self.stop();
    }
}
