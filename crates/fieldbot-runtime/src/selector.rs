//! [`HardwareSelector`] – builds one backend per subsystem for the chosen
//! operating mode.
//!
//! | Mode | Drive | Flywheel | Intake | Simulated world |
//! |---|---|---|---|---|
//! | Real | [`GyroIoHardware`] + 4 × [`ModuleIoHardware`] | [`FlywheelIoHardware`] | [`IntakeIoHardware`] | – |
//! | Simulation | [`GyroIoSim`] + 4 × [`ModuleIoSim`] | [`FlywheelIoSim`] | [`IntakeIoSim`] | shared by all four |
//! | Replay | inert | inert | inert | – |
//!
//! The selector is consumed by [`HardwareSelector::build`], so the set is
//! built once.  Real mode validates the port table before opening any
//! device and needs a [`DeviceProvider`]; without one there is no way to
//! build it and the call fails with [`ConfigError::NoConstructionPath`].
//!
//! # Example
//!
//! ```
//! use fieldbot_runtime::selector::HardwareSelector;
//! use fieldbot_types::OperatingMode;
//!
//! let set = HardwareSelector::new().build(OperatingMode::Replay).unwrap();
//! assert!(set.world.is_none());
//! ```

use fieldbot_hal::hardware::{FlywheelIoHardware, GyroIoHardware, IntakeIoHardware, ModuleIoHardware};
use fieldbot_hal::io::{ModuleIo, ReplayFlywheel, ReplayGyro, ReplayIntake, ReplayModule};
use fieldbot_hal::sim::io::{FlywheelIoSim, GyroIoSim, IntakeIoSim, ModuleIoSim};
use fieldbot_hal::{
    DeviceProvider, MODULE_COUNT, PortMap, SimWorld, SimWorldConfig, SimWorldHandle,
};
use fieldbot_types::{ConfigError, FieldbotError, OperatingMode};
use tracing::info;

use crate::subsystems::{Drive, DriveConfig, Flywheel, FlywheelConfig, Intake};

/// The facades built for one process.
pub struct SubsystemSet {
    pub mode: OperatingMode,
    pub drive: Drive,
    pub flywheel: Flywheel,
    pub intake: Intake,
    /// Present in simulation mode only.
    pub world: Option<SimWorldHandle>,
}

#[derive(Default)]
pub struct HardwareSelector {
    ports: PortMap,
    devices: Option<Box<dyn DeviceProvider>>,
    sim: SimWorldConfig,
    drive: DriveConfig,
}

impl HardwareSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ports(mut self, ports: PortMap) -> Self {
        self.ports = ports;
        self
    }

    /// Driver source for real-hardware mode.
    pub fn with_devices(mut self, devices: impl DeviceProvider + 'static) -> Self {
        self.devices = Some(Box::new(devices));
        self
    }

    pub fn with_sim_config(mut self, sim: SimWorldConfig) -> Self {
        self.sim = sim;
        self
    }

    pub fn with_drive_config(mut self, drive: DriveConfig) -> Self {
        self.drive = drive;
        self
    }

    /// # Errors
    ///
    /// Real mode only: [`ConfigError::MissingPort`],
    /// [`ConfigError::DuplicatePort`] or [`ConfigError::Invalid`] from the
    /// port table, [`ConfigError::NoConstructionPath`] without a device
    /// provider, and [`FieldbotError::HardwareFault`] when a device cannot be
    /// opened.
    pub fn build(self, mode: OperatingMode) -> Result<SubsystemSet, FieldbotError> {
        let flywheel_config = FlywheelConfig::for_mode(mode);
        let set = match mode {
            OperatingMode::Real => self.build_real(flywheel_config)?,
            OperatingMode::Simulation => self.build_sim(flywheel_config),
            OperatingMode::Replay => SubsystemSet {
                mode,
                drive: Drive::new(
                    self.drive,
                    Box::new(ReplayGyro),
                    std::array::from_fn(|_| Box::new(ReplayModule) as Box<dyn ModuleIo>),
                ),
                flywheel: Flywheel::new(Box::new(ReplayFlywheel), flywheel_config),
                intake: Intake::new(Box::new(ReplayIntake)),
                world: None,
            },
        };
        info!(%mode, "subsystem backends constructed");
        Ok(set)
    }

    fn build_real(self, flywheel_config: FlywheelConfig) -> Result<SubsystemSet, FieldbotError> {
        let ports = self.ports.resolve()?;
        let Some(mut devices) = self.devices else {
            return Err(ConfigError::NoConstructionPath(OperatingMode::Real).into());
        };

        let gyro = GyroIoHardware::new(devices.open_gyro(ports.gyro)?);
        let mut modules: Vec<Box<dyn ModuleIo>> = Vec::with_capacity(MODULE_COUNT);
        for module in &ports.modules {
            modules.push(Box::new(ModuleIoHardware::new(
                devices.open_motor(module.drive_motor)?,
                devices.open_motor(module.steer_motor)?,
                module.steer_offset_rad,
            )));
        }
        let modules: [Box<dyn ModuleIo>; MODULE_COUNT] = modules.try_into().map_err(|_| {
            ConfigError::Invalid(format!("expected {MODULE_COUNT} drive modules"))
        })?;

        let flywheel = FlywheelIoHardware::new(devices.open_motor(ports.flywheel_motor)?);
        let intake = IntakeIoHardware::new(
            devices.open_motor(ports.intake_motor)?,
            devices.open_digital_input(ports.intake_beam_break)?,
        );

        Ok(SubsystemSet {
            mode: OperatingMode::Real,
            drive: Drive::new(self.drive, Box::new(gyro), modules),
            flywheel: Flywheel::new(Box::new(flywheel), flywheel_config),
            intake: Intake::new(Box::new(intake)),
            world: None,
        })
    }

    fn build_sim(self, flywheel_config: FlywheelConfig) -> SubsystemSet {
        let world = SimWorld::new(self.sim).into_handle();
        let modules = std::array::from_fn(|i| {
            Box::new(ModuleIoSim::new(world.clone(), i)) as Box<dyn ModuleIo>
        });
        SubsystemSet {
            mode: OperatingMode::Simulation,
            drive: Drive::new(self.drive, Box::new(GyroIoSim::new(world.clone())), modules),
            flywheel: Flywheel::new(Box::new(FlywheelIoSim::new(world.clone())), flywheel_config),
            intake: Intake::new(Box::new(IntakeIoSim::new(world.clone()))),
            world: Some(world),
        }
    }
}
