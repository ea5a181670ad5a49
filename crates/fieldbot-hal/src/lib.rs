//! `fieldbot-hal` – Subsystem backends
//!
//! Everything below the subsystem facades: the contracts the facades call,
//! and the three backend families that implement them.
//!
//! # Modules
//!
//! - [`io`] – the backend contracts ([`GyroIo`][io::GyroIo],
//!   [`ModuleIo`][io::ModuleIo], [`FlywheelIo`][io::FlywheelIo],
//!   [`IntakeIo`][io::IntakeIo]) and the inert `Replay*` family.
//! - [`hardware`] – hardware-backed family, built from device drivers.
//! - [`sim`] – the simulated world ([`SimWorld`][sim::SimWorld]) and the
//!   simulation-backed family in [`sim::io`].
//! - [`device`] – vendor driver traits: motor controllers, gyros, digital
//!   inputs.
//! - [`registry`] – [`DeviceRegistry`][registry::DeviceRegistry]: the
//!   driver table hardware backends take their devices from.
//! - [`bench`] – [`BenchRegistry`][bench::BenchRegistry]: stub drivers for
//!   exercising real-hardware mode without a robot.
//! - [`ports`] – the static port table and its validation.

pub mod bench;
pub mod device;
pub mod hardware;
pub mod io;
pub mod ports;
pub mod registry;
pub mod sim;

pub use device::{DigitalInput, GyroDevice, MotorController};
pub use io::{
    FlywheelInputs, FlywheelIo, GyroInputs, GyroIo, IntakeInputs, IntakeIo, ModuleInputs,
    ModuleIo, ModuleState,
};
pub use ports::{MODULE_COUNT, PortMap, ResolvedPorts};
pub use registry::{DeviceProvider, DeviceRegistry};
pub use sim::{SimWorld, SimWorldConfig, SimWorldHandle};
