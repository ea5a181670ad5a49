//! `fieldbot-runtime` – Robot composition
//!
//! Turns an [`OperatingMode`][fieldbot_types::OperatingMode] and an optional
//! operator device into a running robot: subsystem facades over the chosen
//! backends, the operator bindings, the autonomous chooser and the
//! simulation bridge.
//!
//! # Modules
//!
//! - [`selector`] – [`HardwareSelector`][selector::HardwareSelector]: one
//!   backend per subsystem for the chosen mode.
//! - [`subsystems`] – the [`Drive`][subsystems::Drive],
//!   [`Flywheel`][subsystems::Flywheel] and [`Intake`][subsystems::Intake]
//!   facades.  They behave identically whichever backend they wrap.
//! - [`profile`] – [`detect_profile`][profile::detect_profile]: maps the
//!   connected controller to its button and axis layout.
//! - [`actions`] – the robot's actions, built on the kernel's
//!   [`FnAction`][fieldbot_kernel::FnAction].
//! - [`bindings`] – [`build_bindings`][bindings::build_bindings]: the
//!   operator binding table for a profile.
//! - [`routines`] – [`build_catalog`][routines::build_catalog]: the
//!   autonomous chooser.
//! - [`synchronizer`] –
//!   [`SimulationSynchronizer`][synchronizer::SimulationSynchronizer]: steps
//!   the simulated world and publishes its state.
//! - [`operator`] – [`OperatorPanel`][operator::OperatorPanel]: live
//!   numeric tunables.
//! - [`recorder`] – [`TelemetrySink`][recorder::TelemetrySink] and its
//!   in-memory and JSON-lines implementations.
//! - [`robot`] – [`Robot`][robot::Robot]: the composition root and its
//!   control cycle.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: the global
//!   `tracing` subscriber with an optional OTLP span exporter.

pub mod actions;
pub mod bindings;
pub mod context;
pub mod operator;
pub mod profile;
pub mod recorder;
pub mod robot;
pub mod routines;
pub mod selector;
pub mod subsystems;
pub mod synchronizer;
pub mod telemetry;

pub use bindings::{BindingConfig, build_bindings};
pub use context::RobotContext;
pub use profile::{ControllerProfile, DeviceIdentity, InputDevice, ProfileKind, detect_profile};
pub use recorder::{JsonLinesSink, MemorySink, NullSink, TelemetrySink};
pub use robot::{Robot, RobotConfig, RobotState};
pub use routines::build_catalog;
pub use selector::{HardwareSelector, SubsystemSet};
pub use synchronizer::SimulationSynchronizer;
pub use telemetry::{TracerProviderGuard, init_tracing};
