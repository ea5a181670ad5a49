//! `fieldbot-kernel` – Action scheduling
//!
//! Mode-agnostic orchestration.  Nothing here knows which subsystems exist
//! or which backends drive them: every type is generic over the cycle
//! context `C` that the composition root owns.
//!
//! # Modules
//!
//! - [`action`] – the [`Action`][action::Action] contract and the
//!   closure-backed [`FnAction`][action::FnAction].
//! - [`sequence`] – [`Sequence`][sequence::Sequence]: runs actions one after
//!   another.
//! - [`trigger`] – button and axis-threshold conditions and edge detection.
//! - [`binding`] – [`BindingTable`][binding::BindingTable]: ordered
//!   trigger → action records plus per-subsystem default actions; reports
//!   overlapping claims when built.
//! - [`claims`] – [`ClaimRegistry`][claims::ClaimRegistry]: which action
//!   holds each subsystem.
//! - [`scheduler`] – [`Scheduler`][scheduler::Scheduler]: polls bindings,
//!   arbitrates claims and runs active actions once per cycle.
//! - [`catalog`] – [`RoutineCatalog`][catalog::RoutineCatalog]: named
//!   autonomous and characterization routines plus the operator's selection.
//! - [`watchdog`] – [`Watchdog`][watchdog::Watchdog]: control-cycle overrun
//!   detection.

pub mod action;
pub mod binding;
pub mod catalog;
pub mod claims;
pub mod scheduler;
pub mod sequence;
pub mod trigger;
pub mod watchdog;

pub use action::{Action, ActionFactory, CycleContext, FnAction, StopReason};
pub use binding::{BindingTable, ClaimOverlap};
pub use catalog::{NONE_ROUTINE, RoutineCatalog, RoutineKind};
pub use claims::ActionId;
pub use scheduler::Scheduler;
pub use sequence::Sequence;
pub use trigger::{Activation, Trigger};
pub use watchdog::{CycleHealth, Watchdog};
