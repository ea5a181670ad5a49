//! Subsystem facades.
//!
//! Each facade owns exactly one backend, chosen by the hardware selector, and
//! exposes the same operations whichever family that backend belongs to.
//! The facades are polled once per cycle through `periodic` before the
//! scheduler runs.

pub mod drive;
pub mod flywheel;
pub mod intake;

pub use drive::{Drive, DriveConfig};
pub use flywheel::{Flywheel, FlywheelConfig};
pub use intake::Intake;

/// Open-loop voltage control for system identification sweeps.
pub trait Characterizable {
    /// Apply `volts` to the mechanism, bypassing closed-loop control.
    fn run_characterization(&mut self, volts: f64);

    /// Measured mechanism velocity in the mechanism's own units.
    fn characterization_velocity(&self) -> f64;

    fn end_characterization(&mut self);
}
