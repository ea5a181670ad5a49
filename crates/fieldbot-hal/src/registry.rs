//! [`DeviceRegistry`] – the driver table that hardware backends are built from.
//!
//! Vendor drivers are registered by bus identifier before the hardware
//! selector runs.  Each backend then *takes* the drivers it needs through
//! the [`DeviceProvider`] contract; a driver can be handed out once only, so
//! two backends can never end up commanding the same device.

use std::collections::HashMap;

use fieldbot_types::FieldbotError;

use crate::device::{DigitalInput, GyroDevice, MotorController};

/// Source of device drivers for the hardware backends.
///
/// Injected into the hardware selector for real-hardware mode.
pub trait DeviceProvider {
    /// # Errors
    ///
    /// Returns [`FieldbotError::HardwareFault`] when no driver answers on `id`.
    fn open_motor(&mut self, id: u32) -> Result<Box<dyn MotorController>, FieldbotError>;

    fn open_gyro(&mut self, id: u32) -> Result<Box<dyn GyroDevice>, FieldbotError>;

    fn open_digital_input(&mut self, channel: u32) -> Result<Box<dyn DigitalInput>, FieldbotError>;
}

/// Driver table keyed by bus identifier.
#[derive(Default)]
pub struct DeviceRegistry {
    motors: HashMap<u32, Box<dyn MotorController>>,
    gyros: HashMap<u32, Box<dyn GyroDevice>>,
    inputs: HashMap<u32, Box<dyn DigitalInput>>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a motor controller.  Any previously registered driver with
    /// the same id is replaced.
    pub fn register_motor(&mut self, motor: Box<dyn MotorController>) {
        self.motors.insert(motor.id(), motor);
    }

    /// Register a gyro.  Any previously registered driver with the same id is
    /// replaced.
    pub fn register_gyro(&mut self, gyro: Box<dyn GyroDevice>) {
        self.gyros.insert(gyro.id(), gyro);
    }

    /// Register a digital input.  Any previously registered driver on the
    /// same channel is replaced.
    pub fn register_digital_input(&mut self, input: Box<dyn DigitalInput>) {
        self.inputs.insert(input.channel(), input);
    }

    /// Number of drivers not yet handed out.
    pub fn remaining(&self) -> usize {
        self.motors.len() + self.gyros.len() + self.inputs.len()
    }
}

fn missing(kind: &str, id: u32) -> FieldbotError {
    FieldbotError::HardwareFault {
        component: format!("{kind} {id}"),
        details: format!("{kind} {id} is not registered or was already claimed"),
    }
}

impl DeviceProvider for DeviceRegistry {
    fn open_motor(&mut self, id: u32) -> Result<Box<dyn MotorController>, FieldbotError> {
        self.motors.remove(&id).ok_or_else(|| missing("motor", id))
    }

    fn open_gyro(&mut self, id: u32) -> Result<Box<dyn GyroDevice>, FieldbotError> {
        self.gyros.remove(&id).ok_or_else(|| missing("gyro", id))
    }

    fn open_digital_input(&mut self, channel: u32) -> Result<Box<dyn DigitalInput>, FieldbotError> {
        self.inputs
            .remove(&channel)
            .ok_or_else(|| missing("digital input", channel))
    }
}
