//! Operator-tunable numbers.
//!
//! Actions read these every cycle, so a change takes effect on the next
//! cycle without rebuilding any binding.

use std::collections::BTreeMap;

use tracing::{debug, warn};

/// Target speed of the tunable flywheel binding, rpm.
pub const FLYWHEEL_SPEED_KEY: &str = "Flywheel Speed";

#[derive(Debug, Clone, Default)]
pub struct OperatorPanel {
    numbers: BTreeMap<String, f64>,
}

impl OperatorPanel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a number with its initial value.  Re-registering keeps the
    /// current value.
    pub fn register_number(&mut self, key: impl Into<String>, default: f64) {
        let key = key.into();
        debug!(key = %key, default, "tunable number registered");
        self.numbers.entry(key).or_insert(default);
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        self.numbers.get(key).copied()
    }

    /// Returns `false` and leaves the panel untouched when `key` was never
    /// registered.
    pub fn set_number(&mut self, key: &str, value: f64) -> bool {
        match self.numbers.get_mut(key) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => {
                warn!(key, "ignoring update of unregistered tunable number");
                false
            }
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.numbers.keys().map(String::as_str)
    }
}
