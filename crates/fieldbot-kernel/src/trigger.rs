//! Trigger conditions evaluated against one cycle's input snapshot.

use std::fmt;

use fieldbot_types::InputSnapshot;

/// A condition on raw device indices.  Profile resolution happens before
/// triggers are built, so a trigger never knows which controller it reads.
#[derive(Debug, Clone, PartialEq)]
pub enum Trigger {
    /// Button pressed; 1-based device index.
    Button(usize),
    /// Axis value strictly above `threshold`; 0-based device index.
    AxisAbove { axis: usize, threshold: f64 },
}

impl Trigger {
    pub fn is_active(&self, input: &InputSnapshot) -> bool {
        match self {
            Trigger::Button(index) => input.button(*index),
            Trigger::AxisAbove { axis, threshold } => input.axis(*axis) > *threshold,
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Button(index) => write!(f, "button {index}"),
            Trigger::AxisAbove { axis, threshold } => write!(f, "axis {axis} > {threshold}"),
        }
    }
}

/// How a binding reacts to its trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// Start on the rising edge, stop on the falling edge.
    WhileHeld,
    /// Start on the rising edge; runs until it finishes, times out or is
    /// preempted.
    OnTrue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Rising,
    Falling,
    Steady,
}

impl Edge {
    pub fn between(previous: bool, current: bool) -> Self {
        match (previous, current) {
            (false, true) => Edge::Rising,
            (true, false) => Edge::Falling,
            _ => Edge::Steady,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axis_threshold_is_strict() {
        let trigger = Trigger::AxisAbove {
            axis: 3,
            threshold: 0.5,
        };
        let mut input = InputSnapshot {
            axes: vec![0.0, 0.0, 0.0, 0.5],
            buttons: vec![],
        };
        assert!(!trigger.is_active(&input));
        input.axes[3] = 0.51;
        assert!(trigger.is_active(&input));
    }

    #[test]
    fn button_reads_one_based_index() {
        let input = InputSnapshot {
            axes: vec![],
            buttons: vec![false, true],
        };
        assert!(Trigger::Button(2).is_active(&input));
        assert!(!Trigger::Button(1).is_active(&input));
        assert!(!Trigger::Button(12).is_active(&input));
    }

    #[test]
    fn edges() {
        assert_eq!(Edge::between(false, true), Edge::Rising);
        assert_eq!(Edge::between(true, false), Edge::Falling);
        assert_eq!(Edge::between(true, true), Edge::Steady);
        assert_eq!(Edge::between(false, false), Edge::Steady);
    }
}
