use fieldbot_kernel::CycleContext;
use fieldbot_types::InputSnapshot;

use crate::operator::OperatorPanel;
use crate::subsystems::{Drive, Flywheel, Intake};
use crate::synchronizer::SimulationSynchronizer;

/// Everything an action may touch during a cycle.
///
/// The robot owns the only instance; the scheduler lends it to one action
/// callback at a time.
pub struct RobotContext {
    pub drive: Drive,
    pub flywheel: Flywheel,
    pub intake: Intake,
    pub panel: OperatorPanel,
    pub sync: SimulationSynchronizer,
    pub input: InputSnapshot,
}

impl CycleContext for RobotContext {
    fn input(&self) -> &InputSnapshot {
        &self.input
    }
}
