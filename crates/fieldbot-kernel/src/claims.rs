//! [`ClaimRegistry`] – which scheduled action holds each subsystem.
//!
//! A subsystem is held by at most one action.  [`ClaimRegistry::claim`]
//! hands the subsystem to a new holder and returns the previous one so the
//! scheduler can stop it.

use std::collections::HashMap;
use std::fmt;

use fieldbot_types::SubsystemKind;

/// Identity of one scheduled action instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActionId(pub(crate) u64);

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Default)]
pub struct ClaimRegistry {
    holders: HashMap<SubsystemKind, ActionId>,
}

impl ClaimRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Give `kind` to `id`, returning the previous holder if it differs.
    pub fn claim(&mut self, kind: SubsystemKind, id: ActionId) -> Option<ActionId> {
        self.holders.insert(kind, id).filter(|prev| *prev != id)
    }

    /// Release every subsystem held by `id`.
    pub fn release_all(&mut self, id: ActionId) {
        self.holders.retain(|_, holder| *holder != id);
    }

    pub fn holder(&self, kind: SubsystemKind) -> Option<ActionId> {
        self.holders.get(&kind).copied()
    }

    pub fn is_claimed(&self, kind: SubsystemKind) -> bool {
        self.holders.contains_key(&kind)
    }

    /// Distinct current holders of any of `kinds`, in `kinds` order.
    pub fn holders_of(&self, kinds: &[SubsystemKind]) -> Vec<ActionId> {
        let mut out: Vec<ActionId> = Vec::new();
        for id in kinds.iter().filter_map(|k| self.holder(*k)) {
            if !out.contains(&id) {
                out.push(id);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claim_returns_previous_holder() {
        let mut reg = ClaimRegistry::new();
        assert_eq!(reg.claim(SubsystemKind::Flywheel, ActionId(1)), None);
        assert_eq!(
            reg.claim(SubsystemKind::Flywheel, ActionId(2)),
            Some(ActionId(1))
        );
        assert_eq!(reg.holder(SubsystemKind::Flywheel), Some(ActionId(2)));
    }

    #[test]
    fn reclaim_by_same_holder_is_not_a_conflict() {
        let mut reg = ClaimRegistry::new();
        reg.claim(SubsystemKind::Drive, ActionId(4));
        assert_eq!(reg.claim(SubsystemKind::Drive, ActionId(4)), None);
    }

    #[test]
    fn release_all_frees_every_subsystem_of_holder() {
        let mut reg = ClaimRegistry::new();
        reg.claim(SubsystemKind::Flywheel, ActionId(1));
        reg.claim(SubsystemKind::Intake, ActionId(1));
        reg.claim(SubsystemKind::Drive, ActionId(2));
        reg.release_all(ActionId(1));
        assert!(!reg.is_claimed(SubsystemKind::Flywheel));
        assert!(!reg.is_claimed(SubsystemKind::Intake));
        assert!(reg.is_claimed(SubsystemKind::Drive));
    }

    #[test]
    fn holders_of_is_deduplicated() {
        let mut reg = ClaimRegistry::new();
        reg.claim(SubsystemKind::Flywheel, ActionId(1));
        reg.claim(SubsystemKind::Intake, ActionId(1));
        let holders = reg.holders_of(&[
            SubsystemKind::Flywheel,
            SubsystemKind::Intake,
            SubsystemKind::Drive,
        ]);
        assert_eq!(holders, vec![ActionId(1)]);
    }
}
