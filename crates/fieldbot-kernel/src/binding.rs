//! [`BindingTable`] – the ordered list of trigger → action records.
//!
//! Registration order is evaluation order and precedence order: while two
//! bindings that claim the same subsystem are both active, the one
//! registered later holds it, whichever was pressed first.  The
//! builder reports every such overlap with a `warn!` so the arbitration is
//! never silent, and [`BindingTable::overlapping_claims`] exposes the list.
//!
//! # Example
//!
//! ```
//! use fieldbot_kernel::action::{Action, FnAction};
//! use fieldbot_kernel::binding::BindingTable;
//! use fieldbot_kernel::trigger::Trigger;
//! use fieldbot_types::SubsystemKind;
//!
//! struct Ctx;
//!
//! let table = BindingTable::<Ctx>::builder()
//!     .while_held("spin slow", Trigger::Button(1), || -> Box<dyn Action<Ctx>> {
//!         Box::new(FnAction::new("slow").claiming(SubsystemKind::Flywheel))
//!     })
//!     .while_held("spin fast", Trigger::Button(6), || -> Box<dyn Action<Ctx>> {
//!         Box::new(FnAction::new("fast").claiming(SubsystemKind::Flywheel))
//!     })
//!     .build();
//!
//! assert_eq!(table.len(), 2);
//! assert_eq!(table.overlapping_claims().len(), 1);
//! ```

use fieldbot_types::SubsystemKind;
use tracing::{debug, warn};

use crate::action::{Action, ActionFactory};
use crate::trigger::{Activation, Trigger};

pub struct Binding<C> {
    name: String,
    trigger: Trigger,
    activation: Activation,
    claims: Vec<SubsystemKind>,
    factory: ActionFactory<C>,
}

impl<C> Binding<C> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn trigger(&self) -> &Trigger {
        &self.trigger
    }

    pub fn activation(&self) -> Activation {
        self.activation
    }

    pub fn claims(&self) -> &[SubsystemKind] {
        &self.claims
    }

    pub fn instantiate(&self) -> Box<dyn Action<C>> {
        (self.factory)()
    }
}

/// Two bindings that can hold the same subsystem.  `later` wins whenever
/// both are active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimOverlap {
    pub earlier: String,
    pub later: String,
    pub subsystem: SubsystemKind,
}

pub struct DefaultAction<C> {
    subsystem: SubsystemKind,
    factory: ActionFactory<C>,
}

impl<C> DefaultAction<C> {
    pub fn subsystem(&self) -> SubsystemKind {
        self.subsystem
    }

    pub fn instantiate(&self) -> Box<dyn Action<C>> {
        (self.factory)()
    }
}

pub struct BindingTable<C> {
    bindings: Vec<Binding<C>>,
    defaults: Vec<DefaultAction<C>>,
    overlaps: Vec<ClaimOverlap>,
}

impl<C> BindingTable<C> {
    pub fn builder() -> BindingTableBuilder<C> {
        BindingTableBuilder {
            bindings: Vec::new(),
            defaults: Vec::new(),
        }
    }

    pub fn bindings(&self) -> &[Binding<C>] {
        &self.bindings
    }

    pub fn defaults(&self) -> &[DefaultAction<C>] {
        &self.defaults
    }

    pub fn default_for(&self, kind: SubsystemKind) -> Option<&DefaultAction<C>> {
        self.defaults.iter().find(|d| d.subsystem == kind)
    }

    pub fn overlapping_claims(&self) -> &[ClaimOverlap] {
        &self.overlaps
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

pub struct BindingTableBuilder<C> {
    bindings: Vec<Binding<C>>,
    defaults: Vec<DefaultAction<C>>,
}

impl<C> BindingTableBuilder<C> {
    /// Append a binding.  The factory is invoked once here to learn the
    /// claims of the actions it produces.
    pub fn bind(
        mut self,
        name: impl Into<String>,
        trigger: Trigger,
        activation: Activation,
        factory: impl Fn() -> Box<dyn Action<C>> + 'static,
    ) -> Self {
        let name = name.into();
        let claims = factory().claims().to_vec();
        debug!(binding = %name, %trigger, ?activation, ?claims, "binding registered");
        self.bindings.push(Binding {
            name,
            trigger,
            activation,
            claims,
            factory: Box::new(factory),
        });
        self
    }

    pub fn while_held(
        self,
        name: impl Into<String>,
        trigger: Trigger,
        factory: impl Fn() -> Box<dyn Action<C>> + 'static,
    ) -> Self {
        self.bind(name, trigger, Activation::WhileHeld, factory)
    }

    pub fn on_true(
        self,
        name: impl Into<String>,
        trigger: Trigger,
        factory: impl Fn() -> Box<dyn Action<C>> + 'static,
    ) -> Self {
        self.bind(name, trigger, Activation::OnTrue, factory)
    }

    /// Action scheduled whenever `subsystem` is enabled and unclaimed.
    /// Registering a second default for the same subsystem replaces the
    /// first.
    pub fn default_action(
        mut self,
        subsystem: SubsystemKind,
        factory: impl Fn() -> Box<dyn Action<C>> + 'static,
    ) -> Self {
        let sample = factory();
        if !sample.claims().contains(&subsystem) {
            warn!(
                action = sample.name(),
                %subsystem,
                "default action does not claim its subsystem; it will be rescheduled every cycle"
            );
        }
        self.defaults.retain(|d| d.subsystem != subsystem);
        self.defaults.push(DefaultAction {
            subsystem,
            factory: Box::new(factory),
        });
        self
    }

    pub fn build(self) -> BindingTable<C> {
        let mut overlaps = Vec::new();
        for (i, later) in self.bindings.iter().enumerate() {
            for earlier in &self.bindings[..i] {
                for kind in later.claims.iter().filter(|k| earlier.claims.contains(*k)) {
                    warn!(
                        earlier = %earlier.name,
                        later = %later.name,
                        subsystem = %kind,
                        "bindings claim the same subsystem; the later registration wins when both are active"
                    );
                    overlaps.push(ClaimOverlap {
                        earlier: earlier.name.clone(),
                        later: later.name.clone(),
                        subsystem: *kind,
                    });
                }
            }
        }
        BindingTable {
            bindings: self.bindings,
            defaults: self.defaults,
            overlaps,
        }
    }
}
