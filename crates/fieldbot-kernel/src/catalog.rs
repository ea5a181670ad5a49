//! [`RoutineCatalog`] – named, operator-selectable routines.
//!
//! The catalog is the chooser: it holds every registered entry plus the
//! operator's current selection.  Selection starts at [`NONE_ROUTINE`], a
//! built-in entry that produces no action.
//!
//! Names are unique.  A duplicate registration is rejected with
//! [`ConfigError::DuplicateRoutine`] and the original entry is kept.
//!
//! Characterization sweeps are ordinary entries; see
//! [`RoutineCatalog::register_characterization`].

use fieldbot_types::{ConfigError, SweepDirection, SweepKind};
use tracing::{debug, info};

use crate::action::{Action, ActionFactory};

/// Built-in entry that runs nothing.
pub const NONE_ROUTINE: &str = "None";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutineKind {
    Autonomous,
    Characterization,
}

struct RoutineEntry<C> {
    name: String,
    kind: RoutineKind,
    factory: Option<ActionFactory<C>>,
}

/// Entry name for one characterization sweep, e.g.
/// `"Drive SysId (Quasistatic Forward)"`.
pub fn sweep_name(subsystem: &str, kind: SweepKind, direction: SweepDirection) -> String {
    format!("{subsystem} SysId ({kind:?} {direction:?})")
}

pub struct RoutineCatalog<C> {
    title: String,
    entries: Vec<RoutineEntry<C>>,
    selected: String,
}

impl<C> RoutineCatalog<C> {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            entries: vec![RoutineEntry {
                name: NONE_ROUTINE.to_string(),
                kind: RoutineKind::Autonomous,
                factory: None,
            }],
            selected: NONE_ROUTINE.to_string(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// # Errors
    ///
    /// [`ConfigError::DuplicateRoutine`] if `name` is taken.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        factory: impl Fn() -> Box<dyn Action<C>> + 'static,
    ) -> Result<(), ConfigError> {
        self.insert(name.into(), RoutineKind::Autonomous, Box::new(factory))
    }

    /// Register the four sweeps (quasistatic and dynamic, forward and
    /// reverse) for one subsystem.  `sweep` builds the factory for each.
    ///
    /// # Errors
    ///
    /// [`ConfigError::DuplicateRoutine`] if any sweep name is taken; sweeps
    /// registered before the clash are kept.
    pub fn register_characterization(
        &mut self,
        subsystem: &str,
        sweep: impl Fn(SweepKind, SweepDirection) -> ActionFactory<C>,
    ) -> Result<(), ConfigError> {
        for kind in [SweepKind::Quasistatic, SweepKind::Dynamic] {
            for direction in [SweepDirection::Forward, SweepDirection::Reverse] {
                self.insert(
                    sweep_name(subsystem, kind, direction),
                    RoutineKind::Characterization,
                    sweep(kind, direction),
                )?;
            }
        }
        Ok(())
    }

    fn insert(
        &mut self,
        name: String,
        kind: RoutineKind,
        factory: ActionFactory<C>,
    ) -> Result<(), ConfigError> {
        if self.contains(&name) {
            return Err(ConfigError::DuplicateRoutine(name));
        }
        debug!(catalog = %self.title, routine = %name, ?kind, "routine registered");
        self.entries.push(RoutineEntry {
            name,
            kind,
            factory: Some(factory),
        });
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.name == name)
    }

    pub fn kind(&self, name: &str) -> Option<RoutineKind> {
        self.entries.iter().find(|e| e.name == name).map(|e| e.kind)
    }

    /// Entry names in registration order, [`NONE_ROUTINE`] first.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// # Errors
    ///
    /// [`ConfigError::UnknownRoutine`] if no entry is called `name`; the
    /// selection is left unchanged.
    pub fn select(&mut self, name: &str) -> Result<(), ConfigError> {
        if !self.contains(name) {
            return Err(ConfigError::UnknownRoutine(name.to_string()));
        }
        info!(catalog = %self.title, routine = name, "routine selected");
        self.selected = name.to_string();
        Ok(())
    }

    pub fn selected_name(&self) -> &str {
        &self.selected
    }

    /// A fresh instance of the selected routine, or `None` for
    /// [`NONE_ROUTINE`].
    pub fn get_selected(&self) -> Option<Box<dyn Action<C>>> {
        self.entries
            .iter()
            .find(|e| e.name == self.selected)
            .and_then(|e| e.factory.as_ref())
            .map(|f| f())
    }
}
