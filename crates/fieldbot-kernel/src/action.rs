//! [`Action`] – a unit of work with a defined start and stop.
//!
//! Actions never own the subsystems they drive.  The scheduler hands each
//! callback a `&mut C` cycle context that owns the facades, and the action
//! declares up front which [`SubsystemKind`]s it drives exclusively.
//!
//! # Lifecycle
//!
//! | Call | When |
//! |---|---|
//! | [`Action::start`] | once, when scheduled |
//! | [`Action::execute`] | every cycle while scheduled, starting with the scheduling cycle |
//! | [`Action::is_finished`] | after every `execute` |
//! | [`Action::stop`] | exactly once, with the [`StopReason`] |
//!
//! Most actions are built from closures with [`FnAction`].

use std::fmt;

use fieldbot_types::{InputSnapshot, SubsystemKind};

/// Context threaded through every action callback.
pub trait CycleContext {
    /// The operator input sampled for the current cycle.
    fn input(&self) -> &InputSnapshot;
}

/// Why an action was stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StopReason {
    /// `is_finished` returned true.
    Finished,
    /// Its while-held trigger went false.
    Released,
    /// Another action claimed one of its subsystems.
    Preempted,
    /// Its timeout elapsed.
    TimedOut,
    /// Cancelled explicitly.
    Canceled,
    /// The robot was disabled.
    Disabled,
}

impl StopReason {
    pub fn interrupted(&self) -> bool {
        !matches!(self, StopReason::Finished)
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StopReason::Finished => "finished",
            StopReason::Released => "released",
            StopReason::Preempted => "preempted",
            StopReason::TimedOut => "timed out",
            StopReason::Canceled => "canceled",
            StopReason::Disabled => "disabled",
        };
        f.write_str(s)
    }
}

pub trait Action<C> {
    fn name(&self) -> &str;

    /// Subsystems driven exclusively while scheduled.
    fn claims(&self) -> &[SubsystemKind] {
        &[]
    }

    /// Whether the action may be scheduled, and keeps running, while the
    /// robot is disabled.
    fn runs_when_disabled(&self) -> bool {
        false
    }

    /// Seconds after which the scheduler stops the action.
    fn timeout(&self) -> Option<f64> {
        None
    }

    fn start(&mut self, _ctx: &mut C) {}

    fn execute(&mut self, _ctx: &mut C, _dt: f64) {}

    fn is_finished(&self, _ctx: &C) -> bool {
        false
    }

    fn stop(&mut self, _ctx: &mut C, _reason: StopReason) {}
}

/// Builds a fresh action instance every time a trigger fires or a routine
/// is selected.
pub type ActionFactory<C> = Box<dyn Fn() -> Box<dyn Action<C>>>;

// ─────────────────────────────────────────────────────────────────────────────
// FnAction
// ─────────────────────────────────────────────────────────────────────────────

type StartHook<C> = Box<dyn FnMut(&mut C)>;
type ExecuteHook<C> = Box<dyn FnMut(&mut C, f64)>;
type FinishedHook<C> = Box<dyn Fn(&C) -> bool>;
type StopHook<C> = Box<dyn FnMut(&mut C, StopReason)>;

/// Closure-backed [`Action`].
///
/// # Example
///
/// ```
/// use fieldbot_kernel::action::{Action, FnAction};
/// use fieldbot_types::SubsystemKind;
///
/// struct Ctx { rpm: f64 }
///
/// let mut spin = FnAction::start_end(
///     "spin",
///     SubsystemKind::Flywheel,
///     |c: &mut Ctx| c.rpm = 3000.0,
///     |c: &mut Ctx| c.rpm = 0.0,
/// );
/// let mut ctx = Ctx { rpm: 0.0 };
/// spin.start(&mut ctx);
/// assert_eq!(ctx.rpm, 3000.0);
/// ```
pub struct FnAction<C> {
    name: String,
    claims: Vec<SubsystemKind>,
    runs_when_disabled: bool,
    timeout: Option<f64>,
    finish_immediately: bool,
    on_start: Option<StartHook<C>>,
    on_execute: Option<ExecuteHook<C>>,
    until: Option<FinishedHook<C>>,
    on_stop: Option<StopHook<C>>,
}

impl<C> FnAction<C> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            claims: Vec::new(),
            runs_when_disabled: false,
            timeout: None,
            finish_immediately: false,
            on_start: None,
            on_execute: None,
            until: None,
            on_stop: None,
        }
    }

    /// Run `start` when scheduled and `end` when stopped for any reason.
    pub fn start_end(
        name: impl Into<String>,
        claim: SubsystemKind,
        start: impl FnMut(&mut C) + 'static,
        mut end: impl FnMut(&mut C) + 'static,
    ) -> Self {
        Self::new(name)
            .claiming(claim)
            .on_start(start)
            .on_stop(move |ctx, _| end(ctx))
    }

    /// Run `f` once and finish in the same cycle.
    pub fn run_once(
        name: impl Into<String>,
        claim: SubsystemKind,
        f: impl FnMut(&mut C) + 'static,
    ) -> Self {
        let mut action = Self::new(name).claiming(claim).on_start(f);
        action.finish_immediately = true;
        action
    }

    /// Run `f` every cycle until interrupted.
    pub fn run(
        name: impl Into<String>,
        claim: SubsystemKind,
        mut f: impl FnMut(&mut C) + 'static,
    ) -> Self {
        Self::new(name)
            .claiming(claim)
            .on_execute(move |ctx, _| f(ctx))
    }

    pub fn claiming(mut self, kind: SubsystemKind) -> Self {
        if !self.claims.contains(&kind) {
            self.claims.push(kind);
        }
        self
    }

    pub fn ignoring_disable(mut self) -> Self {
        self.runs_when_disabled = true;
        self
    }

    pub fn with_timeout(mut self, seconds: f64) -> Self {
        self.timeout = Some(seconds);
        self
    }

    pub fn on_start(mut self, f: impl FnMut(&mut C) + 'static) -> Self {
        self.on_start = Some(Box::new(f));
        self
    }

    pub fn on_execute(mut self, f: impl FnMut(&mut C, f64) + 'static) -> Self {
        self.on_execute = Some(Box::new(f));
        self
    }

    pub fn until(mut self, f: impl Fn(&C) -> bool + 'static) -> Self {
        self.until = Some(Box::new(f));
        self
    }

    pub fn on_stop(mut self, f: impl FnMut(&mut C, StopReason) + 'static) -> Self {
        self.on_stop = Some(Box::new(f));
        self
    }
}

impl<C> Action<C> for FnAction<C> {
    fn name(&self) -> &str {
        &self.name
    }

    fn claims(&self) -> &[SubsystemKind] {
        &self.claims
    }

    fn runs_when_disabled(&self) -> bool {
        self.runs_when_disabled
    }

    fn timeout(&self) -> Option<f64> {
        self.timeout
    }

    fn start(&mut self, ctx: &mut C) {
        if let Some(f) = self.on_start.as_mut() {
            f(ctx);
        }
    }

    fn execute(&mut self, ctx: &mut C, dt: f64) {
        if let Some(f) = self.on_execute.as_mut() {
            f(ctx, dt);
        }
    }

    fn is_finished(&self, ctx: &C) -> bool {
        self.finish_immediately || self.until.as_ref().is_some_and(|f| f(ctx))
    }

    fn stop(&mut self, ctx: &mut C, reason: StopReason) {
        if let Some(f) = self.on_stop.as_mut() {
            f(ctx, reason);
        }
    }
}
