//! [`Sequence`] – runs child actions one after another.
//!
//! | Event | Effect |
//! |---|---|
//! | child finishes or its timeout elapses | child stopped, next child started |
//! | last child finishes | sequence finishes |
//! | sequence interrupted | the running child is stopped with the same reason |
//!
//! The sequence claims the union of its children's subsystems for its whole
//! run.

use fieldbot_types::SubsystemKind;

use crate::action::{Action, StopReason};

pub struct Sequence<C> {
    name: String,
    steps: Vec<Box<dyn Action<C>>>,
    claims: Vec<SubsystemKind>,
    timeout: Option<f64>,
    current: usize,
    step_elapsed: f64,
}

impl<C> Sequence<C> {
    pub fn new(name: impl Into<String>, steps: Vec<Box<dyn Action<C>>>) -> Self {
        let mut claims = Vec::new();
        for kind in steps.iter().flat_map(|s| s.claims().iter().copied()) {
            if !claims.contains(&kind) {
                claims.push(kind);
            }
        }
        Self {
            name: name.into(),
            steps,
            claims,
            timeout: None,
            current: 0,
            step_elapsed: 0.0,
        }
    }

    pub fn with_timeout(mut self, seconds: f64) -> Self {
        self.timeout = Some(seconds);
        self
    }

    /// Name of the running step, if any.
    pub fn current_step(&self) -> Option<&str> {
        self.steps.get(self.current).map(|s| s.name())
    }
}

impl<C> Action<C> for Sequence<C> {
    fn name(&self) -> &str {
        &self.name
    }

    fn claims(&self) -> &[SubsystemKind] {
        &self.claims
    }

    fn timeout(&self) -> Option<f64> {
        self.timeout
    }

    fn start(&mut self, ctx: &mut C) {
        self.current = 0;
        self.step_elapsed = 0.0;
        if let Some(first) = self.steps.first_mut() {
            first.start(ctx);
        }
    }

    fn execute(&mut self, ctx: &mut C, dt: f64) {
        let Some(step) = self.steps.get_mut(self.current) else {
            return;
        };
        step.execute(ctx, dt);
        self.step_elapsed += dt;

        let finished = step.is_finished(ctx);
        let timed_out = step.timeout().is_some_and(|t| self.step_elapsed >= t);
        if !(finished || timed_out) {
            return;
        }
        let reason = if finished {
            StopReason::Finished
        } else {
            StopReason::TimedOut
        };
        step.stop(ctx, reason);

        self.current += 1;
        self.step_elapsed = 0.0;
        if let Some(next) = self.steps.get_mut(self.current) {
            next.start(ctx);
        }
    }

    fn is_finished(&self, _ctx: &C) -> bool {
        self.current >= self.steps.len()
    }

    fn stop(&mut self, ctx: &mut C, reason: StopReason) {
        if let Some(step) = self.steps.get_mut(self.current) {
            step.stop(ctx, reason);
        }
    }
}
