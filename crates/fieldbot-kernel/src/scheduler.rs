//! [`Scheduler`] – the single-threaded control-cycle executor.
//!
//! Each call to [`Scheduler::run`] performs, in order:
//!
//! 1. **Poll** every binding.  Falling edges are handled first: the action
//!    of a released while-held binding stops within the same cycle.  Then,
//!    in registration order, a rising edge schedules a fresh action unless a
//!    later-registered while-held binding with an overlapping claim is also
//!    held.  A while-held binding that lost its subsystem that way, or by
//!    preemption, waits and is rescheduled once its subsystem is free of
//!    anything that outranks it.
//! 2. **Defaults** – schedule the default action of every unclaimed
//!    subsystem.
//! 3. **Execute** every active action once, then stop the ones that
//!    finished or ran past their timeout.
//!
//! Scheduling an action stops every current holder of any subsystem it
//! claims (`StopReason::Preempted`).  Every action that is started is
//! stopped exactly once.
//!
//! While disabled, only actions that declare `runs_when_disabled` are
//! scheduled; disabling stops everything else.

use fieldbot_types::SubsystemKind;
use tracing::{debug, info};

use crate::action::{Action, CycleContext, StopReason};
use crate::binding::BindingTable;
use crate::claims::{ActionId, ClaimRegistry};
use crate::trigger::{Activation, Edge};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Binding(usize),
    Default(SubsystemKind),
    Direct,
}

struct Scheduled<C> {
    id: ActionId,
    origin: Origin,
    elapsed: f64,
    action: Box<dyn Action<C>>,
}

pub struct Scheduler<C> {
    table: BindingTable<C>,
    previous: Vec<bool>,
    /// While-held bindings that are held but outranked.
    waiting: Vec<bool>,
    active: Vec<Scheduled<C>>,
    claims: ClaimRegistry,
    enabled: bool,
    next_id: u64,
}

impl<C: CycleContext> Scheduler<C> {
    /// Create a disabled scheduler over `table`.
    pub fn new(table: BindingTable<C>) -> Self {
        let previous = vec![false; table.len()];
        let waiting = vec![false; table.len()];
        Self {
            table,
            previous,
            waiting,
            active: Vec::new(),
            claims: ClaimRegistry::new(),
            enabled: false,
            next_id: 0,
        }
    }

    pub fn table(&self) -> &BindingTable<C> {
        &self.table
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Enable or disable.  Disabling stops every action that does not run
    /// when disabled.
    pub fn set_enabled(&mut self, ctx: &mut C, enabled: bool) {
        if self.enabled == enabled {
            return;
        }
        self.enabled = enabled;
        info!(enabled, "scheduler state changed");
        if !enabled {
            self.waiting.fill(false);
            let doomed: Vec<ActionId> = self
                .active
                .iter()
                .filter(|s| !s.action.runs_when_disabled())
                .map(|s| s.id)
                .collect();
            for id in doomed {
                self.stop(ctx, id, StopReason::Disabled);
            }
        }
    }

    /// Schedule an action outside the binding table, e.g. an autonomous
    /// routine.  Returns `None` when the robot is disabled and the action
    /// does not run when disabled.
    pub fn schedule(&mut self, ctx: &mut C, action: Box<dyn Action<C>>) -> Option<ActionId> {
        self.schedule_from(ctx, action, Origin::Direct)
    }

    /// Stop a scheduled action.  Returns `false` if it is no longer active.
    pub fn cancel(&mut self, ctx: &mut C, id: ActionId) -> bool {
        self.stop(ctx, id, StopReason::Canceled)
    }

    pub fn cancel_all(&mut self, ctx: &mut C) {
        let ids: Vec<ActionId> = self.active.iter().map(|s| s.id).collect();
        for id in ids {
            self.stop(ctx, id, StopReason::Canceled);
        }
    }

    pub fn is_scheduled(&self, id: ActionId) -> bool {
        self.active.iter().any(|s| s.id == id)
    }

    /// Name of the action currently holding `kind`.
    pub fn holder_name(&self, kind: SubsystemKind) -> Option<&str> {
        let id = self.claims.holder(kind)?;
        self.active
            .iter()
            .find(|s| s.id == id)
            .map(|s| s.action.name())
    }

    /// Names of all active actions in scheduling order.
    pub fn active_names(&self) -> Vec<&str> {
        self.active.iter().map(|s| s.action.name()).collect()
    }

    /// Run one control cycle of `dt` seconds.
    pub fn run(&mut self, ctx: &mut C, dt: f64) {
        self.poll_bindings(ctx);
        self.schedule_defaults(ctx);

        let mut done = Vec::new();
        for entry in &mut self.active {
            entry.action.execute(ctx, dt);
            entry.elapsed += dt;
            if entry.action.is_finished(ctx) {
                done.push((entry.id, StopReason::Finished));
            } else if entry.action.timeout().is_some_and(|t| entry.elapsed >= t) {
                done.push((entry.id, StopReason::TimedOut));
            }
        }
        for (id, reason) in done {
            self.stop(ctx, id, reason);
        }
    }

    fn poll_bindings(&mut self, ctx: &mut C) {
        let states: Vec<bool> = self
            .table
            .bindings()
            .iter()
            .map(|b| b.trigger().is_active(ctx.input()))
            .collect();

        for (index, &current) in states.iter().enumerate() {
            if Edge::between(self.previous[index], current) != Edge::Falling {
                continue;
            }
            self.waiting[index] = false;
            if self.table.bindings()[index].activation() == Activation::WhileHeld
                && let Some(id) = self.find(Origin::Binding(index))
            {
                self.stop(ctx, id, StopReason::Released);
            }
        }

        for (index, &current) in states.iter().enumerate() {
            let rising = Edge::between(self.previous[index], current) == Edge::Rising;
            let resuming = !rising && current && self.waiting[index];
            if !rising && !resuming {
                continue;
            }
            if let Some(winner) = self.outranked_by(index, &states) {
                let binding = &self.table.bindings()[index];
                debug!(
                    binding = binding.name(),
                    by = self.table.bindings()[winner].name(),
                    "binding outranked by a later registration"
                );
                self.waiting[index] =
                    self.enabled && binding.activation() == Activation::WhileHeld;
                continue;
            }
            if resuming {
                if !self.enabled || !self.claims_yield_to(index) {
                    continue;
                }
                info!(binding = self.table.bindings()[index].name(), "binding resumed");
            } else if let Some(id) = self.find(Origin::Binding(index)) {
                self.stop(ctx, id, StopReason::Preempted);
            }
            let action = self.table.bindings()[index].instantiate();
            self.schedule_from(ctx, action, Origin::Binding(index));
        }
        self.previous = states;
    }

    /// A later-registered while-held binding that is held, can run, and
    /// shares a claim with binding `index`.
    fn outranked_by(&self, index: usize, states: &[bool]) -> Option<usize> {
        let bindings = self.table.bindings();
        let claims = bindings[index].claims();
        (index + 1..bindings.len()).find(|&later| {
            let binding = &bindings[later];
            states[later]
                && binding.activation() == Activation::WhileHeld
                && (self.enabled || self.find(Origin::Binding(later)).is_some())
                && binding.claims().iter().any(|k| claims.contains(k))
        })
    }

    /// Every subsystem binding `index` claims is free, or held by a default
    /// or an earlier-registered binding.
    fn claims_yield_to(&self, index: usize) -> bool {
        self.table.bindings()[index].claims().iter().all(|kind| {
            let Some(holder) = self.claims.holder(*kind) else {
                return true;
            };
            match self.active.iter().find(|s| s.id == holder).map(|s| s.origin) {
                Some(Origin::Default(_)) | None => true,
                Some(Origin::Binding(other)) => other < index,
                Some(Origin::Direct) => false,
            }
        })
    }

    fn schedule_defaults(&mut self, ctx: &mut C) {
        for index in 0..self.table.defaults().len() {
            let default = &self.table.defaults()[index];
            let kind = default.subsystem();
            if self.claims.is_claimed(kind) || self.find(Origin::Default(kind)).is_some() {
                continue;
            }
            let action = default.instantiate();
            if !self.enabled && !action.runs_when_disabled() {
                continue;
            }
            self.schedule_from(ctx, action, Origin::Default(kind));
        }
    }

    fn schedule_from(
        &mut self,
        ctx: &mut C,
        mut action: Box<dyn Action<C>>,
        origin: Origin,
    ) -> Option<ActionId> {
        if !self.enabled && !action.runs_when_disabled() {
            debug!(action = action.name(), "not scheduled while disabled");
            return None;
        }

        for holder in self.claims.holders_of(action.claims()) {
            if let Some(entry) = self.active.iter().find(|s| s.id == holder) {
                info!(
                    preempted = entry.action.name(),
                    by = action.name(),
                    "action preempted; the later claim wins"
                );
            }
            self.stop(ctx, holder, StopReason::Preempted);
        }

        let id = ActionId(self.next_id);
        self.next_id += 1;
        for kind in action.claims() {
            self.claims.claim(*kind, id);
        }
        debug!(action = action.name(), %id, "action scheduled");
        if let Origin::Binding(index) = origin {
            self.waiting[index] = false;
        }
        action.start(ctx);
        self.active.push(Scheduled {
            id,
            origin,
            elapsed: 0.0,
            action,
        });
        Some(id)
    }

    fn find(&self, origin: Origin) -> Option<ActionId> {
        self.active.iter().find(|s| s.origin == origin).map(|s| s.id)
    }

    fn stop(&mut self, ctx: &mut C, id: ActionId, reason: StopReason) -> bool {
        let Some(pos) = self.active.iter().position(|s| s.id == id) else {
            return false;
        };
        let mut entry = self.active.remove(pos);
        self.claims.release_all(id);
        if reason == StopReason::Preempted
            && let Origin::Binding(index) = entry.origin
            && self.table.bindings()[index].activation() == Activation::WhileHeld
        {
            self.waiting[index] = true;
        }
        debug!(action = entry.action.name(), %id, %reason, "action stopped");
        entry.action.stop(ctx, reason);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::FnAction;
    use crate::trigger::Trigger;
    use fieldbot_types::InputSnapshot;

    #[derive(Default)]
    struct Ctx {
        input: InputSnapshot,
        log: Vec<String>,
    }

    impl CycleContext for Ctx {
        fn input(&self) -> &InputSnapshot {
            &self.input
        }
    }

    impl Ctx {
        fn press(&mut self, buttons: &[usize]) {
            self.input.buttons = vec![false; 12];
            for b in buttons {
                self.input.buttons[b - 1] = true;
            }
        }

        fn count(&self, entry: &str) -> usize {
            self.log.iter().filter(|e| *e == entry).count()
        }
    }

    fn logging(name: &'static str, kind: SubsystemKind) -> impl Fn() -> Box<dyn Action<Ctx>> {
        move || {
            Box::new(
                FnAction::new(name)
                    .claiming(kind)
                    .on_start(move |c: &mut Ctx| c.log.push(format!("{name} start")))
                    .on_execute(move |c: &mut Ctx, _| c.log.push(format!("{name} exec")))
                    .on_stop(move |c: &mut Ctx, r| c.log.push(format!("{name} stop {r}"))),
            ) as Box<dyn Action<Ctx>>
        }
    }

    fn enabled(table: BindingTable<Ctx>, ctx: &mut Ctx) -> Scheduler<Ctx> {
        let mut scheduler = Scheduler::new(table);
        scheduler.set_enabled(ctx, true);
        scheduler
    }

    #[test]
    fn while_held_starts_and_stops_in_the_same_cycle_as_the_edge() {
        let table = BindingTable::builder()
            .while_held("spin", Trigger::Button(1), logging("spin", SubsystemKind::Flywheel))
            .build();
        let mut ctx = Ctx::default();
        let mut scheduler = enabled(table, &mut ctx);

        ctx.press(&[1]);
        scheduler.run(&mut ctx, 0.02);
        assert_eq!(ctx.log, vec!["spin start", "spin exec"]);
        scheduler.run(&mut ctx, 0.02);
        ctx.press(&[]);
        scheduler.run(&mut ctx, 0.02);
        assert_eq!(ctx.count("spin stop released"), 1);
        assert!(scheduler.holder_name(SubsystemKind::Flywheel).is_none());
        scheduler.run(&mut ctx, 0.02);
        assert_eq!(ctx.count("spin exec"), 2);
    }

    fn flywheel_pair() -> BindingTable<Ctx> {
        BindingTable::builder()
            .while_held("tunable", Trigger::Button(1), logging("tunable", SubsystemKind::Flywheel))
            .while_held("fixed", Trigger::Button(6), logging("fixed", SubsystemKind::Flywheel))
            .build()
    }

    #[test]
    fn later_binding_wins_when_both_rise_together() {
        let table = flywheel_pair();
        assert_eq!(table.overlapping_claims().len(), 1);
        let mut ctx = Ctx::default();
        let mut scheduler = enabled(table, &mut ctx);

        ctx.press(&[1, 6]);
        for _ in 0..3 {
            scheduler.run(&mut ctx, 0.02);
        }
        assert_eq!(scheduler.holder_name(SubsystemKind::Flywheel), Some("fixed"));
        assert_eq!(ctx.count("tunable start"), 0);
        assert_eq!(ctx.count("fixed exec"), 3);

        ctx.press(&[]);
        scheduler.run(&mut ctx, 0.02);
        assert_eq!(ctx.count("fixed stop released"), 1);
        assert_eq!(ctx.count("tunable start"), 0);
        assert!(scheduler.active_names().is_empty());
    }

    #[test]
    fn earlier_binding_pressed_second_does_not_take_over() {
        let mut ctx = Ctx::default();
        let mut scheduler = enabled(flywheel_pair(), &mut ctx);

        ctx.press(&[6]);
        for _ in 0..3 {
            scheduler.run(&mut ctx, 0.02);
        }
        ctx.press(&[1, 6]);
        for _ in 0..3 {
            scheduler.run(&mut ctx, 0.02);
        }
        assert_eq!(scheduler.holder_name(SubsystemKind::Flywheel), Some("fixed"));
        assert_eq!(ctx.count("tunable start"), 0);
        assert_eq!(ctx.count("fixed start"), 1);
        assert_eq!(ctx.count("fixed exec"), 6);

        // Letting go of the earlier button leaves the later binding alone.
        ctx.press(&[6]);
        scheduler.run(&mut ctx, 0.02);
        assert_eq!(scheduler.holder_name(SubsystemKind::Flywheel), Some("fixed"));
        assert_eq!(ctx.count("tunable start"), 0);

        ctx.press(&[]);
        scheduler.run(&mut ctx, 0.02);
        assert_eq!(ctx.count("fixed stop released"), 1);
        assert!(ctx.log.iter().all(|e| !e.starts_with("tunable")));
    }

    #[test]
    fn earlier_binding_resumes_when_later_is_released() {
        let mut ctx = Ctx::default();
        let mut scheduler = enabled(flywheel_pair(), &mut ctx);

        ctx.press(&[1, 6]);
        scheduler.run(&mut ctx, 0.02);
        ctx.press(&[1]);
        scheduler.run(&mut ctx, 0.02);
        assert_eq!(scheduler.holder_name(SubsystemKind::Flywheel), Some("tunable"));
        assert_eq!(ctx.count("fixed stop released"), 1);
        assert_eq!(ctx.count("tunable start"), 1);
        assert_eq!(ctx.count("tunable exec"), 1);

        scheduler.run(&mut ctx, 0.02);
        assert_eq!(ctx.count("tunable start"), 1);

        ctx.press(&[]);
        scheduler.run(&mut ctx, 0.02);
        assert_eq!(ctx.count("tunable stop released"), 1);
        assert_eq!(ctx.count("fixed stop released"), 1);
        assert!(scheduler.active_names().is_empty());
    }

    #[test]
    fn preempted_earlier_binding_resumes_after_later_release() {
        let mut ctx = Ctx::default();
        let mut scheduler = enabled(flywheel_pair(), &mut ctx);

        ctx.press(&[1]);
        scheduler.run(&mut ctx, 0.02);
        ctx.press(&[1, 6]);
        scheduler.run(&mut ctx, 0.02);
        scheduler.run(&mut ctx, 0.02);
        assert_eq!(scheduler.holder_name(SubsystemKind::Flywheel), Some("fixed"));
        assert_eq!(ctx.count("tunable stop preempted"), 1);

        ctx.press(&[1]);
        scheduler.run(&mut ctx, 0.02);
        assert_eq!(scheduler.holder_name(SubsystemKind::Flywheel), Some("tunable"));
        assert_eq!(ctx.count("tunable start"), 2);

        ctx.press(&[]);
        scheduler.run(&mut ctx, 0.02);
        // One stop per start.
        assert_eq!(ctx.count("tunable stop preempted"), 1);
        assert_eq!(ctx.count("tunable stop released"), 1);
        assert_eq!(ctx.count("fixed stop released"), 1);
    }

    #[test]
    fn held_binding_that_finished_is_not_restarted() {
        let table = BindingTable::builder()
            .while_held("collect", Trigger::Button(5), || {
                Box::new(
                    FnAction::new("collect")
                        .claiming(SubsystemKind::Intake)
                        .on_start(|c: &mut Ctx| c.log.push("collect start".into()))
                        .until(|c: &Ctx| !c.log.is_empty()),
                ) as Box<dyn Action<Ctx>>
            })
            .build();
        let mut ctx = Ctx::default();
        let mut scheduler = enabled(table, &mut ctx);
        ctx.press(&[5]);
        for _ in 0..4 {
            scheduler.run(&mut ctx, 0.02);
        }
        assert_eq!(ctx.count("collect start"), 1);
        assert!(scheduler.active_names().is_empty());
    }

    #[test]
    fn waiting_binding_yields_to_a_direct_action() {
        let mut ctx = Ctx::default();
        let mut scheduler = enabled(flywheel_pair(), &mut ctx);
        ctx.press(&[1]);
        scheduler.run(&mut ctx, 0.02);

        let id = scheduler
            .schedule(&mut ctx, Box::new(FnAction::new("auto").claiming(SubsystemKind::Flywheel)))
            .unwrap();
        scheduler.run(&mut ctx, 0.02);
        assert_eq!(scheduler.holder_name(SubsystemKind::Flywheel), Some("auto"));

        scheduler.cancel(&mut ctx, id);
        scheduler.run(&mut ctx, 0.02);
        assert_eq!(scheduler.holder_name(SubsystemKind::Flywheel), Some("tunable"));
        assert_eq!(ctx.count("tunable start"), 2);
        assert_eq!(ctx.count("tunable stop preempted"), 1);
    }

    #[test]
    fn distinct_claims_run_side_by_side() {
        let table = BindingTable::builder()
            .while_held("collect", Trigger::Button(7), logging("collect", SubsystemKind::Intake))
            .while_held("spin", Trigger::Button(8), logging("spin", SubsystemKind::Flywheel))
            .build();
        let mut ctx = Ctx::default();
        let mut scheduler = enabled(table, &mut ctx);
        ctx.press(&[7, 8]);
        scheduler.run(&mut ctx, 0.02);
        assert_eq!(scheduler.active_names(), vec!["collect", "spin"]);
    }

    #[test]
    fn default_resumes_after_holder_ends() {
        let table = BindingTable::builder()
            .on_true("reset", Trigger::Button(2), || {
                Box::new(
                    FnAction::run_once("reset", SubsystemKind::Drive, |c: &mut Ctx| {
                        c.log.push("reset".into())
                    }),
                ) as Box<dyn Action<Ctx>>
            })
            .default_action(SubsystemKind::Drive, logging("joystick", SubsystemKind::Drive))
            .build();
        let mut ctx = Ctx::default();
        let mut scheduler = enabled(table, &mut ctx);

        scheduler.run(&mut ctx, 0.02);
        assert_eq!(scheduler.holder_name(SubsystemKind::Drive), Some("joystick"));

        ctx.press(&[2]);
        scheduler.run(&mut ctx, 0.02);
        assert_eq!(ctx.count("joystick stop preempted"), 1);
        assert_eq!(ctx.count("reset"), 1);
        assert!(scheduler.holder_name(SubsystemKind::Drive).is_none());

        scheduler.run(&mut ctx, 0.02);
        assert_eq!(scheduler.holder_name(SubsystemKind::Drive), Some("joystick"));
    }

    #[test]
    fn disabled_only_runs_actions_that_ignore_disable() {
        let table = BindingTable::builder()
            .on_true("reset", Trigger::Button(2), || {
                Box::new(
                    FnAction::run_once("reset", SubsystemKind::Drive, |c: &mut Ctx| {
                        c.log.push("reset".into())
                    })
                    .ignoring_disable(),
                ) as Box<dyn Action<Ctx>>
            })
            .while_held("spin", Trigger::Button(1), logging("spin", SubsystemKind::Flywheel))
            .default_action(SubsystemKind::Drive, logging("joystick", SubsystemKind::Drive))
            .build();
        let mut ctx = Ctx::default();
        let mut scheduler = Scheduler::new(table);

        ctx.press(&[1, 2]);
        scheduler.run(&mut ctx, 0.02);
        assert_eq!(ctx.log, vec!["reset"]);
        assert!(scheduler.active_names().is_empty());
    }

    #[test]
    fn disabling_stops_running_actions() {
        let table = BindingTable::builder()
            .while_held("spin", Trigger::Button(1), logging("spin", SubsystemKind::Flywheel))
            .build();
        let mut ctx = Ctx::default();
        let mut scheduler = enabled(table, &mut ctx);
        ctx.press(&[1]);
        scheduler.run(&mut ctx, 0.02);
        scheduler.set_enabled(&mut ctx, false);
        assert_eq!(ctx.count("spin stop disabled"), 1);
        ctx.press(&[]);
        scheduler.run(&mut ctx, 0.02);
        assert_eq!(ctx.count("spin stop disabled") + ctx.count("spin stop released"), 1);
    }

    #[test]
    fn timeout_stops_direct_action() {
        let table = BindingTable::builder().build();
        let mut ctx = Ctx::default();
        let mut scheduler = enabled(table, &mut ctx);
        let action = Box::new(
            FnAction::new("auto")
                .claiming(SubsystemKind::Flywheel)
                .with_timeout(0.05)
                .on_stop(|c: &mut Ctx, r| c.log.push(format!("auto stop {r}"))),
        );
        let id = scheduler.schedule(&mut ctx, action).unwrap();
        for _ in 0..4 {
            scheduler.run(&mut ctx, 0.02);
        }
        assert!(!scheduler.is_scheduled(id));
        assert_eq!(ctx.log, vec!["auto stop timed out"]);
    }

    #[test]
    fn on_true_retrigger_restarts_action() {
        let table = BindingTable::builder()
            .on_true("spin", Trigger::Button(3), logging("spin", SubsystemKind::Flywheel))
            .build();
        let mut ctx = Ctx::default();
        let mut scheduler = enabled(table, &mut ctx);
        ctx.press(&[3]);
        scheduler.run(&mut ctx, 0.02);
        ctx.press(&[]);
        scheduler.run(&mut ctx, 0.02);
        assert_eq!(scheduler.active_names(), vec!["spin"]);
        ctx.press(&[3]);
        scheduler.run(&mut ctx, 0.02);
        assert_eq!(ctx.count("spin stop preempted"), 1);
        assert_eq!(ctx.count("spin start"), 2);
        assert_eq!(scheduler.active_names(), vec!["spin"]);
    }

    #[test]
    fn cancel_all_stops_everything_once() {
        let table = BindingTable::builder()
            .default_action(SubsystemKind::Drive, logging("joystick", SubsystemKind::Drive))
            .build();
        let mut ctx = Ctx::default();
        let mut scheduler = enabled(table, &mut ctx);
        scheduler.run(&mut ctx, 0.02);
        scheduler.cancel_all(&mut ctx);
        assert_eq!(ctx.count("joystick stop canceled"), 1);
        assert!(scheduler.active_names().is_empty());
    }
}
