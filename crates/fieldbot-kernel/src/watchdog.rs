//! [`Watchdog`] – control-cycle overrun monitor.
//!
//! The control loop calls [`Watchdog::begin_cycle`] at the top of each cycle,
//! [`Watchdog::mark`] after each phase, and [`Watchdog::end_cycle`] at the
//! bottom.  A cycle that takes longer than the configured period is an
//! overrun; overruns are logged with the slowest phase, at most once per
//! warning interval, with a count of the overruns suppressed in between.
//!
//! Instants are passed in rather than read from the clock so the caller
//! decides what "now" means.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::warn;

// ────────────────────────────────────────────────────────────────────────────
// Public types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleHealth {
    OnTime,
    Overrun {
        elapsed: Duration,
        /// Phase that took longest, if any were marked.
        slowest_phase: Option<&'static str>,
    },
}

// ────────────────────────────────────────────────────────────────────────────
// Watchdog
// ────────────────────────────────────────────────────────────────────────────

/// # Example
///
/// ```
/// use std::time::{Duration, Instant};
/// use fieldbot_kernel::watchdog::{CycleHealth, Watchdog};
///
/// let mut wd = Watchdog::new(Duration::from_millis(20));
/// let t0 = Instant::now();
/// wd.begin_cycle(t0);
/// wd.mark("scheduler", t0 + Duration::from_millis(5));
/// assert_eq!(wd.end_cycle(t0 + Duration::from_millis(6)), CycleHealth::OnTime);
/// ```
pub struct Watchdog {
    period: Duration,
    warn_interval: Duration,
    cycle_start: Option<Instant>,
    last_mark: Option<Instant>,
    phases: HashMap<&'static str, Duration>,
    last_warning: Option<Instant>,
    suppressed: u64,
    overruns: u64,
}

impl Watchdog {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            warn_interval: Duration::from_secs(1),
            cycle_start: None,
            last_mark: None,
            phases: HashMap::new(),
            last_warning: None,
            suppressed: 0,
            overruns: 0,
        }
    }

    /// Minimum spacing between overrun warnings.
    pub fn with_warn_interval(mut self, interval: Duration) -> Self {
        self.warn_interval = interval;
        self
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Total overruns seen, logged or not.
    pub fn overrun_count(&self) -> u64 {
        self.overruns
    }

    pub fn begin_cycle(&mut self, now: Instant) {
        self.cycle_start = Some(now);
        self.last_mark = Some(now);
        self.phases.clear();
    }

    /// Attribute the time since the previous mark (or the cycle start) to
    /// `phase`.  No-ops outside a cycle.
    pub fn mark(&mut self, phase: &'static str, now: Instant) {
        let Some(last) = self.last_mark else {
            return;
        };
        *self.phases.entry(phase).or_default() += now.saturating_duration_since(last);
        self.last_mark = Some(now);
    }

    /// Close the cycle and report its health.  Calling this without a
    /// matching `begin_cycle` reports [`CycleHealth::OnTime`].
    pub fn end_cycle(&mut self, now: Instant) -> CycleHealth {
        let Some(start) = self.cycle_start.take() else {
            return CycleHealth::OnTime;
        };
        self.last_mark = None;
        let elapsed = now.saturating_duration_since(start);
        if elapsed <= self.period {
            return CycleHealth::OnTime;
        }

        self.overruns += 1;
        let slowest_phase = self
            .phases
            .iter()
            .max_by_key(|(_, d)| **d)
            .map(|(name, _)| *name);

        let due = self
            .last_warning
            .is_none_or(|at| now.saturating_duration_since(at) >= self.warn_interval);
        if due {
            warn!(
                elapsed_ms = elapsed.as_secs_f64() * 1e3,
                period_ms = self.period.as_secs_f64() * 1e3,
                slowest_phase = slowest_phase.unwrap_or("-"),
                suppressed = self.suppressed,
                "control cycle overrun"
            );
            self.last_warning = Some(now);
            self.suppressed = 0;
        } else {
            self.suppressed += 1;
        }

        CycleHealth::Overrun {
            elapsed,
            slowest_phase,
        }
    }
}
