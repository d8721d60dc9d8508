//! Cooperative pacing for long-running optimizer passes.
//!
//! The optimizer is a sequence of small units of work (one mergeable group
//! each). After each unit it asks the [`Pacer`] whether enough wall-clock
//! time has passed to hand control back to the host, e.g. to keep an event
//! loop responsive while a rule set with millions of entries is merged.
//! Units always run to completion and in FIFO order, so pacing never
//! changes the result.

use std::time::{Duration, Instant};

/// How long the optimizer may run between two yields to the host.
pub const YIELD_BUDGET: Duration = Duration::from_millis(100);

type YieldFn = Box<dyn FnMut()>;

/// Invokes a host-supplied callback whenever the time budget between yields
/// has been spent.
pub struct Pacer {
    budget: Duration,
    last_yield: Instant,
    yield_now: Option<YieldFn>,
}

impl Pacer {
    /// A pacer with the default budget and no yield callback; [`tick`]
    /// becomes a cheap no-op beyond the clock check.
    ///
    /// [`tick`]: Pacer::tick
    pub fn new() -> Pacer {
        Pacer::with_yield_budget(YIELD_BUDGET, None)
    }

    pub fn with_yield_budget(budget: Duration, yield_now: Option<YieldFn>) -> Pacer {
        Pacer {
            budget,
            last_yield: Instant::now(),
            yield_now,
        }
    }

    /// Marks the end of one unit of work. Calls the yield callback and
    /// restarts the budget clock if the budget is spent.
    pub fn tick(&mut self) {
        if self.last_yield.elapsed() < self.budget {
            return;
        }
        if let Some(yield_now) = self.yield_now.as_mut() {
            yield_now();
        }
        self.last_yield = Instant::now();
    }
}

impl Default for Pacer {
    fn default() -> Pacer {
        Pacer::new()
    }
}

#[cfg(test)]
#[path = "../tests/unit/scheduler.rs"]
mod unit_tests;
