//! Discrete-event clock behind `embassy_time::Instant::now()`.
//!
//! Simulation time never runs on its own: the scenario driver (or a test)
//! moves it forward explicitly with [`advance_to`] / [`advance_by`]. Timers
//! scheduled through embassy-time are queued per virtual timestamp and woken
//! when the clock reaches them.
//!
//! The clock is per thread. The whole core is single threaded, and keeping
//! the tick counter thread-local lets every test thread own an independent
//! timeline.

use core::task::Waker;
use embassy_time::{Duration, Instant};
use embassy_time_driver::{Driver, time_driver_impl};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

#[derive(Default)]
struct SchedulerState {
    // Map of virtual-timestamp -> list of wakers
    queue: BTreeMap<u64, Vec<Waker>>,
}

thread_local! {
    static NOW_TICKS: Cell<u64> = const { Cell::new(0) };
    static SCHED: RefCell<SchedulerState> = RefCell::new(SchedulerState::default());
}

fn now_ticks() -> u64 {
    NOW_TICKS.with(Cell::get)
}

struct SimulationDriver;

impl Driver for SimulationDriver {
    fn now(&self) -> u64 {
        now_ticks()
    }

    fn schedule_wake(&self, at: u64, waker: &Waker) {
        if at <= now_ticks() {
            waker.wake_by_ref();
            return;
        }
        SCHED.with(|sched| sched.borrow_mut().queue.entry(at).or_default().push(waker.clone()));
    }
}

// Register as the global time driver for embassy-time
time_driver_impl!(static DRIVER: SimulationDriver = SimulationDriver);

/// Move the clock forward to `target` and wake every timer due by then.
///
/// Returns the number of wakers fired. Moving backwards is refused.
pub fn advance_to(target: Instant) -> usize {
    let now = now_ticks();
    let target_ticks = target.as_ticks();
    if target_ticks < now {
        log::warn!("Refusing to move simulation clock backwards ({} -> {} ticks)", now, target_ticks);
        return 0;
    }
    NOW_TICKS.with(|ticks| ticks.set(target_ticks));

    // Drain due wakers first and wake them outside the borrow, a woken task may schedule again.
    let ready: Vec<Waker> = SCHED.with(|sched| {
        let mut guard = sched.borrow_mut();
        let pending = guard.queue.split_off(&(target_ticks + 1));
        let due = std::mem::replace(&mut guard.queue, pending);
        due.into_values().flatten().collect()
    });

    let woken = ready.len();
    for waker in ready {
        waker.wake();
    }
    woken
}

/// Advance the clock by `delta` relative to the current simulation time.
pub fn advance_by(delta: Duration) -> usize {
    advance_to(Instant::now() + delta)
}

/// Rewind the clock to zero and drop every queued timer. Used when a new run starts.
pub fn reset() {
    NOW_TICKS.with(|ticks| ticks.set(0));
    SCHED.with(|sched| sched.borrow_mut().queue.clear());
}

/// Number of timers still waiting for the clock to reach them.
pub fn pending_wakeups() -> usize {
    SCHED.with(|sched| sched.borrow().queue.values().map(Vec::len).sum())
}
