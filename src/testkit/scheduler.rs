//! Deterministic [`Scheduler`] driven by the test.
//!
//! Nothing runs on its own: one-shot callbacks fire when the virtual clock
//! is moved past their due time with [`ManualScheduler::advance`], and
//! repeating jobs run once per [`ManualScheduler::run_repeating`] call.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::port::{Callback, RepeatingJob, ScheduledTask, Scheduler};

struct Timer {
    due: Duration,
    seq: u64,
    callback: Callback,
}

struct Repeating {
    interval: Duration,
    job: RepeatingJob,
    cancelled: Arc<AtomicBool>,
}

#[derive(Default)]
struct State {
    now: Duration,
    next_seq: u64,
    timers: Vec<Timer>,
    repeating: Vec<Repeating>,
}

#[derive(Default)]
pub struct ManualScheduler {
    state: Mutex<State>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Virtual time elapsed since creation.
    pub fn now(&self) -> Duration {
        self.state.lock().now
    }

    /// One-shot callbacks that have not fired yet.
    pub fn pending(&self) -> usize {
        self.state.lock().timers.len()
    }

    /// Repeating jobs that have not been cancelled.
    pub fn repeating_count(&self) -> usize {
        self.state
            .lock()
            .repeating
            .iter()
            .filter(|r| !r.cancelled.load(Ordering::SeqCst))
            .count()
    }

    /// Intervals of the live repeating jobs, in registration order.
    pub fn repeating_intervals(&self) -> Vec<Duration> {
        self.state
            .lock()
            .repeating
            .iter()
            .filter(|r| !r.cancelled.load(Ordering::SeqCst))
            .map(|r| r.interval)
            .collect()
    }

    /// Move the clock forward and fire every callback now due, earliest
    /// first. Returns how many fired.
    pub fn advance(&self, by: Duration) -> usize {
        let due: Vec<Timer> = {
            let mut state = self.state.lock();
            state.now += by;
            let now = state.now;
            let (due, rest): (Vec<_>, Vec<_>) =
                std::mem::take(&mut state.timers).into_iter().partition(|t| t.due <= now);
            state.timers = rest;
            due
        };
        let mut due = due;
        due.sort_by_key(|t| (t.due, t.seq));
        let fired = due.len();
        for timer in due {
            (timer.callback)();
        }
        fired
    }

    /// Run every live repeating job once, in registration order.
    pub async fn run_repeating(&self) {
        let jobs: Vec<RepeatingJob> = self
            .state
            .lock()
            .repeating
            .iter()
            .filter(|r| !r.cancelled.load(Ordering::SeqCst))
            .map(|r| Arc::clone(&r.job))
            .collect();
        for job in jobs {
            job().await;
        }
    }
}

impl Scheduler for ManualScheduler {
    fn run_after(&self, delay: Duration, callback: Callback) {
        let mut state = self.state.lock();
        let due = state.now + delay;
        let seq = state.next_seq;
        state.next_seq += 1;
        state.timers.push(Timer { due, seq, callback });
    }

    fn run_every(&self, interval: Duration, job: RepeatingJob) -> ScheduledTask {
        let cancelled = Arc::new(AtomicBool::new(false));
        self.state.lock().repeating.push(Repeating {
            interval,
            job,
            cancelled: Arc::clone(&cancelled),
        });
        ScheduledTask::new(move || cancelled.store(true, Ordering::SeqCst))
    }
}
