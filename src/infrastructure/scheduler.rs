//! Tokio-backed [`Scheduler`].

use std::time::Duration;

use tokio::runtime::Handle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::trace;

use crate::port::{Callback, RepeatingJob, ScheduledTask, Scheduler};

/// Scheduler that spawns one tokio task per scheduled item.
///
/// Holds a runtime handle so callbacks can be scheduled from threads that are
/// not themselves inside the runtime.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    handle: Handle,
}

impl TokioScheduler {
    /// Scheduler bound to the runtime of the calling context.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    #[must_use]
    pub fn current() -> Self {
        Self {
            handle: Handle::current(),
        }
    }

    pub fn with_handle(handle: Handle) -> Self {
        Self { handle }
    }
}

impl Scheduler for TokioScheduler {
    fn run_after(&self, delay: Duration, callback: Callback) {
        self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            callback();
        });
    }

    fn run_every(&self, interval: Duration, job: RepeatingJob) -> ScheduledTask {
        let task = self.handle.spawn(async move {
            let mut ticker = interval_at(Instant::now() + interval, interval);
            // A slow job pushes the next tick back instead of bursting.
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                trace!(interval_ms = interval.as_millis() as u64, "Scheduled tick");
                job().await;
            }
        });
        let abort = task.abort_handle();
        ScheduledTask::new(move || abort.abort())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use futures_util::FutureExt;

    #[tokio::test(start_paused = true)]
    async fn run_after_fires_no_earlier_than_delay() {
        let scheduler = TokioScheduler::current();
        let fired = Arc::new(AtomicU32::new(0));
        let f = fired.clone();
        scheduler.run_after(
            Duration::from_secs(30),
            Box::new(move || {
                f.fetch_add(1, Ordering::SeqCst);
            }),
        );

        tokio::time::sleep(Duration::from_secs(29)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn run_every_repeats_until_cancelled() {
        let scheduler = TokioScheduler::current();
        let ticks = Arc::new(AtomicU32::new(0));
        let t = ticks.clone();
        let job: RepeatingJob = Arc::new(move || {
            let t = t.clone();
            async move {
                t.fetch_add(1, Ordering::SeqCst);
            }
            .boxed()
        });

        let task = scheduler.run_every(Duration::from_secs(4), job);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 0, "first tick is one interval out");

        tokio::time::sleep(Duration::from_secs(12)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 3);

        task.cancel();
        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_handle_stops_the_job() {
        let scheduler = TokioScheduler::current();
        let ticks = Arc::new(AtomicU32::new(0));
        let t = ticks.clone();
        let job: RepeatingJob = Arc::new(move || {
            let t = t.clone();
            async move {
                t.fetch_add(1, Ordering::SeqCst);
            }
            .boxed()
        });

        let task = scheduler.run_every(Duration::from_secs(4), job);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 1);

        drop(task);
        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 1);
    }
}
