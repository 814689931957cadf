//! Deferred and periodic work.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;

/// One-shot callback.
pub type Callback = Box<dyn FnOnce() + Send + 'static>;

/// Repeating async job. Called once per tick; the returned future is awaited
/// before the next tick fires.
pub type RepeatingJob = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Timer facility used for rate-window expiry and maintenance ticks.
///
/// The only ordering guarantee is that work runs no earlier than its delay.
pub trait Scheduler: Send + Sync {
    /// Run `callback` once, `delay` from now.
    fn run_after(&self, delay: Duration, callback: Callback);

    /// Run `job` every `interval`, first run one interval from now.
    ///
    /// Runs until the returned handle is cancelled.
    fn run_every(&self, interval: Duration, job: RepeatingJob) -> ScheduledTask;
}

/// Handle to a repeating job. Dropping the handle cancels the job.
pub struct ScheduledTask {
    cancel: Box<dyn Fn() + Send + Sync>,
}

impl ScheduledTask {
    pub fn new(cancel: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            cancel: Box::new(cancel),
        }
    }

    /// Stop future runs. A run already in progress is allowed to finish or
    /// is aborted, depending on the scheduler.
    pub fn cancel(&self) {
        (self.cancel)();
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        (self.cancel)();
    }
}

impl fmt::Debug for ScheduledTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduledTask").finish_non_exhaustive()
    }
}
