//! Whisper connection pool.
//!
//! One connection per roster account, no main connection, and a FIFO queue
//! drained by a single worker task. When every connection is at its ceiling
//! the worker parks on a [`Notify`] that is signalled by rate-window expiry
//! and by reconcile adding connections, so the head of the queue is sent as
//! soon as capacity returns and nothing behind it overtakes it.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use futures_util::FutureExt;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use super::connection::{ManagedConnection, RateLimit};
use super::factory::{ConnectionFactory, ConnectionTarget, PoolDeps};
use super::manage::{create_batch, ReconcileReport};
use super::state::{evict_dead, lock_or_recover, reserve_first_usable, PoolStats, SharedCounters};
use crate::domain::{ConnectionId, Identity, Whisper};
use crate::error::{ConfigError, PoolError, Result};
use crate::infrastructure::config::pool::WhisperPoolConfig;
use crate::port::{RepeatingJob, ScheduledTask};

/// Channel the legacy `/w` command is sent to.
const WHISPER_CHANNEL: &str = "#jtv";

struct WhisperInner {
    config: WhisperPoolConfig,
    roster: Vec<Identity>,
    factory: ConnectionFactory,
    set: Mutex<Vec<Arc<ManagedConnection>>>,
    reconcile_lock: tokio::sync::Mutex<()>,
    next_id: AtomicU64,
    counters: SharedCounters,
    capacity: Arc<Notify>,
    queue: mpsc::UnboundedSender<Whisper>,
    queued: AtomicUsize,
    closed: AtomicBool,
}

/// Pool of whisper connections fed by a FIFO queue.
pub struct WhisperConnectionPool {
    inner: Arc<WhisperInner>,
    receiver: parking_lot::Mutex<Option<mpsc::UnboundedReceiver<Whisper>>>,
    worker: parking_lot::Mutex<Option<JoinHandle<()>>>,
    schedules: parking_lot::Mutex<Vec<ScheduledTask>>,
}

impl WhisperConnectionPool {
    /// Create a pool for the configured roster. Nothing connects until
    /// [`start`](Self::start); whispers enqueued before then wait.
    ///
    /// # Errors
    ///
    /// Returns an error if a limit, window or interval is zero.
    pub fn new(config: WhisperPoolConfig, capabilities: Vec<String>, deps: PoolDeps) -> Result<Self> {
        validate_config(&config)?;

        let capacity = Arc::new(Notify::new());
        let factory = ConnectionFactory::new(
            deps,
            ConnectionTarget::Whispers,
            RateLimit::new(config.rate_limit, config.rate_window()),
        )
        .with_capabilities(capabilities)
        .with_cached_servers()
        .with_capacity_signal(Arc::clone(&capacity));

        let (queue, receiver) = mpsc::unbounded_channel();
        let roster = config.roster();
        if roster.len() < config.accounts.len() {
            warn!(
                configured = config.accounts.len(),
                max_accounts = config.max_accounts,
                "Whisper roster truncated"
            );
        }

        Ok(Self {
            inner: Arc::new(WhisperInner {
                config,
                roster,
                factory,
                set: Mutex::new(Vec::new()),
                reconcile_lock: tokio::sync::Mutex::new(()),
                next_id: AtomicU64::new(1),
                counters: SharedCounters::new(),
                capacity,
                queue,
                queued: AtomicUsize::new(0),
                closed: AtomicBool::new(false),
            }),
            receiver: parking_lot::Mutex::new(Some(receiver)),
            worker: parking_lot::Mutex::new(None),
            schedules: parking_lot::Mutex::new(Vec::new()),
        })
    }

    /// Fetch the whisper server list, connect every roster account, start
    /// the queue worker and schedule maintenance and server refresh.
    ///
    /// Must be called from within a tokio runtime. A second call is a no-op.
    ///
    /// # Errors
    ///
    /// - [`PoolError::StartFailed`] when the roster is empty or no account
    ///   could connect
    /// - [`PoolError::PoolClosed`] after shutdown
    pub async fn start(&self) -> Result<()> {
        if self.inner.is_closed() {
            return Err(PoolError::PoolClosed.into());
        }
        if self.receiver.lock().is_none() {
            debug!("Whisper pool already started");
            return Ok(());
        }
        if self.inner.roster.is_empty() {
            return Err(PoolError::StartFailed("whisper roster is empty".into()).into());
        }

        info!(
            accounts = self.inner.roster.len(),
            rate_limit = self.inner.config.rate_limit,
            rate_window_secs = self.inner.config.rate_window_secs,
            "Starting whisper pool"
        );

        if let Err(e) = self.inner.factory.refresh_servers().await {
            warn!(error = %e, "Initial whisper server lookup failed");
        }
        let report = self.inner.reconcile().await;
        if report.created == 0 {
            return Err(PoolError::StartFailed("no whisper account could connect".into()).into());
        }
        if report.created < self.inner.roster.len() {
            warn!(
                opened = report.created,
                wanted = self.inner.roster.len(),
                "Whisper pool started below target; maintenance will retry"
            );
        }

        // Taken last; a start that failed above leaves it in place.
        let Some(receiver) = self.receiver.lock().take() else {
            debug!("Whisper pool started concurrently");
            return Ok(());
        };
        let worker = tokio::spawn(run_worker(Arc::clone(&self.inner), receiver));
        *self.worker.lock() = Some(worker);

        let scheduler = self.inner.factory.scheduler();
        let weak = Arc::downgrade(&self.inner);
        let maintenance: RepeatingJob = Arc::new(move || {
            let weak = weak.clone();
            async move {
                if let Some(inner) = weak.upgrade() {
                    inner.reconcile().await;
                }
            }
            .boxed()
        });
        let weak = Arc::downgrade(&self.inner);
        let refresh: RepeatingJob = Arc::new(move || {
            let weak = weak.clone();
            async move {
                if let Some(inner) = weak.upgrade() {
                    if let Err(e) = inner.factory.refresh_servers().await {
                        warn!(error = %e, "Whisper server refresh failed, keeping previous list");
                    }
                }
            }
            .boxed()
        });

        let mut schedules = self.schedules.lock();
        schedules.push(scheduler.run_every(self.inner.config.reconcile_interval(), maintenance));
        schedules.push(scheduler.run_every(self.inner.config.server_refresh_interval(), refresh));
        Ok(())
    }

    /// Queue a whisper. Never blocks; delivery order is enqueue order.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::PoolClosed`] after shutdown.
    pub fn enqueue_whisper(&self, target: &str, message: &str) -> Result<()> {
        if self.inner.is_closed() {
            return Err(PoolError::PoolClosed.into());
        }
        self.inner.queued.fetch_add(1, Ordering::AcqRel);
        if self.inner.queue.send(Whisper::new(target, message)).is_err() {
            self.inner.queued.fetch_sub(1, Ordering::AcqRel);
            return Err(PoolError::PoolClosed.into());
        }
        trace!(%target, "Whisper queued");
        Ok(())
    }

    /// Run one maintenance pass now.
    pub async fn reconcile(&self) -> ReconcileReport {
        self.inner.reconcile().await
    }

    /// Whispers not yet handed to a transport.
    #[must_use]
    pub fn queue_len(&self) -> usize {
        self.inner.queued.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn connection_count(&self) -> usize {
        lock_or_recover(&self.inner.set).len()
    }

    /// Roster accounts currently holding a connection.
    #[must_use]
    pub fn connected_accounts(&self) -> Vec<String> {
        lock_or_recover(&self.inner.set)
            .iter()
            .map(|c| c.nickname().to_string())
            .collect()
    }

    /// Addresses in the cached whisper server list.
    #[must_use]
    pub fn cached_server_count(&self) -> usize {
        self.inner.factory.cached_server_count()
    }

    #[must_use]
    pub fn stats(&self) -> PoolStats {
        let set = lock_or_recover(&self.inner.set);
        PoolStats {
            queued: self.queue_len(),
            ..PoolStats::snapshot(&set, None, &self.inner.counters)
        }
    }

    /// Stop the worker, cancel schedules and close every connection.
    /// Queued whispers are discarded. Idempotent.
    pub fn shutdown(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        for task in self.schedules.lock().drain(..) {
            task.cancel();
        }
        if let Some(worker) = self.worker.lock().take() {
            worker.abort();
        }
        for conn in lock_or_recover(&self.inner.set).drain(..) {
            conn.close();
        }
        let discarded = self.inner.queued.swap(0, Ordering::AcqRel);
        info!(discarded, "Whisper pool shut down");
    }
}

impl Drop for WhisperConnectionPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn validate_config(config: &WhisperPoolConfig) -> Result<()> {
    let invalid = |field: &'static str| -> crate::error::Error {
        ConfigError::InvalidValue {
            field,
            reason: "must be > 0".to_string(),
        }
        .into()
    };

    if config.rate_limit == 0 {
        return Err(invalid("whisper.rate_limit"));
    }
    if config.rate_window_secs == 0 {
        return Err(invalid("whisper.rate_window_secs"));
    }
    if config.reconcile_interval_secs == 0 {
        return Err(invalid("whisper.reconcile_interval_secs"));
    }
    if config.server_refresh_secs == 0 {
        return Err(invalid("whisper.server_refresh_secs"));
    }
    if config.max_in_flight == 0 {
        return Err(invalid("whisper.max_in_flight"));
    }
    Ok(())
}

impl WhisperInner {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Evict dead connections, then connect every roster account that has
    /// no connection.
    async fn reconcile(&self) -> ReconcileReport {
        let _pass = self.reconcile_lock.lock().await;
        let mut report = ReconcileReport::default();
        if self.is_closed() {
            return report;
        }

        let requests: Vec<(ConnectionId, Identity)> = {
            let mut set = lock_or_recover(&self.set);
            report.evicted = evict_dead(&mut set, &self.counters).len();
            self.roster
                .iter()
                .filter(|account| !set.iter().any(|c| c.nickname() == account.nickname))
                .map(|account| {
                    let id = ConnectionId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
                    (id, account.clone())
                })
                .collect()
        };

        report.requested = requests.len();
        if !requests.is_empty() {
            let created = create_batch(
                &self.factory,
                requests,
                self.config.max_in_flight,
                &self.counters,
            )
            .await;
            report.created = self.merge(created);
        }

        if report.evicted > 0 || report.created > 0 {
            info!(
                evicted = report.evicted,
                requested = report.requested,
                created = report.created,
                "Whisper pool reconciled"
            );
        }
        report
    }

    fn merge(&self, created: Vec<ManagedConnection>) -> usize {
        let mut set = lock_or_recover(&self.set);
        if self.is_closed() {
            for conn in created {
                conn.close();
            }
            return 0;
        }
        let count = created.len();
        set.extend(created.into_iter().map(Arc::new));
        drop(set);
        if count > 0 {
            self.capacity.notify_one();
        }
        count
    }

    /// Reserve a slot on the first usable connection, waiting for capacity
    /// as long as it takes. `None` once the pool is closed.
    async fn acquire(&self) -> Option<Arc<ManagedConnection>> {
        let mut stalled = false;
        loop {
            if self.is_closed() {
                return None;
            }
            let reserved = {
                let set = lock_or_recover(&self.set);
                reserve_first_usable(&set)
            };
            match reserved {
                Ok(conn) => return Some(conn),
                Err(_) => {
                    if !stalled {
                        debug!(
                            queued = self.queued.load(Ordering::Acquire),
                            "No usable whisper connection, waiting for capacity"
                        );
                        stalled = true;
                    }
                    self.capacity.notified().await;
                }
            }
        }
    }
}

async fn run_worker(inner: Arc<WhisperInner>, mut receiver: mpsc::UnboundedReceiver<Whisper>) {
    debug!("Whisper worker started");
    while let Some(whisper) = receiver.recv().await {
        let Some(conn) = inner.acquire().await else {
            break;
        };
        let result = conn.send(WHISPER_CHANNEL, &whisper.as_command()).await;
        let _ = inner
            .queued
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
        match result {
            Ok(()) => {
                SharedCounters::bump(&inner.counters.messages_sent);
                debug!(
                    connection_id = %conn.id(),
                    nickname = conn.nickname(),
                    target = %whisper.target,
                    "Whisper sent"
                );
            }
            Err(e) => {
                SharedCounters::bump(&inner.counters.messages_dropped);
                warn!(
                    connection_id = %conn.id(),
                    target = %whisper.target,
                    error = %e,
                    "Whisper send failed"
                );
            }
        }
    }
    debug!("Whisper worker stopped");
}
