//! Rate-limited chat connection pools.
//!
//! This module keeps a rotating set of IRC connections against Twitch chat
//! and routes outbound messages through whichever connection has headroom
//! under its per-connection rate ceiling.
//!
//! # Architecture
//!
//! Each pooled connection is a [`ManagedConnection`]: a transport plus a
//! sent-message counter. Every send takes one slot and schedules its release
//! one rate window later, so the counter always equals the number of
//! releases still pending.
//!
//! A periodic maintenance pass (see `manage`) keeps the set healthy:
//! - **Dead connections** are evicted (liveness is read from the transport)
//! - **Excess idle capacity** beyond `backup_count` is closed
//! - **Missing capacity** is replenished through the [`ConnectionFactory`]
//!
//! Selection is first-usable in insertion order, which keeps the main
//! connection hot and lets backups absorb overflow only when it saturates.
//!
//! The whisper pool in [`whisper`] applies the same discipline to a fixed
//! roster of accounts and feeds a FIFO queue through a single worker.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use futures_util::FutureExt;
use tracing::{debug, info, warn};

use crate::domain::{ChannelName, ChatCommand, ConnectionId, Identity};
use crate::error::{ConfigError, PoolError, Result};
use crate::infrastructure::config::pool::ChatPoolConfig;
use crate::port::{RepeatingJob, ScheduledTask};

mod connection;
mod factory;
mod manage;
mod state;
pub mod whisper;

pub use connection::{ManagedConnection, RateLimit};
pub use factory::{ConnectionFactory, ConnectionTarget, PoolDeps};
pub use manage::ReconcileReport;
pub use state::PoolStats;
pub use whisper::WhisperConnectionPool;

use manage::create_batch;
use state::{first_usable, lock_or_recover, reserve_first_usable, SharedCounters};

/// Connection set plus the designated main connection, guarded together.
#[derive(Default)]
pub(crate) struct ConnectionSet {
    connections: Vec<Arc<ManagedConnection>>,
    main: Option<ConnectionId>,
}

impl ConnectionSet {
    /// Designate the first alive connection as main when there is none.
    fn elect_main(&mut self) {
        if self.main.is_some() {
            return;
        }
        if let Some(conn) = self.connections.iter().find(|c| c.is_alive()) {
            conn.mark_designated();
            self.main = Some(conn.id());
            info!(connection_id = %conn.id(), server = %conn.server(), "Main connection designated");
        }
    }

    /// Idle connections other than main.
    fn idle_count(&self) -> usize {
        self.connections
            .iter()
            .filter(|c| Some(c.id()) != self.main && c.is_idle())
            .count()
    }
}

/// State shared between the pool handle and its maintenance job.
pub(crate) struct PoolInner {
    channel: ChannelName,
    identity: Identity,
    config: ChatPoolConfig,
    factory: ConnectionFactory,
    set: Mutex<ConnectionSet>,
    reconcile_lock: tokio::sync::Mutex<()>,
    next_id: AtomicU64,
    counters: SharedCounters,
    closed: AtomicBool,
}

impl PoolInner {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// Pool of chat connections for one channel.
///
/// Construct with [`new`](Self::new), then [`start`](Self::start) to open the
/// initial connections and schedule maintenance. Dropping the pool cancels
/// maintenance and closes every connection.
pub struct ConnectionPool {
    inner: Arc<PoolInner>,
    maintenance: parking_lot::Mutex<Option<ScheduledTask>>,
}

impl ConnectionPool {
    /// Create a pool. No connections are opened until [`start`](Self::start).
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid:
    /// - `rate_limit` must be > 0
    /// - `rate_window_secs` must be > 0
    /// - `reconcile_interval_secs` must be > 0
    /// - `max_in_flight` must be > 0
    #[must_use = "returns Result that must be checked"]
    pub fn new(
        config: ChatPoolConfig,
        channel: ChannelName,
        identity: Identity,
        capabilities: Vec<String>,
        deps: PoolDeps,
    ) -> Result<Self> {
        Self::validate_config(&config)?;

        let factory = ConnectionFactory::new(
            deps,
            ConnectionTarget::Channel(channel.clone()),
            RateLimit::new(config.rate_limit, config.rate_window()),
        )
        .with_capabilities(capabilities);

        Ok(Self {
            inner: Arc::new(PoolInner {
                channel,
                identity,
                config,
                factory,
                set: Mutex::new(ConnectionSet::default()),
                reconcile_lock: tokio::sync::Mutex::new(()),
                next_id: AtomicU64::new(1),
                counters: SharedCounters::new(),
                closed: AtomicBool::new(false),
            }),
            maintenance: parking_lot::Mutex::new(None),
        })
    }

    fn validate_config(config: &ChatPoolConfig) -> Result<()> {
        let invalid = |field: &'static str, reason: &str| -> crate::error::Error {
            ConfigError::InvalidValue {
                field,
                reason: reason.to_string(),
            }
            .into()
        };

        if config.rate_limit == 0 {
            return Err(invalid("rate_limit", "must be > 0"));
        }
        if config.rate_window_secs == 0 {
            return Err(invalid("rate_window_secs", "must be > 0"));
        }
        if config.reconcile_interval_secs == 0 {
            return Err(invalid("reconcile_interval_secs", "must be > 0"));
        }
        if config.max_in_flight == 0 {
            return Err(invalid("max_in_flight", "must be > 0"));
        }
        Ok(())
    }

    /// Open `backup_count + 1` connections and schedule maintenance.
    ///
    /// The first connection to come up becomes main. Calling `start` on a
    /// running pool is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::StartFailed`] when not a single connection could
    /// be opened, and [`PoolError::PoolClosed`] after shutdown.
    pub async fn start(&self) -> Result<()> {
        if self.inner.is_closed() {
            return Err(PoolError::PoolClosed.into());
        }
        if self.maintenance.lock().is_some() {
            debug!(channel = %self.inner.channel, "Pool already started");
            return Ok(());
        }

        let wanted = self.inner.config.backup_count + 1;
        info!(
            channel = %self.inner.channel,
            connections = wanted,
            rate_limit = self.inner.config.rate_limit,
            rate_window_secs = self.inner.config.rate_window_secs,
            "Starting connection pool"
        );

        let requests = (0..wanted)
            .map(|_| (self.inner.next_id(), self.inner.identity.clone()))
            .collect();
        let created = create_batch(
            &self.inner.factory,
            requests,
            self.inner.config.max_in_flight,
            &self.inner.counters,
        )
        .await;
        if created.is_empty() {
            return Err(PoolError::StartFailed(format!(
                "no connection to #{} could be opened",
                self.inner.channel
            ))
            .into());
        }
        let opened = self.inner.merge(created);
        if opened < wanted {
            warn!(opened, wanted, "Pool started below target; maintenance will retry");
        }

        let weak = Arc::downgrade(&self.inner);
        let job: RepeatingJob = Arc::new(move || {
            let weak = weak.clone();
            async move {
                if let Some(inner) = weak.upgrade() {
                    inner.reconcile().await;
                }
            }
            .boxed()
        });
        let task = self
            .inner
            .factory
            .scheduler()
            .run_every(self.inner.config.reconcile_interval(), job);
        *self.maintenance.lock() = Some(task);
        Ok(())
    }

    /// Run one maintenance pass now.
    ///
    /// Never fails; problems are logged and retried on the next pass.
    pub async fn reconcile(&self) -> ReconcileReport {
        self.inner.reconcile().await
    }

    /// First usable connection in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::NoUsableConnection`] when every connection is
    /// dead, unjoined or at its rate ceiling. Never waits.
    pub fn select_connection(&self) -> Result<Arc<ManagedConnection>> {
        let set = lock_or_recover(&self.inner.set);
        first_usable(&set.connections).ok_or_else(|| PoolError::NoUsableConnection.into())
    }

    /// Send `message` to `channel` over the first connection with headroom.
    ///
    /// There is no buffering: when no connection is usable the message is
    /// dropped and the error returned.
    ///
    /// # Errors
    ///
    /// - [`PoolError::NoUsableConnection`] when the pool is saturated
    /// - the transport's error if the write fails
    pub async fn send(&self, channel: &ChannelName, message: &str) -> Result<()> {
        if self.inner.is_closed() {
            return Err(PoolError::PoolClosed.into());
        }
        let conn = {
            let set = lock_or_recover(&self.inner.set);
            reserve_first_usable(&set.connections)
        };
        let conn = match conn {
            Ok(conn) => conn,
            Err(e) => {
                SharedCounters::bump(&self.inner.counters.messages_dropped);
                warn!(%channel, connections = self.connection_count(), "No usable connection, dropping message");
                return Err(e.into());
            }
        };

        if let Err(e) = conn.send(&channel.irc_target(), message).await {
            SharedCounters::bump(&self.inner.counters.messages_dropped);
            warn!(connection_id = %conn.id(), %channel, error = %e, "Send failed");
            return Err(e);
        }
        SharedCounters::bump(&self.inner.counters.messages_sent);
        debug!(connection_id = %conn.id(), %channel, sent = conn.sent_count(), "Message sent");
        Ok(())
    }

    /// Send a chat command to the pool's own channel.
    ///
    /// # Errors
    ///
    /// Same as [`send`](Self::send).
    pub async fn command(&self, command: &ChatCommand) -> Result<()> {
        self.send(&self.inner.channel, &command.to_string()).await
    }

    /// Plain message to the pool's channel.
    ///
    /// # Errors
    ///
    /// Same as [`send`](Self::send).
    pub async fn say(&self, message: &str) -> Result<()> {
        self.command(&ChatCommand::Say(message.to_string())).await
    }

    /// `/me` action in the pool's channel.
    ///
    /// # Errors
    ///
    /// Same as [`send`](Self::send).
    pub async fn me(&self, message: &str) -> Result<()> {
        self.command(&ChatCommand::Me(message.to_string())).await
    }

    /// Time a user out for `seconds`.
    ///
    /// # Errors
    ///
    /// Same as [`send`](Self::send).
    pub async fn timeout(&self, user: &str, seconds: u32, reason: Option<&str>) -> Result<()> {
        self.command(&ChatCommand::Timeout {
            user: user.to_string(),
            seconds,
            reason: reason.map(str::to_string),
        })
        .await
    }

    /// # Errors
    ///
    /// Same as [`send`](Self::send).
    pub async fn ban(&self, user: &str, reason: Option<&str>) -> Result<()> {
        self.command(&ChatCommand::Ban {
            user: user.to_string(),
            reason: reason.map(str::to_string),
        })
        .await
    }

    /// # Errors
    ///
    /// Same as [`send`](Self::send).
    pub async fn unban(&self, user: &str) -> Result<()> {
        self.command(&ChatCommand::Unban {
            user: user.to_string(),
        })
        .await
    }

    /// Delete one chat message by its `id` tag.
    ///
    /// # Errors
    ///
    /// Same as [`send`](Self::send).
    pub async fn delete_message(&self, message_id: &str) -> Result<()> {
        self.command(&ChatCommand::Delete {
            message_id: message_id.to_string(),
        })
        .await
    }

    #[must_use]
    pub fn channel(&self) -> &ChannelName {
        &self.inner.channel
    }

    #[must_use]
    pub fn main_connection(&self) -> Option<ConnectionId> {
        lock_or_recover(&self.inner.set).main
    }

    #[must_use]
    pub fn connection_count(&self) -> usize {
        lock_or_recover(&self.inner.set).connections.len()
    }

    /// IDs of the pooled connections in insertion order.
    #[must_use]
    pub fn connection_ids(&self) -> Vec<ConnectionId> {
        lock_or_recover(&self.inner.set)
            .connections
            .iter()
            .map(|c| c.id())
            .collect()
    }

    /// Runtime statistics for observability.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        let set = lock_or_recover(&self.inner.set);
        PoolStats::snapshot(&set.connections, set.main, &self.inner.counters)
    }

    /// Cancel maintenance and close every connection. Idempotent.
    pub fn shutdown(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(task) = self.maintenance.lock().take() {
            task.cancel();
        }
        let mut set = lock_or_recover(&self.inner.set);
        for conn in set.connections.drain(..) {
            conn.close();
        }
        set.main = None;
        info!(channel = %self.inner.channel, "Connection pool shut down");
    }
}

impl Drop for ConnectionPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests;
