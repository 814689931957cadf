//! Rate-limited wrapper around a single chat transport.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tracing::{debug, trace};

use crate::domain::{ChannelName, ConnectionId, ServerAddr};
use crate::error::Result;
use crate::port::{ChatTransport, Scheduler};

/// Per-connection send ceiling: at most `limit` messages per `window`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    pub limit: u32,
    pub window: Duration,
}

impl RateLimit {
    pub const fn new(limit: u32, window: Duration) -> Self {
        Self { limit, window }
    }
}

/// One pooled chat connection with send accounting.
///
/// `sent_count` goes up once per [`record_send`](Self::record_send) and comes
/// back down by a callback scheduled for one rate window later. Liveness is
/// always read from the transport.
pub struct ManagedConnection {
    id: ConnectionId,
    nickname: String,
    server: ServerAddr,
    transport: Box<dyn ChatTransport>,
    rate: RateLimit,
    sent_count: Arc<AtomicU32>,
    join_started: AtomicBool,
    joined: AtomicBool,
    closed: AtomicBool,
    designated: AtomicBool,
    scheduler: Arc<dyn Scheduler>,
    capacity_signal: Option<Arc<Notify>>,
}

impl ManagedConnection {
    pub(super) fn new(
        id: ConnectionId,
        nickname: String,
        server: ServerAddr,
        transport: Box<dyn ChatTransport>,
        rate: RateLimit,
        scheduler: Arc<dyn Scheduler>,
        capacity_signal: Option<Arc<Notify>>,
    ) -> Self {
        Self {
            id,
            nickname,
            server,
            transport,
            rate,
            sent_count: Arc::new(AtomicU32::new(0)),
            join_started: AtomicBool::new(false),
            joined: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            designated: AtomicBool::new(false),
            scheduler,
            capacity_signal,
        }
    }

    #[must_use]
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Account this connection is logged in as.
    #[must_use]
    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    #[must_use]
    pub fn server(&self) -> &ServerAddr {
        &self.server
    }

    /// Messages sent in the current rate window.
    #[must_use]
    pub fn sent_count(&self) -> u32 {
        self.sent_count.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn rate_limit(&self) -> RateLimit {
        self.rate
    }

    #[must_use]
    pub fn is_joined(&self) -> bool {
        self.joined.load(Ordering::Acquire)
    }

    /// Transport is up and [`close`](Self::close) has not been called.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        !self.closed.load(Ordering::Acquire) && self.transport.is_connected()
    }

    /// Nothing sent in the current window.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.sent_count() == 0
    }

    /// Alive, joined and under the rate ceiling.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        self.is_alive() && self.is_joined() && self.sent_count() < self.rate.limit
    }

    /// Whether this connection has ever been the pool's main connection.
    #[must_use]
    pub fn was_designated(&self) -> bool {
        self.designated.load(Ordering::Acquire)
    }

    pub(super) fn mark_designated(&self) {
        self.designated.store(true, Ordering::Release);
    }

    /// Take one send slot in the current window.
    ///
    /// Returns `false` without side effects when the connection is already
    /// at its ceiling. On success a decrement is scheduled one rate window
    /// from now; every successful call is matched by exactly one decrement.
    pub fn record_send(&self) -> bool {
        let limit = self.rate.limit;
        let reserved = self
            .sent_count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < limit).then_some(n + 1)
            })
            .is_ok();
        if !reserved {
            return false;
        }

        let counter = Arc::clone(&self.sent_count);
        let signal = self.capacity_signal.clone();
        let connection_id = self.id;
        self.scheduler.run_after(
            self.rate.window,
            Box::new(move || {
                // Never below zero: each decrement pairs with one reservation.
                let _ = counter.fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                    n.checked_sub(1)
                });
                trace!(%connection_id, "Rate window slot released");
                if let Some(signal) = signal {
                    signal.notify_one();
                }
            }),
        );
        true
    }

    /// Finish the handshake: join `channel` if given, then mark joined.
    ///
    /// Runs the join at most once, concurrent callers included; later calls
    /// are no-ops. A failed join may be attempted again.
    pub(super) async fn join(&self, channel: Option<&ChannelName>) -> Result<()> {
        if self
            .join_started
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(());
        }
        if let Some(channel) = channel {
            if let Err(e) = self.transport.join(channel).await {
                self.join_started.store(false, Ordering::Release);
                return Err(e);
            }
            debug!(connection_id = %self.id, %channel, "Joined channel");
        }
        self.joined.store(true, Ordering::Release);
        Ok(())
    }

    pub(super) async fn request_capabilities(&self, capabilities: &[&str]) -> Result<()> {
        if capabilities.is_empty() {
            return Ok(());
        }
        self.transport.request_capabilities(capabilities).await
    }

    /// Transmit `text` to `target` over this connection's transport.
    pub async fn send(&self, target: &str, text: &str) -> Result<()> {
        self.transport.send(target, text).await
    }

    /// Terminate the transport. Idempotent.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        debug!(connection_id = %self.id, server = %self.server, "Closing connection");
        self.transport.close();
    }
}

impl std::fmt::Debug for ManagedConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagedConnection")
            .field("id", &self.id)
            .field("nickname", &self.nickname)
            .field("server", &self.server)
            .field("sent_count", &self.sent_count())
            .field("joined", &self.is_joined())
            .field("alive", &self.is_alive())
            .finish()
    }
}
