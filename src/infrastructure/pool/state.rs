//! Connection pool internal state types.
//!
//! Provides shared counters, the stats snapshot, and helpers used by both
//! the channel pool and the whisper pool.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, warn};

use super::connection::ManagedConnection;
use crate::domain::ConnectionId;
use crate::error::PoolError;

/// Shared counters updated atomically by the send path and maintenance.
pub(super) struct SharedCounters {
    /// Connections successfully opened by the factory.
    pub(super) created: AtomicU64,
    /// Factory calls that failed (directory or handshake).
    pub(super) creation_failures: AtomicU64,
    /// Dead connections removed during maintenance.
    pub(super) evicted: AtomicU64,
    /// Excess idle connections closed during maintenance.
    pub(super) trimmed: AtomicU64,
    /// Messages handed to a transport.
    pub(super) messages_sent: AtomicU64,
    /// Messages dropped for lack of a usable connection or a failed write.
    pub(super) messages_dropped: AtomicU64,
}

impl SharedCounters {
    pub(super) fn new() -> Self {
        Self {
            created: AtomicU64::new(0),
            creation_failures: AtomicU64::new(0),
            evicted: AtomicU64::new(0),
            trimmed: AtomicU64::new(0),
            messages_sent: AtomicU64::new(0),
            messages_dropped: AtomicU64::new(0),
        }
    }

    pub(super) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Point-in-time pool statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Connections currently in the set.
    pub connections: usize,
    /// Connections with nothing sent in the current window (main excluded).
    pub idle: usize,
    /// Connections that could carry a message right now.
    pub usable: usize,
    /// Designated main connection, if any.
    pub main: Option<ConnectionId>,
    pub created: u64,
    pub creation_failures: u64,
    pub evicted: u64,
    pub trimmed: u64,
    pub messages_sent: u64,
    pub messages_dropped: u64,
    /// Whispers waiting in the outbound queue (whisper pool only).
    pub queued: usize,
}

impl PoolStats {
    pub(super) fn snapshot(
        connections: &[Arc<ManagedConnection>],
        main: Option<ConnectionId>,
        counters: &SharedCounters,
    ) -> Self {
        Self {
            connections: connections.len(),
            idle: connections
                .iter()
                .filter(|c| Some(c.id()) != main && c.is_idle())
                .count(),
            usable: connections.iter().filter(|c| c.is_usable()).count(),
            main,
            created: counters.created.load(Ordering::Relaxed),
            creation_failures: counters.creation_failures.load(Ordering::Relaxed),
            evicted: counters.evicted.load(Ordering::Relaxed),
            trimmed: counters.trimmed.load(Ordering::Relaxed),
            messages_sent: counters.messages_sent.load(Ordering::Relaxed),
            messages_dropped: counters.messages_dropped.load(Ordering::Relaxed),
            queued: 0,
        }
    }
}

/// Lock a mutex, recovering from poisoning if necessary.
///
/// If a thread panicked while holding the lock, logs a warning and recovers
/// the data. This keeps the pool operational while surfacing the issue.
pub(super) fn lock_or_recover<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn!("Mutex poisoned (previous holder panicked), recovering");
            poisoned.into_inner()
        }
    }
}

/// Remove and close every connection whose transport is no longer alive.
///
/// Returns the IDs of the evicted connections.
pub(super) fn evict_dead(
    connections: &mut Vec<Arc<ManagedConnection>>,
    counters: &SharedCounters,
) -> Vec<ConnectionId> {
    let mut evicted = Vec::new();
    connections.retain(|c| {
        if c.is_alive() {
            return true;
        }
        debug!(connection_id = %c.id(), nickname = c.nickname(), "Evicting dead connection");
        c.close();
        SharedCounters::bump(&counters.evicted);
        evicted.push(c.id());
        false
    });
    evicted
}

/// First usable connection in insertion order. No side effects.
pub(super) fn first_usable(connections: &[Arc<ManagedConnection>]) -> Option<Arc<ManagedConnection>> {
    connections.iter().find(|c| c.is_usable()).cloned()
}

/// Select the first usable connection and reserve one send slot on it.
///
/// Must be called with the set lock held so selection and reservation are
/// atomic with respect to other senders on the same pool.
pub(super) fn reserve_first_usable(
    connections: &[Arc<ManagedConnection>],
) -> Result<Arc<ManagedConnection>, PoolError> {
    connections
        .iter()
        .find(|c| c.is_usable() && c.record_send())
        .cloned()
        .ok_or(PoolError::NoUsableConnection)
}
