//! Pool maintenance: the reconcile pass and batched connection creation.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use futures_util::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use super::connection::ManagedConnection;
use super::factory::ConnectionFactory;
use super::state::{evict_dead, lock_or_recover, SharedCounters};
use super::PoolInner;
use crate::domain::{ConnectionId, Identity};

/// What a single reconcile pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Dead connections removed.
    pub evicted: usize,
    /// Excess idle connections closed.
    pub trimmed: usize,
    /// Connections the pass tried to open.
    pub requested: usize,
    /// Connections actually opened and added.
    pub created: usize,
    /// Main connection after the pass.
    pub main: Option<ConnectionId>,
}

/// Open one connection per `(id, identity)` request, at most `max_in_flight`
/// at a time. Failures are logged and counted, never propagated.
///
/// Results come back in request order.
pub(super) async fn create_batch(
    factory: &ConnectionFactory,
    requests: Vec<(ConnectionId, Identity)>,
    max_in_flight: usize,
    counters: &SharedCounters,
) -> Vec<ManagedConnection> {
    let results: Vec<_> = stream::iter(requests)
        .map(|(id, identity)| async move {
            let result = factory.create(id, &identity).await;
            (id, identity.nickname, result)
        })
        .buffered(max_in_flight.max(1))
        .collect()
        .await;

    results
        .into_iter()
        .filter_map(|(id, nickname, result)| match result {
            Ok(conn) => {
                SharedCounters::bump(&counters.created);
                Some(conn)
            }
            Err(e) => {
                SharedCounters::bump(&counters.creation_failures);
                warn!(connection_id = %id, %nickname, error = %e, "Failed to open connection");
                None
            }
        })
        .collect()
}

impl PoolInner {
    pub(super) fn next_id(&self) -> ConnectionId {
        ConnectionId::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// One maintenance pass over the channel pool.
    ///
    /// 1. evict dead connections
    /// 2. re-select main if it died
    /// 3. close idle connections beyond `backup_count`
    /// 4. open enough new ones to get back to `backup_count` idle (plus a
    ///    main, if there is none)
    ///
    /// Passes are serialized. The set lock is released while new connections
    /// are being opened, so sends keep flowing.
    pub(super) async fn reconcile(&self) -> ReconcileReport {
        let _pass = self.reconcile_lock.lock().await;
        let mut report = ReconcileReport::default();
        if self.is_closed() {
            return report;
        }

        let need = {
            let mut set = lock_or_recover(&self.set);
            report.evicted = evict_dead(&mut set.connections, &self.counters).len();

            if let Some(main) = set.main {
                if !set.connections.iter().any(|c| c.id() == main) {
                    warn!(connection_id = %main, "Main connection died");
                    set.main = None;
                }
            }
            set.elect_main();

            let main = set.main;
            report.trimmed = self.trim_idle(&mut set.connections, main);

            let idle = set.idle_count();
            let missing_main = usize::from(set.main.is_none());
            self.config.backup_count.saturating_sub(idle) + missing_main
        };

        report.requested = need;
        if need > 0 {
            debug!(need, channel = %self.channel, "Replenishing pool");
            let requests = (0..need)
                .map(|_| (self.next_id(), self.identity.clone()))
                .collect();
            let created = create_batch(
                &self.factory,
                requests,
                self.config.max_in_flight,
                &self.counters,
            )
            .await;
            report.created = self.merge(created);
        }

        report.main = lock_or_recover(&self.set).main;
        if report.evicted > 0 || report.trimmed > 0 || report.created > 0 {
            info!(
                channel = %self.channel,
                evicted = report.evicted,
                trimmed = report.trimmed,
                requested = report.requested,
                created = report.created,
                main = ?report.main,
                "Pool reconciled"
            );
        }
        report
    }

    /// Close idle connections beyond `backup_count`, never the main one.
    ///
    /// Connections that were never main go first, newest before oldest.
    fn trim_idle(
        &self,
        connections: &mut Vec<Arc<ManagedConnection>>,
        main: Option<ConnectionId>,
    ) -> usize {
        let mut idle: Vec<&Arc<ManagedConnection>> = connections
            .iter()
            .filter(|c| Some(c.id()) != main && c.is_idle())
            .collect();
        let excess = idle.len().saturating_sub(self.config.backup_count);
        if excess == 0 {
            return 0;
        }

        idle.sort_by_key(|c| (c.was_designated(), std::cmp::Reverse(c.id())));
        let doomed: Vec<ConnectionId> = idle.iter().take(excess).map(|c| c.id()).collect();

        connections.retain(|c| {
            if !doomed.contains(&c.id()) {
                return true;
            }
            debug!(connection_id = %c.id(), "Trimming excess idle connection");
            c.close();
            SharedCounters::bump(&self.counters.trimmed);
            false
        });
        excess
    }

    /// Add freshly opened connections to the set.
    ///
    /// After shutdown the connections are closed instead.
    pub(super) fn merge(&self, created: Vec<ManagedConnection>) -> usize {
        let mut set = lock_or_recover(&self.set);
        if self.is_closed() {
            for conn in created {
                conn.close();
            }
            return 0;
        }
        let count = created.len();
        set.connections.extend(created.into_iter().map(Arc::new));
        set.elect_main();
        count
    }
}
