//! Connection factory: directory lookup plus transport handshake.

use std::sync::Arc;

use parking_lot::RwLock;
use rand::seq::SliceRandom;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use super::connection::{ManagedConnection, RateLimit};
use crate::domain::{ChannelName, ConnectionId, Identity, ServerAddr};
use crate::error::{Error, PoolError, Result};
use crate::port::{Connector, Directory, Scheduler};

/// What the factory's connections are for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionTarget {
    /// Chat connections that join one channel.
    Channel(ChannelName),
    /// Whisper cluster connections; they join nothing.
    Whispers,
}

impl std::fmt::Display for ConnectionTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Channel(channel) => write!(f, "#{channel}"),
            Self::Whispers => write!(f, "whisper cluster"),
        }
    }
}

/// External collaborators a pool needs.
#[derive(Clone)]
pub struct PoolDeps {
    pub directory: Arc<dyn Directory>,
    pub connector: Arc<dyn Connector>,
    pub scheduler: Arc<dyn Scheduler>,
}

/// Produces fully joined [`ManagedConnection`]s.
///
/// Failures are returned, never retried here; the pool's maintenance tick
/// is the retry loop.
pub struct ConnectionFactory {
    deps: PoolDeps,
    target: ConnectionTarget,
    rate: RateLimit,
    capabilities: Vec<String>,
    cached_servers: Option<RwLock<Vec<ServerAddr>>>,
    capacity_signal: Option<Arc<Notify>>,
}

impl ConnectionFactory {
    pub fn new(deps: PoolDeps, target: ConnectionTarget, rate: RateLimit) -> Self {
        Self {
            deps,
            target,
            rate,
            capabilities: Vec::new(),
            cached_servers: None,
            capacity_signal: None,
        }
    }

    /// Capabilities requested on every new connection.
    #[must_use]
    pub fn with_capabilities(mut self, capabilities: Vec<String>) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Serve addresses from a list refreshed by
    /// [`refresh_servers`](Self::refresh_servers) instead of a lookup per
    /// connection.
    #[must_use]
    pub fn with_cached_servers(mut self) -> Self {
        self.cached_servers = Some(RwLock::new(Vec::new()));
        self
    }

    /// Notified whenever a connection made by this factory frees a send slot.
    #[must_use]
    pub fn with_capacity_signal(mut self, signal: Arc<Notify>) -> Self {
        self.capacity_signal = Some(signal);
        self
    }

    #[must_use]
    pub fn target(&self) -> &ConnectionTarget {
        &self.target
    }

    #[must_use]
    pub fn rate_limit(&self) -> RateLimit {
        self.rate
    }

    pub(super) fn scheduler(&self) -> &Arc<dyn Scheduler> {
        &self.deps.scheduler
    }

    /// Number of addresses in the cached list (zero when not caching).
    #[must_use]
    pub fn cached_server_count(&self) -> usize {
        self.cached_servers.as_ref().map_or(0, |s| s.read().len())
    }

    /// Re-query the directory and replace the cached address list.
    ///
    /// An empty or failed lookup keeps the previous list.
    ///
    /// # Errors
    ///
    /// Returns the lookup error, or `DirectoryUnavailable` for an empty
    /// answer.
    pub async fn refresh_servers(&self) -> Result<usize> {
        let Some(cache) = &self.cached_servers else {
            return Ok(0);
        };
        let servers = self.lookup().await?;
        if servers.is_empty() {
            return Err(self.unavailable());
        }
        let count = servers.len();
        *cache.write() = servers;
        info!(target_kind = %self.target, servers = count, "Server list refreshed");
        Ok(count)
    }

    /// Open, authenticate and join a new connection as `identity`.
    ///
    /// # Errors
    ///
    /// - [`PoolError::DirectoryUnavailable`] when no server address is known
    /// - [`PoolError::HandshakeFailed`] when connecting, capability
    ///   negotiation or the join fails
    pub async fn create(&self, id: ConnectionId, identity: &Identity) -> Result<ManagedConnection> {
        let candidates = self.candidates().await?;
        let server = candidates
            .choose(&mut rand::thread_rng())
            .cloned()
            .ok_or_else(|| self.unavailable())?;

        debug!(
            connection_id = %id,
            server = %server,
            nickname = %identity.nickname,
            "Opening connection"
        );

        let transport = self
            .deps
            .connector
            .connect(&server, identity)
            .await
            .map_err(|e| handshake_failed(&server, &e))?;

        let connection = ManagedConnection::new(
            id,
            identity.nickname.clone(),
            server.clone(),
            transport,
            self.rate,
            Arc::clone(&self.deps.scheduler),
            self.capacity_signal.clone(),
        );

        let capabilities: Vec<&str> = self.capabilities.iter().map(String::as_str).collect();
        let channel = match &self.target {
            ConnectionTarget::Channel(channel) => Some(channel),
            ConnectionTarget::Whispers => None,
        };
        let handshake = async {
            connection.request_capabilities(&capabilities).await?;
            connection.join(channel).await
        };
        if let Err(e) = handshake.await {
            connection.close();
            return Err(handshake_failed(&server, &e));
        }

        info!(
            connection_id = %id,
            server = %server,
            nickname = %identity.nickname,
            target_kind = %self.target,
            "Connection ready"
        );
        Ok(connection)
    }

    async fn candidates(&self) -> Result<Vec<ServerAddr>> {
        if let Some(cache) = &self.cached_servers {
            let cached = cache.read().clone();
            if !cached.is_empty() {
                return Ok(cached);
            }
            warn!(target_kind = %self.target, "Server cache empty, falling back to lookup");
        }
        let servers = self.lookup().await?;
        if servers.is_empty() {
            return Err(self.unavailable());
        }
        Ok(servers)
    }

    async fn lookup(&self) -> Result<Vec<ServerAddr>> {
        let result = match &self.target {
            ConnectionTarget::Channel(channel) => self.deps.directory.chat_servers(channel).await,
            ConnectionTarget::Whispers => self.deps.directory.whisper_servers().await,
        };
        result.map_err(|e| {
            warn!(target_kind = %self.target, error = %e, "Directory lookup failed");
            self.unavailable()
        })
    }

    fn unavailable(&self) -> Error {
        PoolError::DirectoryUnavailable {
            target: self.target.to_string(),
        }
        .into()
    }
}

fn handshake_failed(server: &ServerAddr, cause: &Error) -> Error {
    PoolError::HandshakeFailed {
        server: server.to_string(),
        reason: cause.to_string(),
    }
    .into()
}
