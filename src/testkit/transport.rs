//! Mock [`ChatTransport`] and [`Connector`] implementations for testing.
//!
//! - [`MockTransport`] — In-memory transport with an external kill switch.
//!   Records joins, capability requests, closes and sent lines.
//!
//! - [`MockConnector`] — Hands out `MockTransport`s and keeps a handle to
//!   each so tests can inspect or kill them later. All transports from one
//!   connector append to a shared outbox, which gives a global send order.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::domain::{ChannelName, Identity, ServerAddr};
use crate::error::{Error, Result};
use crate::port::{ChatTransport, Connector};

/// One line written through a mock transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentLine {
    pub nickname: String,
    pub target: String,
    pub text: String,
}

#[derive(Default)]
struct TransportState {
    alive: AtomicBool,
    fail_joins: AtomicBool,
    fail_sends: AtomicBool,
    join_count: AtomicU32,
    close_count: AtomicU32,
    joined: Mutex<Vec<String>>,
    capabilities: Mutex<Vec<String>>,
    sent: Mutex<Vec<SentLine>>,
}

// ---------------------------------------------------------------------------
// MockTransport
// ---------------------------------------------------------------------------

/// Cloneable handle to an in-memory transport.
///
/// Clones share state, so a test can keep one clone while the pool owns
/// another.
#[derive(Clone)]
pub struct MockTransport {
    nickname: String,
    state: Arc<TransportState>,
    outbox: Arc<Mutex<Vec<SentLine>>>,
}

impl MockTransport {
    pub fn new(nickname: &str) -> Self {
        Self::with_outbox(nickname, Arc::new(Mutex::new(Vec::new())))
    }

    fn with_outbox(nickname: &str, outbox: Arc<Mutex<Vec<SentLine>>>) -> Self {
        let state = TransportState::default();
        state.alive.store(true, Ordering::SeqCst);
        Self {
            nickname: nickname.to_string(),
            state: Arc::new(state),
            outbox,
        }
    }

    /// Simulate a server-side disconnect.
    pub fn kill(&self) {
        self.state.alive.store(false, Ordering::SeqCst);
    }

    pub fn set_fail_joins(&self, fail: bool) {
        self.state.fail_joins.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_sends(&self, fail: bool) {
        self.state.fail_sends.store(fail, Ordering::SeqCst);
    }

    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    pub fn join_count(&self) -> u32 {
        self.state.join_count.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> u32 {
        self.state.close_count.load(Ordering::SeqCst)
    }

    pub fn joined_channels(&self) -> Vec<String> {
        self.state.joined.lock().clone()
    }

    pub fn capabilities(&self) -> Vec<String> {
        self.state.capabilities.lock().clone()
    }

    /// Lines sent through this transport, oldest first.
    pub fn sent(&self) -> Vec<SentLine> {
        self.state.sent.lock().clone()
    }
}

#[async_trait]
impl ChatTransport for MockTransport {
    fn is_connected(&self) -> bool {
        self.state.alive.load(Ordering::SeqCst)
    }

    async fn request_capabilities(&self, capabilities: &[&str]) -> Result<()> {
        self.state
            .capabilities
            .lock()
            .extend(capabilities.iter().map(|c| c.to_string()));
        Ok(())
    }

    async fn join(&self, channel: &ChannelName) -> Result<()> {
        self.state.join_count.fetch_add(1, Ordering::SeqCst);
        if self.state.fail_joins.load(Ordering::SeqCst) {
            return Err(Error::Connection("join rejected".into()));
        }
        self.state.joined.lock().push(channel.as_str().to_string());
        Ok(())
    }

    async fn send(&self, target: &str, text: &str) -> Result<()> {
        if !self.is_connected() || self.state.fail_sends.load(Ordering::SeqCst) {
            return Err(Error::Connection("transport closed".into()));
        }
        let line = SentLine {
            nickname: self.nickname.clone(),
            target: target.to_string(),
            text: text.to_string(),
        };
        self.state.sent.lock().push(line.clone());
        self.outbox.lock().push(line);
        Ok(())
    }

    fn close(&self) {
        self.state.close_count.fetch_add(1, Ordering::SeqCst);
        self.state.alive.store(false, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// MockConnector
// ---------------------------------------------------------------------------

/// Connector that hands out [`MockTransport`]s.
///
/// `fail_next(2)` makes the next two connect attempts fail.
pub struct MockConnector {
    transports: Mutex<Vec<MockTransport>>,
    servers: Mutex<Vec<ServerAddr>>,
    pending_failures: AtomicU32,
    connect_count: AtomicU32,
    fail_joins: AtomicBool,
    outbox: Arc<Mutex<Vec<SentLine>>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self {
            transports: Mutex::new(Vec::new()),
            servers: Mutex::new(Vec::new()),
            pending_failures: AtomicU32::new(0),
            connect_count: AtomicU32::new(0),
            fail_joins: AtomicBool::new(false),
            outbox: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Make the next `n` connect attempts fail.
    pub fn fail_next(&self, n: u32) {
        self.pending_failures.fetch_add(n, Ordering::SeqCst);
    }

    /// Make joins on transports created from now on fail.
    pub fn fail_joins(&self, fail: bool) {
        self.fail_joins.store(fail, Ordering::SeqCst);
    }

    /// Connect attempts so far, failed ones included.
    pub fn connect_count(&self) -> u32 {
        self.connect_count.load(Ordering::SeqCst)
    }

    /// Transports created so far, in creation order.
    pub fn transports(&self) -> Vec<MockTransport> {
        self.transports.lock().clone()
    }

    /// The `index`-th transport created.
    ///
    /// # Panics
    ///
    /// Panics if fewer transports exist.
    pub fn transport(&self, index: usize) -> MockTransport {
        self.transports.lock()[index].clone()
    }

    /// Servers connected to, in order.
    pub fn servers(&self) -> Vec<ServerAddr> {
        self.servers.lock().clone()
    }

    /// Every line sent by any transport from this connector, in send order.
    pub fn outbox(&self) -> Vec<SentLine> {
        self.outbox.lock().clone()
    }
}

impl Default for MockConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(
        &self,
        addr: &ServerAddr,
        identity: &Identity,
    ) -> Result<Box<dyn ChatTransport>> {
        self.connect_count.fetch_add(1, Ordering::SeqCst);
        let scripted_failure = self
            .pending_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if scripted_failure {
            return Err(Error::Connection(format!("connection to {addr} refused")));
        }
        let transport = MockTransport::with_outbox(&identity.nickname, Arc::clone(&self.outbox));
        transport.set_fail_joins(self.fail_joins.load(Ordering::SeqCst));
        self.servers.lock().push(addr.clone());
        self.transports.lock().push(transport.clone());
        Ok(Box::new(transport))
    }
}
