//! Chat transport port.
//!
//! A transport is one authenticated connection to a chat server. The pools
//! treat it as opaque: they only ask whether it is alive and hand it lines
//! to send.

use async_trait::async_trait;

use crate::domain::{ChannelName, Identity, ServerAddr};
use crate::error::Error;

/// A live, authenticated chat connection.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Whether the underlying connection is still up.
    ///
    /// Must reflect the transport's current state; never a cached answer
    /// from connect time.
    fn is_connected(&self) -> bool;

    /// Request protocol capabilities (e.g. `twitch.tv/commands`).
    async fn request_capabilities(&self, capabilities: &[&str]) -> Result<(), Error>;

    /// Join a channel.
    async fn join(&self, channel: &ChannelName) -> Result<(), Error>;

    /// Send `text` to `target` (a `#channel`).
    async fn send(&self, target: &str, text: &str) -> Result<(), Error>;

    /// Terminate the connection. Calling this more than once is a no-op.
    fn close(&self);
}

/// Opens transports.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connect to `addr` and authenticate as `identity`.
    ///
    /// Returns once the server has accepted the login.
    async fn connect(
        &self,
        addr: &ServerAddr,
        identity: &Identity,
    ) -> Result<Box<dyn ChatTransport>, Error>;
}
