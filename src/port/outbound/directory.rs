//! Chat server directory port.

use async_trait::async_trait;

use crate::domain::{ChannelName, ServerAddr};
use crate::error::Error;

/// Upstream lookup of candidate chat servers.
///
/// An empty list means "temporarily unavailable", not a failure; callers
/// decide whether that is fatal. Results are not stable between calls.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Candidate servers for a channel's chat.
    async fn chat_servers(&self, channel: &ChannelName) -> Result<Vec<ServerAddr>, Error>;

    /// Candidate servers for the whisper cluster.
    async fn whisper_servers(&self) -> Result<Vec<ServerAddr>, Error>;
}
