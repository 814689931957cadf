//! Domain identifier types with proper encapsulation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Pool-local connection identifier.
///
/// Assigned monotonically by a pool; never reused within that pool's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Create a connection ID from its raw value.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Twitch channel name - newtype for type safety.
///
/// Stored lowercase without the leading `#`; use [`irc_target`](Self::irc_target)
/// for the form IRC commands expect.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String")]
pub struct ChannelName(String);

impl ChannelName {
    /// Create a channel name, normalizing case and stripping a leading `#`.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self(name.trim().trim_start_matches('#').to_lowercase())
    }

    /// Get the bare channel name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The `#channel` form used as an IRC target.
    #[must_use]
    pub fn irc_target(&self) -> String {
        format!("#{}", self.0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ChannelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ChannelName {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for ChannelName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A `host:port` chat server candidate returned by the directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServerAddr {
    host: String,
    port: u16,
}

impl ServerAddr {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for ServerAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl FromStr for ServerAddr {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (host, port) = s
            .trim()
            .rsplit_once(':')
            .ok_or_else(|| Error::Parse(format!("server address '{s}' has no port")))?;
        if host.is_empty() {
            return Err(Error::Parse(format!("server address '{s}' has no host")));
        }
        let port = port
            .parse::<u16>()
            .map_err(|e| Error::Parse(format!("server address '{s}': {e}")))?;
        Ok(Self::new(host, port))
    }
}
