//! In-memory [`Directory`] with switchable answers.

use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::domain::{ChannelName, ServerAddr};
use crate::error::{Error, Result};
use crate::port::Directory;

/// Directory returning fixed server lists.
///
/// Lists can be swapped at any time to simulate outages (empty list) or
/// errors (`set_failing(true)`).
pub struct StaticDirectory {
    chat: Mutex<Vec<ServerAddr>>,
    whisper: Mutex<Vec<ServerAddr>>,
    failing: Mutex<bool>,
    chat_lookups: AtomicU32,
    whisper_lookups: AtomicU32,
}

impl StaticDirectory {
    /// `n` chat servers and `n` whisper servers.
    pub fn with_servers(n: u16) -> Self {
        Self {
            chat: Mutex::new(servers("irc", n)),
            whisper: Mutex::new(servers("group", n)),
            failing: Mutex::new(false),
            chat_lookups: AtomicU32::new(0),
            whisper_lookups: AtomicU32::new(0),
        }
    }

    pub fn set_chat_servers(&self, list: Vec<ServerAddr>) {
        *self.chat.lock() = list;
    }

    pub fn set_whisper_servers(&self, list: Vec<ServerAddr>) {
        *self.whisper.lock() = list;
    }

    /// Make every lookup return an error.
    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock() = failing;
    }

    pub fn chat_lookups(&self) -> u32 {
        self.chat_lookups.load(Ordering::SeqCst)
    }

    pub fn whisper_lookups(&self) -> u32 {
        self.whisper_lookups.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<()> {
        if *self.failing.lock() {
            return Err(Error::Connection("directory unreachable".into()));
        }
        Ok(())
    }
}

/// `n` distinct addresses named `{prefix}-{i}.test:6667`.
pub fn servers(prefix: &str, n: u16) -> Vec<ServerAddr> {
    (0..n)
        .map(|i| ServerAddr::new(format!("{prefix}-{i}.test"), 6667))
        .collect()
}

#[async_trait]
impl Directory for StaticDirectory {
    async fn chat_servers(&self, _channel: &ChannelName) -> Result<Vec<ServerAddr>> {
        self.chat_lookups.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self.chat.lock().clone())
    }

    async fn whisper_servers(&self) -> Result<Vec<ServerAddr>> {
        self.whisper_lookups.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self.whisper.lock().clone())
    }
}
