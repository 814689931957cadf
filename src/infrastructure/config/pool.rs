//! Chat and whisper pool configuration.

use std::time::Duration;

use serde::Deserialize;

use crate::domain::Identity;

/// Channel connection pool configuration.
///
/// Twitch allows 20 messages per 30 seconds for regular accounts and 100 for
/// moderators. The default rate limit assumes a moderator account.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatPoolConfig {
    /// Idle connections to keep ready beyond the active one.
    #[serde(default = "default_backup_count")]
    pub backup_count: usize,
    /// Messages per connection per rate window.
    #[serde(default = "default_chat_rate_limit")]
    pub rate_limit: u32,
    /// Length of the rate window in seconds.
    #[serde(default = "default_chat_rate_window_secs")]
    pub rate_window_secs: u64,
    /// Maintenance tick interval in seconds.
    #[serde(default = "default_reconcile_interval_secs")]
    pub reconcile_interval_secs: u64,
    /// Maximum concurrent connection attempts per maintenance tick.
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
}

const fn default_backup_count() -> usize {
    2
}

const fn default_chat_rate_limit() -> u32 {
    90
}

const fn default_chat_rate_window_secs() -> u64 {
    30
}

const fn default_reconcile_interval_secs() -> u64 {
    4
}

const fn default_max_in_flight() -> usize {
    4
}

impl ChatPoolConfig {
    #[must_use]
    pub fn rate_window(&self) -> Duration {
        Duration::from_secs(self.rate_window_secs)
    }

    #[must_use]
    pub fn reconcile_interval(&self) -> Duration {
        Duration::from_secs(self.reconcile_interval_secs)
    }
}

impl Default for ChatPoolConfig {
    fn default() -> Self {
        Self {
            backup_count: default_backup_count(),
            rate_limit: default_chat_rate_limit(),
            rate_window_secs: default_chat_rate_window_secs(),
            reconcile_interval_secs: default_reconcile_interval_secs(),
            max_in_flight: default_max_in_flight(),
        }
    }
}

/// Whisper connection pool configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WhisperPoolConfig {
    /// Start the whisper pool at all.
    #[serde(default)]
    pub enabled: bool,
    /// Whispers per connection per rate window.
    #[serde(default = "default_whisper_rate_limit")]
    pub rate_limit: u32,
    /// Length of the rate window in seconds.
    #[serde(default = "default_whisper_rate_window_secs")]
    pub rate_window_secs: u64,
    /// Maintenance tick interval in seconds.
    #[serde(default = "default_reconcile_interval_secs")]
    pub reconcile_interval_secs: u64,
    /// How often the whisper server list is refreshed, in seconds.
    #[serde(default = "default_server_refresh_secs")]
    pub server_refresh_secs: u64,
    /// Roster entries beyond this count are ignored.
    #[serde(default = "default_max_accounts")]
    pub max_accounts: usize,
    /// Maximum concurrent connection attempts per maintenance tick.
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
    /// Whisper-capable accounts, one connection each.
    #[serde(default)]
    pub accounts: Vec<Identity>,
}

const fn default_whisper_rate_limit() -> u32 {
    3
}

const fn default_whisper_rate_window_secs() -> u64 {
    3
}

const fn default_server_refresh_secs() -> u64 {
    3600 // 1 hour
}

const fn default_max_accounts() -> usize {
    10
}

impl WhisperPoolConfig {
    #[must_use]
    pub fn rate_window(&self) -> Duration {
        Duration::from_secs(self.rate_window_secs)
    }

    #[must_use]
    pub fn reconcile_interval(&self) -> Duration {
        Duration::from_secs(self.reconcile_interval_secs)
    }

    #[must_use]
    pub fn server_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.server_refresh_secs)
    }

    /// The roster actually used: configured accounts capped at `max_accounts`.
    #[must_use]
    pub fn roster(&self) -> Vec<Identity> {
        self.accounts
            .iter()
            .take(self.max_accounts)
            .cloned()
            .collect()
    }
}

impl Default for WhisperPoolConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            rate_limit: default_whisper_rate_limit(),
            rate_window_secs: default_whisper_rate_window_secs(),
            reconcile_interval_secs: default_reconcile_interval_secs(),
            server_refresh_secs: default_server_refresh_secs(),
            max_accounts: default_max_accounts(),
            max_in_flight: default_max_in_flight(),
            accounts: Vec::new(),
        }
    }
}
