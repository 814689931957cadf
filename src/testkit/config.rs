//! Canonical test configurations.
//!
//! Single source of truth for config structs used across tests.

use crate::infrastructure::config::pool::{ChatPoolConfig, WhisperPoolConfig};

/// Channel pool config with the given backup count and rate limit.
///
/// 30 second window, 4 second maintenance tick.
pub fn chat_pool(backup_count: usize, rate_limit: u32) -> ChatPoolConfig {
    ChatPoolConfig {
        backup_count,
        rate_limit,
        rate_window_secs: 30,
        reconcile_interval_secs: 4,
        max_in_flight: 4,
    }
}

/// Whisper pool config with `accounts` roster entries named
/// `whisperer0`, `whisperer1`, ...
pub fn whisper_pool(accounts: usize, rate_limit: u32) -> WhisperPoolConfig {
    WhisperPoolConfig {
        enabled: true,
        rate_limit,
        rate_window_secs: 3,
        reconcile_interval_secs: 4,
        server_refresh_secs: 3600,
        max_accounts: 10,
        max_in_flight: 4,
        accounts: (0..accounts)
            .map(|i| super::identity(&format!("whisperer{i}")))
            .collect(),
    }
}
