//! Bot account and server directory configuration.

use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;

use crate::domain::ChannelName;

/// The bot's own chat account and the channel it serves.
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    pub nickname: String,
    /// OAuth token. Overridden by `TWITCH_OAUTH_TOKEN` when set.
    #[serde(default)]
    pub oauth: Option<SecretString>,
    pub channel: ChannelName,
    /// TCP connect plus login timeout, in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Capabilities requested on every connection.
    #[serde(default = "default_capabilities")]
    pub capabilities: Vec<String>,
}

const fn default_connect_timeout_secs() -> u64 {
    15
}

fn default_capabilities() -> Vec<String> {
    vec![
        "twitch.tv/membership".into(),
        "twitch.tv/tags".into(),
        "twitch.tv/commands".into(),
    ]
}

impl BotConfig {
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Server directory (TMI) configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DirectoryConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// HTTP request timeout, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://tmi.twitch.tv".to_string()
}

const fn default_request_timeout_secs() -> u64 {
    10
}

impl DirectoryConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_request_timeout_secs(),
        }
    }
}
