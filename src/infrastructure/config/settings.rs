//! Application configuration loading and validation.
//!
//! Provides the main [`Config`] struct that aggregates all settings. Loaded
//! from a TOML file; the bot's OAuth token may instead come from the
//! `TWITCH_OAUTH_TOKEN` environment variable (a `.env` file is honored).
//!
//! # Example
//!
//! ```no_run
//! use tyggbot::infrastructure::config::settings::Config;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("config.toml")?;
//!     config.init_logging();
//!     Ok(())
//! }
//! ```

use std::path::Path;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::bot::{BotConfig, DirectoryConfig};
use super::logging::LoggingConfig;
use super::pool::{ChatPoolConfig, WhisperPoolConfig};
use crate::domain::Identity;
use crate::error::{ConfigError, Result};

/// Environment variable holding the bot account's OAuth token.
pub const OAUTH_ENV_VAR: &str = "TWITCH_OAUTH_TOKEN";

/// Main application configuration.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Bot account and target channel.
    pub bot: BotConfig,

    /// Logging and tracing configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Channel connection pool.
    #[serde(default)]
    pub pool: ChatPoolConfig,

    /// Whisper connection pool and its account roster.
    #[serde(default)]
    pub whisper: WhisperPoolConfig,

    /// Server directory lookup.
    #[serde(default)]
    pub directory: DirectoryConfig,
}

impl Config {
    /// Parse configuration from TOML content, applying process environment
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or validation fails.
    pub fn parse_toml(content: &str) -> Result<Self> {
        Self::parse_toml_with_env(content, |key| std::env::var(key).ok())
    }

    /// Parse configuration from TOML content with an explicit environment
    /// lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or validation fails.
    pub fn parse_toml_with_env<F>(content: &str, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;

        if let Some(token) = env(OAUTH_ENV_VAR).filter(|t| !t.trim().is_empty()) {
            config.bot.oauth = Some(SecretString::from(token));
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read
    /// - The TOML content is malformed
    /// - Validation fails
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse_toml(&content)
    }

    /// Initialize logging based on configuration.
    pub fn init_logging(&self) {
        self.logging.init();
    }

    /// The bot's own chat identity.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when no OAuth token is configured.
    pub fn identity(&self) -> Result<Identity> {
        let oauth = self
            .bot
            .oauth
            .as_ref()
            .ok_or(ConfigError::MissingField { field: "bot.oauth" })?;
        Ok(Identity::new(
            self.bot.nickname.clone(),
            oauth.expose_secret().to_string(),
        ))
    }

    fn validate(&self) -> Result<()> {
        let invalid = |field: &'static str, reason: &str| -> crate::error::Error {
            ConfigError::InvalidValue {
                field,
                reason: reason.to_string(),
            }
            .into()
        };

        if self.bot.nickname.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "bot.nickname",
            }
            .into());
        }
        if self.bot.channel.is_empty() {
            return Err(ConfigError::MissingField {
                field: "bot.channel",
            }
            .into());
        }
        if self.identity()?.has_empty_credential() {
            return Err(invalid("bot.oauth", "must not be empty"));
        }
        if self.bot.connect_timeout_secs == 0 {
            return Err(invalid("bot.connect_timeout_secs", "must be > 0"));
        }

        if self.pool.rate_limit == 0 {
            return Err(invalid("pool.rate_limit", "must be > 0"));
        }
        if self.pool.rate_window_secs == 0 {
            return Err(invalid("pool.rate_window_secs", "must be > 0"));
        }
        if self.pool.reconcile_interval_secs == 0 {
            return Err(invalid("pool.reconcile_interval_secs", "must be > 0"));
        }
        if self.pool.max_in_flight == 0 {
            return Err(invalid("pool.max_in_flight", "must be > 0"));
        }

        if self.whisper.enabled {
            if self.whisper.accounts.is_empty() {
                return Err(invalid(
                    "whisper.accounts",
                    "at least one account is required when whispers are enabled",
                ));
            }
            if let Some(account) = self
                .whisper
                .accounts
                .iter()
                .find(|a| a.nickname.trim().is_empty() || a.has_empty_credential())
            {
                return Err(invalid(
                    "whisper.accounts",
                    &format!("account '{}' needs a nickname and oauth", account.nickname),
                ));
            }
            if self.whisper.rate_limit == 0 {
                return Err(invalid("whisper.rate_limit", "must be > 0"));
            }
            if self.whisper.rate_window_secs == 0 {
                return Err(invalid("whisper.rate_window_secs", "must be > 0"));
            }
            if self.whisper.reconcile_interval_secs == 0 {
                return Err(invalid("whisper.reconcile_interval_secs", "must be > 0"));
            }
            if self.whisper.server_refresh_secs == 0 {
                return Err(invalid("whisper.server_refresh_secs", "must be > 0"));
            }
            if self.whisper.max_accounts == 0 {
                return Err(invalid("whisper.max_accounts", "must be > 0"));
            }
            if self.whisper.max_in_flight == 0 {
                return Err(invalid("whisper.max_in_flight", "must be > 0"));
            }
        }

        url::Url::parse(&self.directory.base_url)
            .map_err(|e| invalid("directory.base_url", &e.to_string()))?;
        if self.directory.timeout_secs == 0 {
            return Err(invalid("directory.timeout_secs", "must be > 0"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    const MINIMAL: &str = r##"
[bot]
nickname = "tyggbot"
oauth = "oauth:abc123"
channel = "#Pajlada"
"##;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let config = Config::parse_toml_with_env(MINIMAL, no_env).unwrap();
        assert_eq!(config.bot.channel.as_str(), "pajlada");
        assert_eq!(config.pool.backup_count, 2);
        assert_eq!(config.pool.rate_limit, 90);
        assert_eq!(config.pool.rate_window_secs, 30);
        assert_eq!(config.pool.reconcile_interval_secs, 4);
        assert!(!config.whisper.enabled);
        assert_eq!(config.whisper.rate_limit, 3);
        assert_eq!(config.whisper.rate_window_secs, 3);
        assert_eq!(config.whisper.max_accounts, 10);
        assert_eq!(config.directory.base_url, "https://tmi.twitch.tv");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn env_token_overrides_file() {
        let config = Config::parse_toml_with_env(MINIMAL, |key| {
            (key == OAUTH_ENV_VAR).then(|| "fromenv".to_string())
        })
        .unwrap();
        assert_eq!(config.identity().unwrap().pass_token(), "oauth:fromenv");
    }

    #[test]
    fn missing_oauth_is_rejected() {
        let toml = r#"
[bot]
nickname = "tyggbot"
channel = "pajlada"
"#;
        match Config::parse_toml_with_env(toml, no_env) {
            Err(Error::Config(ConfigError::MissingField { field: "bot.oauth" })) => {}
            other => panic!("expected missing oauth, got {other:?}"),
        }
    }

    #[test]
    fn zero_rate_limit_is_rejected() {
        let toml = format!("{MINIMAL}\n[pool]\nrate_limit = 0\n");
        match Config::parse_toml_with_env(&toml, no_env) {
            Err(Error::Config(ConfigError::InvalidValue {
                field: "pool.rate_limit",
                ..
            })) => {}
            other => panic!("expected invalid rate limit, got {other:?}"),
        }
    }

    #[test]
    fn enabled_whisper_requires_accounts() {
        let toml = format!("{MINIMAL}\n[whisper]\nenabled = true\n");
        assert!(Config::parse_toml_with_env(&toml, no_env).is_err());
    }

    #[test]
    fn whisper_roster_is_capped() {
        let mut toml = format!("{MINIMAL}\n[whisper]\nenabled = true\nmax_accounts = 2\n");
        for i in 0..4 {
            toml.push_str(&format!(
                "\n[[whisper.accounts]]\nnickname = \"whisperer{i}\"\noauth = \"tok{i}\"\n"
            ));
        }
        let config = Config::parse_toml_with_env(&toml, no_env).unwrap();
        let roster = config.whisper.roster();
        assert_eq!(roster.len(), 2);
        assert_eq!(roster[0].nickname, "whisperer0");
        assert_eq!(roster[1].nickname, "whisperer1");
    }

    #[test]
    fn bad_directory_url_is_rejected() {
        let toml = format!("{MINIMAL}\n[directory]\nbase_url = \"not a url\"\n");
        assert!(Config::parse_toml_with_env(&toml, no_env).is_err());
    }
}
