//! Chat client facade over the channel and whisper pools.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::adapter::outbound::twitch::{IrcConnector, TmiDirectory};
use crate::domain::ChannelName;
use crate::error::{ConfigError, Result};
use crate::infrastructure::config::settings::Config;
use crate::infrastructure::pool::{ConnectionPool, PoolDeps, PoolStats, WhisperConnectionPool};
use crate::infrastructure::scheduler::TokioScheduler;

/// Everything the bot says goes through here.
///
/// Owns the channel pool and, when enabled, the whisper pool. Handed around
/// as `Arc<ChatClient>`; there is no global instance.
pub struct ChatClient {
    chat: ConnectionPool,
    whispers: Option<WhisperConnectionPool>,
    started_at: DateTime<Utc>,
}

/// Snapshot of both pools.
#[derive(Debug, Clone)]
pub struct ClientStats {
    pub chat: PoolStats,
    pub whisper: Option<PoolStats>,
    pub uptime_secs: i64,
}

impl ChatClient {
    /// Build production dependencies (TMI directory, IRC connector, tokio
    /// scheduler) and start the pools.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory client cannot be built or either
    /// pool fails to start.
    pub async fn connect(config: &Config) -> Result<Arc<Self>> {
        let deps = PoolDeps {
            directory: Arc::new(TmiDirectory::from_config(&config.directory)?),
            connector: Arc::new(IrcConnector::from_config(&config.bot)),
            scheduler: Arc::new(TokioScheduler::current()),
        };
        Self::start(config, deps).await.map(Arc::new)
    }

    /// Start the pools with the given dependencies.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is unusable or a pool cannot
    /// open any connection.
    pub async fn start(config: &Config, deps: PoolDeps) -> Result<Self> {
        let chat = ConnectionPool::new(
            config.pool.clone(),
            config.bot.channel.clone(),
            config.identity()?,
            config.bot.capabilities.clone(),
            deps.clone(),
        )?;
        chat.start().await?;

        let whispers = if config.whisper.enabled {
            let pool = WhisperConnectionPool::new(
                config.whisper.clone(),
                config.bot.capabilities.clone(),
                deps,
            )?;
            pool.start().await?;
            Some(pool)
        } else {
            None
        };

        info!(
            channel = %config.bot.channel,
            whispers = whispers.is_some(),
            "Chat client ready"
        );
        Ok(Self {
            chat,
            whispers,
            started_at: Utc::now(),
        })
    }

    #[must_use]
    pub fn channel(&self) -> &ChannelName {
        self.chat.channel()
    }

    #[must_use]
    pub fn chat(&self) -> &ConnectionPool {
        &self.chat
    }

    /// # Errors
    ///
    /// Fails when the message is dropped; see [`ConnectionPool::send`].
    pub async fn say(&self, message: &str) -> Result<()> {
        self.chat.say(message).await
    }

    /// # Errors
    ///
    /// Fails when the message is dropped; see [`ConnectionPool::send`].
    pub async fn me(&self, message: &str) -> Result<()> {
        self.chat.me(message).await
    }

    /// # Errors
    ///
    /// Fails when the command is dropped; see [`ConnectionPool::send`].
    pub async fn timeout(&self, user: &str, seconds: u32, reason: Option<&str>) -> Result<()> {
        self.chat.timeout(user, seconds, reason).await
    }

    /// # Errors
    ///
    /// Fails when the command is dropped; see [`ConnectionPool::send`].
    pub async fn ban(&self, user: &str, reason: Option<&str>) -> Result<()> {
        self.chat.ban(user, reason).await
    }

    /// # Errors
    ///
    /// Fails when the command is dropped; see [`ConnectionPool::send`].
    pub async fn unban(&self, user: &str) -> Result<()> {
        self.chat.unban(user).await
    }

    /// # Errors
    ///
    /// Fails when the command is dropped; see [`ConnectionPool::send`].
    pub async fn delete_message(&self, message_id: &str) -> Result<()> {
        self.chat.delete_message(message_id).await
    }

    /// Queue a whisper.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for `whisper.enabled` when the
    /// whisper pool is off, or `PoolClosed` after shutdown.
    pub fn whisper(&self, target: &str, message: &str) -> Result<()> {
        let pool = self.whispers.as_ref().ok_or(ConfigError::InvalidValue {
            field: "whisper.enabled",
            reason: "whispers are disabled".to_string(),
        })?;
        pool.enqueue_whisper(target, message)
    }

    #[must_use]
    pub fn stats(&self) -> ClientStats {
        ClientStats {
            chat: self.chat.stats(),
            whisper: self.whispers.as_ref().map(WhisperConnectionPool::stats),
            uptime_secs: (Utc::now() - self.started_at).num_seconds(),
        }
    }

    /// Shut both pools down. Idempotent.
    pub fn shutdown(&self) {
        self.chat.shutdown();
        if let Some(whispers) = &self.whispers {
            whispers.shutdown();
        }
    }
}
