//! Long-running bot loop.

use std::time::Duration;

use tracing::info;

use super::client::ChatClient;
use crate::error::Result;
use crate::infrastructure::config::settings::Config;

const STATS_INTERVAL: Duration = Duration::from_secs(60);

/// Main application entry point.
pub struct App;

impl App {
    /// Start the pools and log their statistics once a minute. Runs until
    /// the future is dropped; callers race it against a shutdown signal.
    ///
    /// # Errors
    ///
    /// Returns an error if the pools cannot be started.
    pub async fn run(config: Config) -> Result<()> {
        info!(channel = %config.bot.channel, "Starting tyggbot");
        let client = ChatClient::connect(&config).await?;

        let mut ticker = tokio::time::interval(STATS_INTERVAL);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let stats = client.stats();
            info!(
                uptime_secs = stats.uptime_secs,
                connections = stats.chat.connections,
                idle = stats.chat.idle,
                usable = stats.chat.usable,
                sent = stats.chat.messages_sent,
                dropped = stats.chat.messages_dropped,
                "Chat pool stats"
            );
            if let Some(whisper) = stats.whisper {
                info!(
                    connections = whisper.connections,
                    usable = whisper.usable,
                    queued = whisper.queued,
                    sent = whisper.messages_sent,
                    "Whisper pool stats"
                );
            }
        }
    }
}
