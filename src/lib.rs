//! Tyggbot - rate-limited Twitch chat and whisper connection pools.
//!
//! The bot talks to Twitch chat over a rotating set of IRC connections.
//! Each connection may only carry so many messages per rate window, so
//! outbound traffic is routed through whichever connection has headroom
//! while a maintenance tick replaces dead connections and keeps idle
//! backups ready.
//!
//! # Modules
//!
//! - [`domain`] - Identifiers, identities and outbound payloads
//! - [`port`] - Directory, transport and scheduler traits
//! - [`infrastructure::pool`] - `ConnectionPool` and `WhisperConnectionPool`
//! - [`infrastructure::config`] - TOML configuration and logging setup
//! - [`adapter`] - IRC transport and TMI directory
//! - [`app`] - `ChatClient` facade and the bot loop
//! - [`cli`] - Command-line interface
//!
//! # Example
//!
//! ```no_run
//! use tyggbot::app::ChatClient;
//! use tyggbot::infrastructure::config::settings::Config;
//!
//! # async fn demo() -> tyggbot::error::Result<()> {
//! let config = Config::load("config.toml")?;
//! let client = ChatClient::connect(&config).await?;
//! client.say("hello chat").await?;
//! client.whisper("pajlada", "psst")?;
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod app;
pub mod cli;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod port;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
