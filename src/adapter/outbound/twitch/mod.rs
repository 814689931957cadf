//! Twitch chat adapters.
//!
//! - [`IrcConnector`] / [`IrcTransport`] - Plain IRC over TCP against TMI
//! - [`TmiDirectory`] - Chat and whisper server lookup over HTTP

pub mod directory;
pub mod irc;
mod line;

pub use directory::TmiDirectory;
pub use irc::{IrcConnector, IrcTransport};
