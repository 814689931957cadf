//! Domain types shared by the pools and their adapters.

pub mod id;
pub mod identity;
pub mod message;

pub use id::{ChannelName, ConnectionId, ServerAddr};
pub use identity::Identity;
pub use message::{ChatCommand, Whisper};
