//! Application layer: the chat client facade and the long-running bot loop.

mod client;
mod orchestrator;

pub use client::{ChatClient, ClientStats};
pub use orchestrator::App;
