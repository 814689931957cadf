//! Outbound adapters (driven side).

pub mod twitch;
