//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`transport`] — `MockTransport` and `MockConnector`.
//! - [`directory`] — `StaticDirectory` with switchable server lists.
//! - [`scheduler`] — `ManualScheduler`, a virtual-clock scheduler.
//! - [`config`] — Canonical pool configurations.

use std::sync::Arc;

use crate::domain::Identity;
use crate::infrastructure::pool::PoolDeps;

pub mod config;
pub mod directory;
pub mod scheduler;
pub mod transport;

/// Identity with a dummy token.
pub fn identity(nickname: &str) -> Identity {
    Identity::new(nickname, "oauth:test")
}

/// Bundle concrete fakes into [`PoolDeps`].
pub fn deps(
    directory: Arc<directory::StaticDirectory>,
    connector: Arc<transport::MockConnector>,
    scheduler: Arc<scheduler::ManualScheduler>,
) -> PoolDeps {
    PoolDeps {
        directory,
        connector,
        scheduler,
    }
}
