//! Trait definitions (hexagonal ports). Depend only on domain.
//!
//! Ports are the seams between the connection pools and the outside world.
//! The pools only ever talk to a chat server through these traits, which
//! keeps them testable with in-memory fakes.
//!
//! ```text
//!                    ┌─────────────────────────┐
//!                    │   Connection pools      │
//!                    └────────────┬────────────┘
//!          ┌──────────────────────┼──────────────────────┐
//!          ▼                      ▼                      ▼
//!   ┌─────────────┐        ┌─────────────┐        ┌─────────────┐
//!   │  Directory  │        │  Connector  │        │  Scheduler  │
//!   │ (TMI HTTP)  │        │ (IRC / TCP) │        │   (tokio)   │
//!   └─────────────┘        └─────────────┘        └─────────────┘
//! ```
//!
//! # Available Ports
//!
//! - [`Directory`] - Chat and whisper server lookup
//! - [`Connector`], [`ChatTransport`] - Opening and driving a chat connection
//! - [`Scheduler`] - Deferred and periodic work

pub mod outbound;

pub use outbound::directory::Directory;
pub use outbound::scheduler::{Callback, RepeatingJob, ScheduledTask, Scheduler};
pub use outbound::transport::{ChatTransport, Connector};
