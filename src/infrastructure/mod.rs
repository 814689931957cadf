//! Infrastructure layer.
//!
//! Provides technical concerns that support the application without containing
//! business logic. This layer handles configuration, connection management,
//! and deferred work.
//!
//! # Submodules
//!
//! - [`config`] - Configuration loading and validation
//! - [`pool`] - Channel and whisper connection pools
//! - [`scheduler`] - Tokio-backed scheduler

pub mod config;
pub mod pool;
pub mod scheduler;
