//! Outbound ports (driven side): interfaces implemented by outbound adapters.

pub mod directory;
pub mod scheduler;
pub mod transport;
