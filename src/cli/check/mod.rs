//! Configuration and directory diagnostics.

mod config;
mod directory;

pub use config::execute_config;
pub use directory::execute_directory;
