//! Infrastructure configuration modules.

pub mod bot;
pub mod logging;
pub mod pool;
pub mod settings;
