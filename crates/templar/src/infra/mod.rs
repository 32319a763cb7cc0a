//! Infrastructure adapters for configuration, clipboard access, and logging.

pub mod clipboard;
pub mod config;
pub mod logging;
