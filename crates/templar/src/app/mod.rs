//! Application layer: the parameter store and everything derived from it.

pub mod diff;
pub mod export;
pub mod render;
pub mod store;
pub mod template;
