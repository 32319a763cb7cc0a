//! Core domain types shared by the store, renderer, and generator.

pub mod color;
pub mod errors;
pub mod model;
pub mod position;
