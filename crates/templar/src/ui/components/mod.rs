//! Collection of reusable TUI components.

pub mod command_palette;
pub mod editor;
pub mod parameters;
pub mod popup;
