//! Session Pane Controller (spec component E).

pub mod controller;
pub mod history;

pub use controller::{InputAction, InputLineMode, PaneController, SLASH_COMMANDS};
pub use history::CommandHistory;
