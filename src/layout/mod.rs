//! Resizable Grid Layout (spec component F).

pub mod grid;
pub mod splitter;

pub use grid::{compute_layout, PaneArena, PaneSlot, Rect, MIN_PANE_HEIGHT, MIN_PANE_WIDTH};
pub use splitter::{Axis, Splitter};
