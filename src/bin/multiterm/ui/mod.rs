//! Top-level frame layout: the pane grid plus a one-line status bar.

mod grid_widget;
mod pane_widget;
mod status_bar;

use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::Frame;

use crate::app::App;

pub fn draw(frame: &mut Frame<'_>, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(frame.area());

    grid_widget::render(frame, app, chunks[0]);
    status_bar::render(frame, app, chunks[1]);
}
