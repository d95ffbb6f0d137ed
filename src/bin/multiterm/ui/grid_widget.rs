//! Lays out every live session's pane across the grid area (spec §4.F).

use ratatui::layout::Rect as UiRect;
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use multiterm::input::Mode;
use multiterm::layout::{compute_layout, Rect};

use super::pane_widget;
use crate::app::App;

pub fn render(frame: &mut Frame<'_>, app: &App, area: UiRect) {
    if app.session_order.is_empty() {
        frame.render_widget(Paragraph::new("no sessions — Ctrl-B n to start one"), area);
        return;
    }

    let region = Rect {
        x: area.x,
        y: area.y,
        width: area.width,
        height: area.height,
    };
    let rects = compute_layout(app.panes.len(), region);

    for (arena_index, rect) in rects.iter().enumerate() {
        let Some(slot) = app.panes.slot(arena_index) else {
            continue;
        };
        let Some(id) = app.session_order.get(slot.session_index) else {
            continue;
        };
        let ui_rect = UiRect {
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
        };
        let focused = slot.session_index == app.active_pane;
        let input_text = if focused && matches!(app.mode.current(), Mode::Insert) {
            app.controllers.get(id).map(|c| c.input.as_str()).unwrap_or_default()
        } else {
            ""
        };
        pane_widget::render(frame, &app.manager, *id, ui_rect, focused, input_text);
    }
}
