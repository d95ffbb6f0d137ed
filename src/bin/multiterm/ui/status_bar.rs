//! One-line status bar: mode, pane count, and the last notification.

use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use multiterm::input::Mode;

use crate::app::App;

pub fn render(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let mode_color = match app.mode.current() {
        Mode::Normal => Color::White,
        Mode::Insert => Color::Green,
        Mode::Copy => Color::Magenta,
        Mode::Command => Color::Yellow,
    };
    let mode_label = match app.mode.current() {
        Mode::Normal => "NORMAL",
        Mode::Insert => "INSERT",
        Mode::Copy => "COPY",
        Mode::Command => "COMMAND",
    };

    let mut spans = vec![
        Span::styled(format!(" {mode_label} "), Style::default().fg(Color::Black).bg(mode_color)),
        Span::raw(format!(" {} panes  ", app.session_order.len())),
    ];
    if app.broadcast {
        spans.push(Span::styled(" BROADCAST ", Style::default().fg(Color::Black).bg(Color::Red)));
        spans.push(Span::raw("  "));
    }
    spans.push(Span::raw(app.status_text()));
    let line = Line::from(spans);

    frame.render_widget(Paragraph::new(line), area);
}
