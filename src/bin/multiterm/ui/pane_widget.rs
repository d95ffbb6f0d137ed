//! Renders one session's pane: output tail, live status line, and the
//! input box when it's the focused pane.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Paragraph};
use ratatui::Frame;

use multiterm::session::{SessionId, SessionManager, SessionStatus};

pub fn render(
    frame: &mut Frame<'_>,
    manager: &SessionManager,
    id: SessionId,
    area: Rect,
    focused: bool,
    input_text: &str,
) {
    let Some(handle) = manager.get(id) else {
        return;
    };
    let meta = handle.meta();
    let log = handle.output();

    let border_color = if focused { Color::Cyan } else { Color::DarkGray };
    let status_color = match meta.status {
        SessionStatus::Idle => Color::Gray,
        SessionStatus::Processing | SessionStatus::Responding => Color::Yellow,
        SessionStatus::Completed => Color::Green,
        SessionStatus::Terminated | SessionStatus::Failed => Color::Red,
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(area);

    let title = Line::from(vec![
        Span::styled(format!(" {} ", meta.name), Style::default().fg(border_color).add_modifier(Modifier::BOLD)),
        Span::styled(format!("[{}]", meta.status.as_hint()), Style::default().fg(status_color)),
    ]);

    let visible_rows = chunks[0].height.saturating_sub(2) as usize;
    let total = log.line_count();
    let start = total.saturating_sub(visible_rows);
    let lines: Vec<Line> = (start..total)
        .filter_map(|i| log.line_text(i))
        .map(Line::from)
        .collect();

    let output = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Plain)
            .border_style(Style::default().fg(border_color))
            .title(title),
    );
    frame.render_widget(output, chunks[0]);

    let input = Paragraph::new(input_text).style(Style::default().fg(Color::Yellow));
    frame.render_widget(input, chunks[1]);
}
