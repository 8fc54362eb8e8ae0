//! The two bandwidth meters.

use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::app::App;

/// Render the inbound and outbound meters side by side.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let (speed_in, speed_out) = app.speeds();
    let raw_in = app.latest.as_ref().map(|s| s.bytes_in.as_str());
    let raw_out = app.latest.as_ref().map(|s| s.bytes_out.as_str());

    let columns = Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    render_meter(frame, app, columns[0], " ↓ In ", &speed_in, raw_in, app.theme.inbound);
    render_meter(frame, app, columns[1], " ↑ Out ", &speed_out, raw_out, app.theme.outbound);
}

fn render_meter(
    frame: &mut Frame,
    app: &App,
    area: Rect,
    title: &str,
    speed: &str,
    raw: Option<&str>,
    color: Color,
) {
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.border));

    let inner_height = area.height.saturating_sub(2);
    let mut lines = Vec::new();
    for _ in 0..inner_height.saturating_sub(2) / 2 {
        lines.push(Line::from(""));
    }
    lines.push(Line::from(Span::styled(
        speed.to_string(),
        app.theme.meter_style(color),
    )));
    lines.push(Line::from(Span::styled(
        format!("{} bytes", raw.unwrap_or("-")),
        Style::default().fg(app.theme.border),
    )));

    let paragraph = Paragraph::new(lines)
        .alignment(Alignment::Right)
        .block(block);
    frame.render_widget(paragraph, area);
}
