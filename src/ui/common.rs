//! Common UI components: header bar, status bar and help overlay.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::app::App;

/// Render the header bar: liveness indicator, interface and source.
pub fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let indicator = if app.is_live() {
        Span::styled(" ● ", Style::default().fg(app.theme.inbound))
    } else {
        Span::styled(" ● ", Style::default().fg(app.theme.error))
    };

    let line = Line::from(vec![
        indicator,
        Span::styled("NETSTAT METER ", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw("│ "),
        Span::styled(app.interface().to_string(), app.theme.header),
        Span::raw(" │ "),
        Span::styled(
            app.source_description().to_string(),
            Style::default().add_modifier(Modifier::DIM),
        ),
    ]);

    frame.render_widget(Paragraph::new(line), area);
}

/// Render the status bar at the bottom.
///
/// Shows time since the last sample and the available controls, or a
/// temporary status message or error.
pub fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    // Check for temporary status message first
    if let Some(msg) = app.get_status_message() {
        let paragraph =
            Paragraph::new(format!(" {} ", msg)).style(Style::default().fg(app.theme.highlight));
        frame.render_widget(paragraph, area);
        return;
    }

    if let Some(ref err) = app.load_error {
        let paragraph = Paragraph::new(format!(" Error: {} | r:restart q:quit", err))
            .style(Style::default().fg(app.theme.error));
        frame.render_widget(paragraph, area);
        return;
    }

    let status = match app.last_sample_at {
        Some(at) => format!(
            " {} samples | Updated {:.1}s ago | r:restart ?:help q:quit",
            app.samples_received,
            at.elapsed().as_secs_f64(),
        ),
        None => " Waiting for netstat... | q:quit".to_string(),
    };

    let paragraph = Paragraph::new(status).style(Style::default().add_modifier(Modifier::DIM));
    frame.render_widget(paragraph, area);
}

/// Render the help overlay with keyboard shortcuts.
///
/// Displayed as a centered modal on top of the meters.
pub fn render_help(frame: &mut Frame, app: &App, area: Rect) {
    let help_text = vec![
        Line::from(vec![Span::styled("Keyboard Shortcuts", app.theme.header)]),
        Line::from(""),
        Line::from("  r         Restart sampling"),
        Line::from("  ?         Toggle help"),
        Line::from("  q / Esc   Quit"),
        Line::from(""),
        Line::from(vec![Span::styled(
            "Press any key to close",
            Style::default().add_modifier(Modifier::DIM),
        )]),
    ];

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.highlight));

    let paragraph = Paragraph::new(help_text).block(block);

    // Center the help overlay - responsive to terminal size
    let help_width = 36u16.min(area.width.saturating_sub(4));
    let help_height = 9u16.min(area.height.saturating_sub(2));
    let x = area.x + (area.width.saturating_sub(help_width)) / 2;
    let y = area.y + (area.height.saturating_sub(help_height)) / 2;
    let help_area = Rect::new(x, y, help_width, help_height);

    // Clear the area behind the help
    frame.render_widget(ratatui::widgets::Clear, help_area);
    frame.render_widget(paragraph, help_area);
}
