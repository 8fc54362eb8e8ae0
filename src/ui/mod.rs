//! Terminal UI rendering using ratatui.
//!
//! ## Submodules
//!
//! - [`meter`]: The inbound/outbound speed meters
//! - [`common`]: Header, status bar and help overlay
//! - [`theme`]: Light/dark theme support with terminal auto-detection
//!
//! ## Layout
//!
//! ```text
//! ┌──────────────────────────────────────┐
//! │ Header (common::render_header)       │
//! ├──────────────────┬───────────────────┤
//! │  ↓ In            │  ↑ Out            │
//! │       1.5 kb/s   │       0.3 kb/s    │
//! ├──────────────────┴───────────────────┤
//! │ Status Bar (common::render_status)   │
//! └──────────────────────────────────────┘
//!         ↑
//!    common::render_help drawn on top
//! ```

pub mod common;
pub mod meter;
pub mod theme;

pub use theme::Theme;

use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Style},
    widgets::Paragraph,
    Frame,
};

use crate::app::App;

/// Minimum terminal size for usable display.
pub const MIN_WIDTH: u16 = 30;
pub const MIN_HEIGHT: u16 = 6;

/// Draw a whole frame.
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
        let msg = format!(
            "Terminal too small: {}x{}\nMinimum: {}x{}",
            area.width, area.height, MIN_WIDTH, MIN_HEIGHT
        );
        let paragraph = Paragraph::new(msg)
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::Yellow));
        let centered = Rect::new(0, area.height.saturating_sub(2) / 2, area.width, 2);
        frame.render_widget(paragraph, centered.intersection(area));
        return;
    }

    let chunks = Layout::vertical([
        Constraint::Length(1), // Header bar
        Constraint::Min(4),    // Meters
        Constraint::Length(1), // Status bar
    ])
    .split(area);

    common::render_header(frame, app, chunks[0]);
    meter::render(frame, app, chunks[1]);
    common::render_status_bar(frame, app, chunks[2]);

    if app.show_help {
        common::render_help(frame, app, area);
    }
}
