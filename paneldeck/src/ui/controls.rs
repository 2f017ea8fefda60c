//! Controls panel: one numbered button per action.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use crate::panels::{ButtonState, ButtonView};
use crate::ui::theme::{panel_color, MUTED};
use crate::ui::util::centered_placeholder;

pub fn draw_controls(f: &mut ratatui::Frame<'_>, area: Rect, title: &str, buttons: &[ButtonView]) {
    if buttons.is_empty() {
        centered_placeholder(f, area, title, "NO ACTIONS CONFIGURED");
        return;
    }

    let mut spans: Vec<Span> = Vec::new();
    for (i, b) in buttons.iter().enumerate() {
        let (label, style) = match b.state {
            ButtonState::Idle => {
                let color = panel_color(b.color.as_deref().unwrap_or("orange"));
                (b.label.clone(), Style::default().fg(color))
            }
            ButtonState::Confirming => (
                format!("{}?", b.label),
                Style::default()
                    .fg(ratatui::style::Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ),
            ButtonState::Sending => (
                "SENDING...".into(),
                Style::default().fg(MUTED).add_modifier(Modifier::DIM),
            ),
            ButtonState::Done => (
                "✓ DONE".into(),
                Style::default().fg(ratatui::style::Color::Green),
            ),
            ButtonState::Failed => (
                "✗ FAILED".into(),
                Style::default().fg(ratatui::style::Color::Red),
            ),
        };
        spans.push(Span::styled(format!(" {}:[ {} ] ", i + 1, label), style));
    }

    let p = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL).title(title.to_string()));
    f.render_widget(p, area);
}
