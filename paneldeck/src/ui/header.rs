//! Top header: registry host, live-channel state, alert badge, clock.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
};

use crate::alerts::{badge_hot, badge_text};
use crate::stream::ConnState;
use crate::ui::theme::{ACCENT, BADGE, BADGE_HOT, MUTED};

pub fn draw_header(
    f: &mut ratatui::Frame<'_>,
    area: Rect,
    registry: &str,
    conn: ConnState,
    unseen: u32,
    clock: &str,
) {
    let conn_style = match conn {
        ConnState::Connected => Style::default().fg(ratatui::style::Color::Green),
        ConnState::Connecting => Style::default().fg(ratatui::style::Color::Yellow),
        _ => Style::default().fg(ratatui::style::Color::Red),
    };

    let mut spans = vec![
        Span::styled(
            "paneldeck",
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!(" — {registry} | ws ")),
        Span::styled(format!("● {conn}"), conn_style),
    ];
    if let Some(badge) = badge_text(unseen) {
        let color = if badge_hot(unseen) { BADGE_HOT } else { BADGE };
        spans.push(Span::raw(" | alerts "));
        spans.push(Span::styled(
            badge,
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ));
    }
    spans.push(Span::styled(
        format!("  {clock}  (q quit, a alerts, x ack, r refresh)"),
        Style::default().fg(MUTED),
    ));

    f.render_widget(Paragraph::new(Line::from(spans)), area);
}
