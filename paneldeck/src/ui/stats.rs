//! Stats panel: one card per metric.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Paragraph},
};

use crate::panels::StatCard;
use crate::ui::theme::{panel_color, MUTED};
use crate::ui::util::centered_placeholder;

pub fn draw_stats(f: &mut ratatui::Frame<'_>, area: Rect, title: &str, cards: &[StatCard]) {
    if cards.is_empty() {
        centered_placeholder(f, area, title, "NO METRICS CONFIGURED");
        return;
    }

    f.render_widget(
        Block::default().borders(Borders::ALL).title(title.to_string()),
        area,
    );
    let inner = Rect {
        x: area.x + 1,
        y: area.y + 1,
        width: area.width.saturating_sub(2),
        height: area.height.saturating_sub(2),
    };
    if inner.height < 2 || inner.width < 4 {
        return;
    }

    let n = cards.len() as u32;
    let slots = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(vec![Constraint::Ratio(1, n); n as usize])
        .split(inner);

    for (card, slot) in cards.iter().zip(slots.iter()) {
        let value_style = match &card.color {
            Some(color) => Style::default()
                .fg(panel_color(color))
                .add_modifier(Modifier::BOLD),
            None => Style::default().add_modifier(Modifier::BOLD),
        };
        let p = Paragraph::new(vec![
            Line::styled(card.value.clone(), value_style),
            Line::styled(card.label.clone(), Style::default().fg(MUTED)),
        ])
        .centered();
        f.render_widget(p, *slot);
    }
}
