//! Recent alerts overlay: newest first, colored by severity.

use std::collections::VecDeque;

use ratatui::{
    layout::{Constraint, Rect},
    style::{Modifier, Style},
    widgets::{Block, Borders, Cell, Row, Table},
};

use crate::types::Alert;
use crate::ui::theme::{level_color, ACCENT};
use crate::ui::util::centered_placeholder;

pub fn draw_alerts(f: &mut ratatui::Frame<'_>, area: Rect, alerts: &VecDeque<Alert>, unseen: u32) {
    let title = format!("Recent Alerts ({} unseen)", unseen);
    if alerts.is_empty() {
        centered_placeholder(f, area, &title, "NO ALERTS");
        return;
    }

    let header = Row::new(vec!["TIME", "CAMERA", "TYPE", "RULE", "LVL"])
        .style(Style::default().fg(ACCENT).add_modifier(Modifier::BOLD));
    let rows = alerts.iter().map(|a| {
        let style = Style::default().fg(level_color(a.level));
        Row::new(vec![
            Cell::from(a.timestamp.with_timezone(&chrono::Local).format("%H:%M:%S").to_string()),
            Cell::from(a.camera.clone()),
            Cell::from(a.kind.clone()),
            Cell::from(a.rule.clone()),
            Cell::from(a.level.to_string()),
        ])
        .style(style)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(9),
            Constraint::Percentage(25),
            Constraint::Percentage(20),
            Constraint::Percentage(35),
            Constraint::Length(4),
        ],
    )
    .header(header)
    .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(table, area);
}
