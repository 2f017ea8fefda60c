//! Left navigation: app list with health dots.

use std::collections::HashMap;

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState},
};

use crate::types::{AppEntry, HealthStatus};
use crate::ui::theme::{health_color, ACCENT, MUTED};
use crate::ui::util::{app_icon, truncate_middle};

pub fn draw_nav(
    f: &mut ratatui::Frame<'_>,
    area: Rect,
    apps: &[AppEntry],
    health: &HashMap<String, HealthStatus>,
    selected: usize,
) {
    let title = format!("Apps ({})", apps.len());
    let block = Block::default().borders(Borders::ALL).title(title);

    if apps.is_empty() {
        let empty = List::new([ListItem::new(Span::styled(
            "NO APPS",
            Style::default().fg(MUTED),
        ))])
        .block(block);
        f.render_widget(empty, area);
        return;
    }

    let name_width = area.width.saturating_sub(8) as usize;
    let items: Vec<ListItem> = apps
        .iter()
        .map(|app| {
            let status = health.get(&app.id).copied().unwrap_or_default();
            let name = if app.name.is_empty() { &app.id } else { &app.name };
            ListItem::new(Line::from(vec![
                Span::styled("● ", Style::default().fg(health_color(status))),
                Span::raw(format!("{} ", app_icon(&app.icon))),
                Span::raw(truncate_middle(name, name_width)),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().fg(ACCENT).add_modifier(Modifier::BOLD))
        .highlight_symbol("▶ ");
    let mut state = ListState::default();
    state.select(Some(selected.min(apps.len().saturating_sub(1))));
    f.render_stateful_widget(list, area, &mut state);
}
