//! Stream panel: bounded newest-first live feed.

use std::collections::VecDeque;

use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem},
};

use crate::panels::StreamItem;
use crate::ui::theme::{panel_color, MUTED};

pub fn draw_stream(
    f: &mut ratatui::Frame<'_>,
    area: Rect,
    title: &str,
    items: &VecDeque<StreamItem>,
    connected: bool,
) {
    let block = Block::default().borders(Borders::ALL).title(title.to_string());

    let mut rows: Vec<ListItem> = Vec::with_capacity(items.len() + 1);
    if !connected {
        rows.push(ListItem::new(Span::styled(
            "STREAM DISCONNECTED",
            Style::default().fg(ratatui::style::Color::Red),
        )));
    }
    for item in items {
        let spans: Vec<Span> = item
            .spans
            .iter()
            .map(|s| {
                let style = if s.is_time {
                    Style::default().fg(MUTED)
                } else {
                    match &s.color {
                        Some(color) => Style::default().fg(panel_color(color)),
                        None => Style::default(),
                    }
                };
                Span::styled(format!("{} ", s.text), style)
            })
            .collect();
        rows.push(ListItem::new(Line::from(spans)));
    }
    if rows.is_empty() {
        rows.push(ListItem::new(Span::styled(
            "WAITING FOR EVENTS...",
            Style::default().fg(MUTED),
        )));
    }

    f.render_widget(List::new(rows).block(block), area);
}
