//! Status panel: data table with per-cell color classification.

use ratatui::{
    layout::{Constraint, Rect},
    style::{Modifier, Style},
    widgets::{Block, Borders, Cell, Row, Table},
};

use crate::panels::StatusCell;
use crate::types::FieldSpec;
use crate::ui::theme::{panel_color, ACCENT};
use crate::ui::util::centered_placeholder;

pub fn draw_status(
    f: &mut ratatui::Frame<'_>,
    area: Rect,
    title: &str,
    fields: &[FieldSpec],
    rows: &[Vec<StatusCell>],
    loaded: bool,
) {
    if !loaded {
        centered_placeholder(f, area, title, "LOADING...");
        return;
    }
    if rows.is_empty() {
        centered_placeholder(f, area, title, "NO DATA");
        return;
    }

    let header = Row::new(
        fields
            .iter()
            .map(|f| Cell::from(f.label.clone()))
            .collect::<Vec<_>>(),
    )
    .style(Style::default().fg(ACCENT).add_modifier(Modifier::BOLD));

    let body = rows.iter().map(|cells| {
        Row::new(
            cells
                .iter()
                .map(|c| {
                    let mut cell = Cell::from(c.text.clone());
                    if let Some(color) = &c.color {
                        cell = cell.style(Style::default().fg(panel_color(color)));
                    }
                    cell
                })
                .collect::<Vec<_>>(),
        )
    });

    let n = fields.len().max(1) as u32;
    let widths = vec![Constraint::Ratio(1, n); n as usize];
    let table = Table::new(body, widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title(title.to_string()));
    f.render_widget(table, area);
}
