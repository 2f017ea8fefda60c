//! Camera and iframe panels. A terminal cannot embed either, so these draw
//! the resolved target and how it would be presented.

use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use crate::panels::MediaKind;
use crate::ui::theme::{ACCENT, MUTED};
use crate::ui::util::truncate_middle;

pub fn draw_camera(
    f: &mut ratatui::Frame<'_>,
    area: Rect,
    title: &str,
    url: &str,
    media: MediaKind,
    size: &str,
) {
    let kind = match media {
        MediaKind::Video => "▶ VIDEO",
        MediaKind::Still => "🖼 STILL",
    };
    draw_target(f, area, title, kind, url, size);
}

pub fn draw_iframe(f: &mut ratatui::Frame<'_>, area: Rect, title: &str, url: &str, size: &str) {
    draw_target(f, area, title, "⧉ EMBED", url, size);
}

fn draw_target(
    f: &mut ratatui::Frame<'_>,
    area: Rect,
    title: &str,
    kind: &str,
    url: &str,
    size: &str,
) {
    let max = area.width.saturating_sub(6) as usize;
    let p = Paragraph::new(vec![
        Line::from(vec![
            Span::styled(kind.to_string(), Style::default().fg(ACCENT)),
            Span::styled(format!("  size:{size}"), Style::default().fg(MUTED)),
        ]),
        Line::from(Span::raw(truncate_middle(url, max))),
    ])
    .block(Block::default().borders(Borders::ALL).title(title.to_string()));
    f.render_widget(p, area);
}
