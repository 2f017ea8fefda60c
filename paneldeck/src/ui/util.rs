//! Small UI helpers: icons, truncation, placeholders.

use ratatui::{
    layout::Rect,
    style::Style,
    widgets::{Block, Borders, Paragraph},
};

use crate::ui::theme::MUTED;

/// App icon names from the manifest to a glyph.
pub fn app_icon(name: &str) -> &'static str {
    match name {
        "monitor" => "🖥️",
        "cart" => "🛒",
        "chart" => "📊",
        "camera" => "📷",
        "car" => "🚗",
        "server" => "⚙️",
        "database" => "💾",
        "network" => "🌐",
        "alert" => "🔔",
        "shield" => "🛡️",
        "clock" => "⏰",
        "user" => "👤",
        "home" => "🏠",
        "tools" => "🔧",
        "eye" => "👁️",
        "zap" => "⚡",
        _ => "📦",
    }
}

pub fn truncate_middle(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    if max <= 3 {
        return "...".into();
    }
    let keep = max - 3;
    let left = keep / 2;
    let right = keep - left;
    let chars: Vec<char> = s.chars().collect();
    let head: String = chars[..left].iter().collect();
    let tail: String = chars[chars.len() - right..].iter().collect();
    format!("{head}...{tail}")
}

/// A bordered block with one dim message line, used for every inline
/// placeholder state.
pub fn centered_placeholder(f: &mut ratatui::Frame<'_>, area: Rect, title: &str, message: &str) {
    let p = Paragraph::new(message.to_string())
        .style(Style::default().fg(MUTED))
        .block(Block::default().borders(Borders::ALL).title(title.to_string()));
    f.render_widget(p, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_keeps_short_strings() {
        assert_eq!(truncate_middle("short", 10), "short");
    }

    #[test]
    fn truncate_splits_long_strings() {
        let t = truncate_middle("abcdefghijklmnop", 9);
        assert_eq!(t.chars().count(), 9);
        assert!(t.contains("..."));
        assert!(t.starts_with("abc"));
        assert!(t.ends_with("nop"));
    }

    #[test]
    fn unknown_icon_falls_back() {
        assert_eq!(app_icon("nope"), "📦");
        assert_eq!(app_icon("camera"), "📷");
    }
}
