//! Shared UI theme constants and color name mapping.

use ratatui::style::Color;

use crate::types::HealthStatus;

// Badge colors match the original extension badge.
pub const BADGE: Color = Color::Rgb(255, 153, 0);
pub const BADGE_HOT: Color = Color::Rgb(204, 68, 68);

pub const ACCENT: Color = Color::Rgb(255, 153, 0);
pub const MUTED: Color = Color::Rgb(150, 150, 160);

/// Manifest color names to terminal colors.
pub fn panel_color(name: &str) -> Color {
    match name {
        "orange" => Color::Rgb(255, 153, 0),
        "amber" => Color::Rgb(255, 191, 0),
        "blue" => Color::Blue,
        "purple" => Color::Magenta,
        "red" | "danger" => Color::Red,
        "green" | "success" => Color::Green,
        "peach" => Color::Rgb(255, 178, 122),
        "lavender" => Color::Rgb(200, 162, 255),
        "tan" => Color::Rgb(210, 180, 140),
        "warning" => Color::Yellow,
        _ => Color::White,
    }
}

pub fn health_color(status: HealthStatus) -> Color {
    match status {
        HealthStatus::Online => Color::Green,
        HealthStatus::Offline => Color::Red,
        HealthStatus::Error => Color::Yellow,
        HealthStatus::Unknown => Color::DarkGray,
    }
}

/// Alert severity to row color.
pub fn level_color(level: u32) -> Color {
    match level {
        0 => Color::Gray,
        1 => Color::Yellow,
        _ => Color::Red,
    }
}
