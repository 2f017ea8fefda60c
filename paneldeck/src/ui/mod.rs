//! UI module root: draw functions for the dashboard surfaces.

pub mod alerts_feed;
pub mod controls;
pub mod header;
pub mod media;
pub mod nav;
pub mod stats;
pub mod status;
pub mod stream_feed;
pub mod theme;
pub mod util;

use ratatui::layout::Rect;

use crate::panels::PanelView;
use crate::ui::util::centered_placeholder;

/// Dispatch one panel's view to its type-specific draw function.
pub fn draw_panel(f: &mut ratatui::Frame<'_>, area: Rect, title: &str, view: &PanelView) {
    match view {
        PanelView::Status {
            fields,
            rows,
            loaded,
        } => status::draw_status(f, area, title, fields, rows, *loaded),
        PanelView::Stats { cards } => stats::draw_stats(f, area, title, cards),
        PanelView::Controls { buttons } => controls::draw_controls(f, area, title, buttons),
        PanelView::Stream { items, connected } => {
            stream_feed::draw_stream(f, area, title, items, *connected)
        }
        PanelView::Iframe { url, size } => media::draw_iframe(f, area, title, url, size),
        PanelView::Camera { url, media, size } => {
            media::draw_camera(f, area, title, url, *media, size)
        }
        PanelView::Unknown { kind } => {
            centered_placeholder(f, area, title, &format!("UNKNOWN PANEL TYPE: {kind}"))
        }
        PanelView::Empty { message } => centered_placeholder(f, area, title, message),
    }
}
