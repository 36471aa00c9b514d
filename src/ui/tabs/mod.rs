//! View rendering modules

mod debug;
mod diff;
mod log;
mod refs;

pub use debug::render_debug_view;
pub use diff::render_diff_view;
pub use log::render_log_view;
pub use refs::render_refs_view;

use ratatui::{
    Frame,
    layout::{Margin, Rect},
    style::Style,
    text::Line,
    widgets::{Block, Borders, Scrollbar, ScrollbarOrientation, ScrollbarState},
};

use crate::dispatch::{Action, ClickZone};
use crate::theme::Palette;
use crate::view::{ViewId, ViewState};

pub(super) fn view_block<'a>(title: impl Into<Line<'a>>, palette: &Palette) -> Block<'a> {
    Block::default()
        .borders(Borders::ALL)
        .border_set(ratatui::symbols::border::PLAIN)
        .border_style(Style::default().fg(palette.border_active))
        .title(title)
}

/// Record the viewport height. Scroll is left alone so wheel scrolling can
/// move away from the selection.
pub(super) fn fit(state: &mut ViewState, inner: Rect, len: usize) {
    state.height = inner.height as usize;
    state.clamp(len);
    state.scroll = state.scroll.min(len.saturating_sub(1));
}

pub(super) fn row_zones(zones: &mut Vec<ClickZone>, inner: Rect, view: ViewId, scroll: usize, count: usize) {
    for i in 0..count.min(inner.height as usize) {
        zones.push(ClickZone {
            rect: Rect::new(inner.x, inner.y + i as u16, inner.width, 1),
            action: Action::SelectRow {
                view,
                row: scroll + i,
            },
        });
    }
}

// Max scroll range so the thumb reaches the bottom.
pub(super) fn scrollbar(f: &mut Frame, area: Rect, len: usize, height: usize, scroll: usize) {
    if len <= height {
        return;
    }
    let max_scroll = len.saturating_sub(height).max(1);
    let bar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
        .begin_symbol(Some("▴"))
        .end_symbol(Some("▾"))
        .track_symbol(Some("│"))
        .thumb_symbol("█");
    let mut state = ScrollbarState::new(max_scroll).position(scroll.min(max_scroll));
    f.render_stateful_widget(bar, area.inner(Margin { vertical: 1, horizontal: 0 }), &mut state);
}

pub(super) fn selection_marker(selected: bool) -> &'static str {
    if selected { "▎ " } else { "  " }
}
