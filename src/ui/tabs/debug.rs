use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
};
use tracing::Level;

use super::{fit, row_zones, scrollbar, selection_marker, view_block};
use crate::app::App;
use crate::dispatch::ClickZone;
use crate::view::ViewId;

pub fn render_debug_view(app: &mut App, f: &mut Frame, area: Rect, zones: &mut Vec<ClickZone>) {
    let p = app.palette;
    let len = app.debug_log.len();
    let block = view_block(format!(" Debug log ({}) ", len), &p);
    let inner = block.inner(area);
    f.render_widget(block, area);

    fit(&mut app.views.debug, inner, len);
    let state = app.views.debug.clone();
    let entries = app.debug_log.slice(state.scroll, inner.height as usize);

    let lines: Vec<Line> = entries
        .iter()
        .enumerate()
        .map(|(i, e)| {
            let selected = state.scroll + i == state.selected;
            let level_color = match e.level {
                Level::ERROR => p.error,
                Level::WARN => p.hash,
                Level::INFO => p.ref_local,
                _ => p.muted,
            };
            let line = Line::from(vec![
                Span::raw(selection_marker(selected)),
                Span::styled(format!("{} ", e.time), Style::default().fg(p.date)),
                Span::styled(format!("{:<5} ", e.level.as_str()), Style::default().fg(level_color)),
                Span::styled(format!("{} ", e.target), Style::default().fg(p.muted)),
                Span::raw(e.message.clone()),
            ]);
            if selected {
                line.style(Style::default().bg(p.selection_bg).add_modifier(Modifier::BOLD))
            } else {
                line
            }
        })
        .collect();

    f.render_widget(
        Paragraph::new(lines)
            .style(Style::default().fg(p.fg))
            .scroll((0, state.scroll_x.min(u16::MAX as usize) as u16)),
        inner,
    );
    scrollbar(f, area, len, state.height, state.scroll);
    row_zones(zones, inner, ViewId::DebugLog, state.scroll, entries.len());
}
