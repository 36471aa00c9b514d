use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
};

use super::{fit, row_zones, scrollbar, selection_marker, view_block};
use crate::app::App;
use crate::diff::{DiffLineKind, DiffRow};
use crate::dispatch::ClickZone;
use crate::model::{DiffEntry, short_id};
use crate::theme::Palette;
use crate::view::ViewId;

pub fn render_diff_view(app: &mut App, f: &mut Frame, area: Rect, zones: &mut Vec<ClickZone>) {
    let p = app.palette;
    let ds = app.model.diff_settings();
    let commit = app.views.diff_commit.clone();

    let mut title = match commit.as_deref() {
        Some(id) => format!(" Diff {} ", short_id(id)),
        None => " Diff ".to_string(),
    };
    title.push_str(&format!("· context {} ", ds.context));
    if ds.ignore_whitespace {
        title.push_str("· ignoring whitespace ");
    }
    let block = view_block(title, &p);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let len = app.len_of(ViewId::Diff);
    fit(&mut app.views.diff, inner, len);
    let state = app.views.diff.clone();

    let Some(view) = app.diff_view() else {
        let (msg, style) = match (commit.as_deref(), app.diff_entry()) {
            (None, _) => (
                "Select a commit in the log and press Enter".to_string(),
                Style::default().fg(p.muted),
            ),
            (Some(_), Some(DiffEntry::Failed(e))) => (format!("{}  (R to retry)", e), Style::default().fg(p.error)),
            (Some(_), _) => ("Loading diff…".to_string(), Style::default().fg(p.muted)),
        };
        f.render_widget(Paragraph::new(Line::styled(format!("  {}", msg), style)), inner);
        return;
    };

    let end = (state.scroll + inner.height as usize).min(view.rows.len());
    let lines: Vec<Line> = view.rows[state.scroll.min(end)..end]
        .iter()
        .enumerate()
        .map(|(i, row)| diff_line(row, state.scroll + i == state.selected, &p))
        .collect();

    f.render_widget(
        Paragraph::new(lines)
            .style(Style::default().fg(p.fg))
            .scroll((0, state.scroll_x.min(u16::MAX as usize) as u16)),
        inner,
    );
    scrollbar(f, area, len, state.height, state.scroll);
    row_zones(zones, inner, ViewId::Diff, state.scroll, end.saturating_sub(state.scroll));
}

fn diff_line<'a>(row: &'a DiffRow, selected: bool, p: &Palette) -> Line<'a> {
    let style = match row.kind {
        DiffLineKind::Added => Style::default().fg(p.diff_add_fg).bg(p.diff_add_bg),
        DiffLineKind::Removed => Style::default().fg(p.diff_del_fg).bg(p.diff_del_bg),
        DiffLineKind::Context => Style::default().fg(p.fg),
        DiffLineKind::Header if row.source.is_none() => Style::default().fg(p.fg),
        DiffLineKind::Header if row.text.starts_with("@@") => Style::default().fg(p.accent).bg(p.diff_hunk_bg),
        DiffLineKind::Header => Style::default().fg(p.diff_meta).add_modifier(Modifier::BOLD),
    };
    let style = if selected {
        style.bg(p.selection_bg).add_modifier(Modifier::BOLD)
    } else {
        style
    };
    Line::from(vec![
        Span::raw(selection_marker(selected)),
        Span::styled(row.text.as_str(), style),
    ])
}
