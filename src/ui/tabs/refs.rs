use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
};

use super::{fit, scrollbar, selection_marker, view_block};
use crate::app::App;
use crate::dispatch::{Action, ClickZone};
use crate::model::{RefKind, RefsState, short_id};
use crate::references::RefRow;
use crate::view::ViewId;

pub fn render_refs_view(app: &mut App, f: &mut Frame, area: Rect, zones: &mut Vec<ClickZone>) {
    let p = app.palette;
    let count = app.model.references().len();
    let block = view_block(format!(" References ({}) ", count), &p);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let len = app.len_of(ViewId::References);
    fit(&mut app.views.refs, inner, len);
    let state = app.views.refs.clone();

    if len == 0 {
        let (msg, style) = match app.model.refs_state() {
            RefsState::Failed(e) => (format!("{}  (R to retry)", e), Style::default().fg(p.error)),
            RefsState::Loading | RefsState::NotLoaded => ("Loading references…".to_string(), Style::default().fg(p.muted)),
            RefsState::Loaded => ("No references".to_string(), Style::default().fg(p.muted)),
        };
        f.render_widget(Paragraph::new(Line::styled(format!("  {}", msg), style)), inner);
        return;
    }

    let refs = app.model.references();
    let head = app.model.head();
    let end = (state.scroll + inner.height as usize).min(len);
    let mut lines = Vec::new();
    for (i, row) in app.ref_rows()[state.scroll.min(end)..end].iter().enumerate() {
        let idx = state.scroll + i;
        match row {
            RefRow::Header(title) => {
                lines.push(Line::styled(
                    title.clone(),
                    Style::default().fg(p.accent).add_modifier(Modifier::BOLD),
                ));
            }
            RefRow::Ref { idx: ref_idx, depth } => {
                let Some(r) = refs.get(*ref_idx) else {
                    continue;
                };
                let selected = idx == state.selected;
                let is_head = r.is_head || (r.kind == RefKind::LocalBranch && head == Some(r.name.as_str()));
                let color = match r.kind {
                    RefKind::LocalBranch => p.ref_local,
                    RefKind::RemoteBranch => p.ref_remote,
                    RefKind::Tag => p.ref_tag,
                };
                let mut line = Line::from(vec![
                    Span::raw(selection_marker(selected)),
                    Span::raw("  ".repeat(*depth)),
                    Span::styled(if is_head { "* " } else { "  " }, Style::default().fg(p.ref_head)),
                    Span::styled(r.name.clone(), Style::default().fg(color)),
                    Span::raw("  "),
                    Span::styled(short_id(&r.target).to_string(), Style::default().fg(p.hash)),
                ]);
                if selected {
                    line = line.style(Style::default().bg(p.selection_bg).add_modifier(Modifier::BOLD));
                }
                lines.push(line);
                zones.push(ClickZone {
                    rect: Rect::new(inner.x, inner.y + i as u16, inner.width, 1),
                    action: Action::SelectRow {
                        view: ViewId::References,
                        row: idx,
                    },
                });
            }
        }
    }

    f.render_widget(Paragraph::new(lines).style(Style::default().fg(p.fg)), inner);
    scrollbar(f, area, len, state.height, state.scroll);
}
