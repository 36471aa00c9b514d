//! Log view - commit history with reference labels and search highlights

use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use super::{fit, row_zones, scrollbar, selection_marker, view_block};
use crate::app::App;
use crate::dispatch::ClickZone;
use crate::graph::Cell;
use crate::model::{Commit, PageState, RefKind, Reference};
use crate::theme::Palette;
use crate::view::ViewId;

const MAX_LABELS: usize = 4;

pub fn render_log_view(app: &mut App, f: &mut Frame, area: Rect, zones: &mut Vec<ClickZone>) {
    let len = app.model.len();
    let more = if app.model.reached_end() { "" } else { "+" };
    let title = format!(" History ({}{}) ", len, more);
    let block = view_block(title, &app.palette);
    let inner = block.inner(area);
    f.render_widget(block, area);

    fit(&mut app.views.log, inner, len);
    let state = app.views.log.clone();
    let p = app.palette;
    let head = app.model.head().map(str::to_string);
    let graph = app.graph();
    let lanes = graph.width().max(1);

    let mut lines: Vec<Line> = Vec::new();
    let end = (state.scroll + inner.height as usize).min(len);
    for idx in state.scroll..end {
        let Some(commit) = app.model.commit(idx) else {
            break;
        };
        let refs = app.model.refs_for(&commit.id);
        let selected = idx == state.selected;
        let boundary = app.model.is_boundary(idx);
        let mut line = Line::from(vec![Span::raw(selection_marker(selected))]);
        line.spans.extend(graph_cells(graph.row(idx).unwrap_or(&[]), lanes, boundary, &p));
        line.spans.extend(commit_spans(commit, &refs, head.as_deref(), &p));
        if selected {
            line = line.style(Style::default().bg(p.selection_bg).add_modifier(Modifier::BOLD));
        } else if app.search.is_match(idx) {
            line = line.style(Style::default().bg(p.match_bg));
        }
        lines.push(line);
    }

    let open = graph.open_lanes();
    if lines.len() < inner.height as usize && end == len && app.model.reached_end() && !open.is_empty() {
        lines.push(off_screen_lanes(&open, lanes, &p));
    }

    if lines.len() < inner.height as usize {
        match app.model.page_state() {
            PageState::Loading(_) => lines.push(Line::styled("  Loading history…", Style::default().fg(p.muted))),
            PageState::Failed(e) => lines.push(Line::styled(
                format!("  {}  (R to retry)", e),
                Style::default().fg(p.error),
            )),
            PageState::Idle if len == 0 && app.model.reached_end() => {
                lines.push(Line::styled("  No commits", Style::default().fg(p.muted)))
            }
            PageState::Idle => {}
        }
    }

    f.render_widget(
        Paragraph::new(lines)
            .style(Style::default().fg(p.fg))
            .scroll((0, state.scroll_x.min(u16::MAX as usize) as u16)),
        inner,
    );
    scrollbar(f, area, len, state.height, state.scroll);
    row_zones(zones, inner, ViewId::Log, state.scroll, end.saturating_sub(state.scroll));
}

fn lane_color(lane: usize, p: &Palette) -> Color {
    let colors = [p.accent, p.ref_local, p.ref_remote, p.ref_tag, p.hash, p.author];
    colors[lane % colors.len()]
}

/// Two columns per lane, padded to `lanes` so the columns after line up.
fn graph_cells(cells: &[Cell], lanes: usize, boundary: bool, p: &Palette) -> Vec<Span<'static>> {
    let node = cells.iter().position(|c| matches!(c, Cell::Node { .. })).unwrap_or(0);
    let mut spans: Vec<Span<'static>> = cells
        .iter()
        .enumerate()
        .map(|(lane, cell)| {
            let glyph = match cell {
                Cell::Empty => "  ",
                Cell::Pass => "│ ",
                Cell::Node { merge: true } => "◆ ",
                Cell::Node { .. } if boundary => "◌ ",
                Cell::Node { .. } => "● ",
                Cell::Join => "╯ ",
                Cell::Fork if lane < node => "╭ ",
                Cell::Fork => "╮ ",
            };
            let color = match cell {
                Cell::Node { .. } if boundary => p.boundary,
                _ => lane_color(lane, p),
            };
            Span::styled(glyph, Style::default().fg(color))
        })
        .collect();
    if cells.len() < lanes {
        spans.push(Span::raw("  ".repeat(lanes - cells.len())));
    }
    spans
}

/// Trailer under the last commit: lanes whose parents lie outside the loaded history.
fn off_screen_lanes(open: &[usize], lanes: usize, p: &Palette) -> Line<'static> {
    let mut spans = vec![Span::raw(selection_marker(false))];
    for lane in 0..lanes {
        if open.contains(&lane) {
            spans.push(Span::styled("╎ ", Style::default().fg(p.boundary)));
        } else {
            spans.push(Span::raw("  "));
        }
    }
    spans.push(Span::styled("parents outside this history", Style::default().fg(p.muted)));
    Line::from(spans)
}

fn commit_spans<'a>(commit: &'a Commit, refs: &[&Reference], head: Option<&str>, p: &Palette) -> Vec<Span<'a>> {
    let author = commit.author.split(" <").next().unwrap_or(&commit.author);

    let mut spans = vec![
        Span::styled(commit.short_id(), Style::default().fg(p.hash)),
        Span::raw(" "),
        Span::styled(format!("{:<16} ", commit.date), Style::default().fg(p.date)),
        Span::styled(format!("{} ", pad_to_width(author, 18)), Style::default().fg(p.author)),
    ];
    spans.extend(ref_labels(refs, head, p));
    spans.push(Span::raw(commit.subject.as_str()));
    spans
}

/// `[name]` spans coloured by kind, capped with a `[+N]` overflow marker.
fn ref_labels(refs: &[&Reference], head: Option<&str>, p: &Palette) -> Vec<Span<'static>> {
    let mut spans = Vec::new();
    for r in refs.iter().take(MAX_LABELS) {
        let is_head = r.is_head || (r.kind == RefKind::LocalBranch && head == Some(r.name.as_str()));
        let style = match r.kind {
            _ if is_head => Style::default().fg(p.ref_head).add_modifier(Modifier::BOLD),
            RefKind::LocalBranch => Style::default().fg(p.ref_local),
            RefKind::RemoteBranch => Style::default().fg(p.ref_remote),
            RefKind::Tag => Style::default().fg(p.ref_tag),
        };
        let text = if r.kind == RefKind::Tag {
            format!("[tag: {}] ", r.name)
        } else {
            format!("[{}] ", r.name)
        };
        spans.push(Span::styled(text, style));
    }
    if refs.len() > MAX_LABELS {
        spans.push(Span::styled(
            format!("[+{}] ", refs.len() - MAX_LABELS),
            Style::default().fg(p.muted),
        ));
    }
    spans
}

/// Truncate to `width` display columns and pad with spaces to exactly that width.
fn pad_to_width(s: &str, width: usize) -> String {
    let mut out = String::new();
    let mut used = 0;
    if UnicodeWidthStr::width(s) <= width {
        out.push_str(s);
        used = UnicodeWidthStr::width(s);
    } else {
        let budget = width.saturating_sub(1);
        for ch in s.chars() {
            let w = UnicodeWidthChar::width(ch).unwrap_or(0);
            if used + w > budget {
                break;
            }
            out.push(ch);
            used += w;
        }
        out.push('…');
        used += 1;
    }
    out.extend(std::iter::repeat_n(' ', width.saturating_sub(used)));
    out
}
