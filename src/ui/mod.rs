//! Frame layout: tab bar, focused view, status bar and the floating modal.

pub mod tabs;

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Margin, Rect},
    style::{Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};

use crate::app::App;
use crate::dispatch::{Action, ClickZone};
use crate::search::SearchMode;
use crate::theme::Palette;
use crate::view::{Floating, Modal, ViewId};

const HELP: &[(&str, &str)] = &[
    ("1-4 / Tab", "focus Log, Diff, Refs, Debug"),
    ("j/k  g/G", "move, first, last"),
    ("d/u  PgDn/PgUp", "page"),
    ("h/l  Shift+wheel", "scroll sideways"),
    ("Enter", "open diff / show origin / jump to ref"),
    ("b", "show origin of diff line"),
    ("[ ]  Alt+←/→  Ctrl+O", "back, forward"),
    ("/  n  N  Esc", "search, next, previous, clear"),
    ("c", "copy commit id"),
    ("+ - w", "diff context, whitespace"),
    ("p v", "cherry-pick, revert"),
    ("s S", "soft, hard reset"),
    ("B T", "create branch, tag"),
    ("D P E", "delete, push, rename ref"),
    ("m  right click", "context menu"),
    (":", "run git command on selection"),
    ("r R X", "reload, retry, cancel fetches"),
    ("t", "cycle theme"),
    ("q", "quit"),
];

pub fn draw_ui(f: &mut Frame, app: &mut App) -> Vec<ClickZone> {
    let mut zones = Vec::new();
    let area = f.area();
    let p = app.palette;

    f.render_widget(Block::default().bg(p.bg), area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Min(0), Constraint::Length(2)])
        .split(area);
    let (top_bar, content_area, footer_area) = (chunks[0], chunks[1], chunks[2]);

    render_tab_bar(app, f, top_bar, &mut zones);

    match app.views.focused {
        ViewId::Log => tabs::render_log_view(app, f, content_area, &mut zones),
        ViewId::Diff => tabs::render_diff_view(app, f, content_area, &mut zones),
        ViewId::References => tabs::render_refs_view(app, f, content_area, &mut zones),
        ViewId::DebugLog => tabs::render_debug_view(app, f, content_area, &mut zones),
    }

    render_status_bar(app, f, footer_area);

    if let Some(floating) = app.views.modal.clone() {
        render_modal(app, f, area, &floating, &mut zones);
    }

    zones
}

fn render_tab_bar(app: &App, f: &mut Frame, top_bar: Rect, zones: &mut Vec<ClickZone>) {
    let p = app.palette;
    let top_block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(Style::default().fg(p.border_inactive).bg(p.bg));
    f.render_widget(top_block, top_bar);

    let mut tab_x = top_bar.x + 1;
    let max_x = top_bar.x + top_bar.width;
    for (i, view) in ViewId::ALL.into_iter().enumerate() {
        let label = format!(" {} {} ", i + 1, view.label());
        let width = label.len() as u16;
        if tab_x + width > max_x {
            break;
        }
        let style = if app.views.focused == view {
            Style::default().bg(p.accent).fg(p.bg).add_modifier(Modifier::BOLD)
        } else {
            Style::default().bg(p.bg).fg(p.fg)
        };
        let rect = Rect::new(tab_x, top_bar.y, width, 1);
        f.render_widget(Paragraph::new(label).style(style), rect);
        zones.push(ClickZone {
            rect,
            action: Action::FocusView(view),
        });
        tab_x += width + 1;
    }

    // Back/forward buttons, right aligned.
    let mut x = max_x.saturating_sub(1);
    for (label, action, enabled) in [
        (" ▸ ", Action::Forward, app.history.can_go_forward()),
        (" ◂ ", Action::Back, app.history.can_go_back()),
    ] {
        let w = 3u16;
        if x < tab_x + w {
            break;
        }
        x -= w;
        let rect = Rect::new(x, top_bar.y, w, 1);
        let style = if enabled {
            Style::default().fg(p.accent).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(p.border_inactive)
        };
        f.render_widget(Paragraph::new(label).style(style), rect);
        if enabled {
            zones.push(ClickZone { rect, action });
        }
        x = x.saturating_sub(1);
    }
}

fn render_status_bar(app: &App, f: &mut Frame, footer_area: Rect) {
    let p = app.palette;
    let snap = app.snapshot();

    let footer_block = Block::default()
        .borders(Borders::TOP)
        .border_set(ratatui::symbols::border::PLAIN)
        .border_style(Style::default().fg(p.border_inactive));
    f.render_widget(footer_block, footer_area);
    let row = Rect::new(footer_area.x + 1, footer_area.y + 1, footer_area.width.saturating_sub(2), 1);

    let mut right: Vec<Span> = Vec::new();
    for failure in &snap.failures {
        right.push(Span::styled(format!("✗ {}  ", failure), Style::default().fg(p.error)));
    }
    if let Some(first) = snap.pending.first() {
        let more = if snap.pending.len() > 1 {
            format!(" (+{})", snap.pending.len() - 1)
        } else {
            String::new()
        };
        right.push(Span::styled(format!("⟳ {}{}  ", first, more), Style::default().fg(p.muted)));
    }
    if let Some(search) = &snap.search {
        right.push(Span::styled(format!("{}  ", search), Style::default().fg(p.hash)));
    }
    let position = if snap.len == 0 {
        "0/0".to_string()
    } else {
        format!("{}/{}", snap.selected + 1, snap.len)
    };
    right.push(Span::styled(position, Style::default().fg(p.fg).add_modifier(Modifier::BOLD)));

    let right_line = Line::from(right);
    let right_w = (right_line.width() as u16).min(row.width);
    let left_w = row.width.saturating_sub(right_w + 1);

    let left = match app.status.as_ref() {
        Some((msg, _)) => Line::styled(msg.clone(), Style::default().fg(p.fg)),
        None => Line::styled("? help  / search  Enter open  [ ] back/forward  q quit", Style::default().fg(p.border_inactive)),
    };
    f.render_widget(Paragraph::new(left), Rect::new(row.x, row.y, left_w, 1));
    f.render_widget(
        Paragraph::new(right_line),
        Rect::new(row.x + row.width - right_w, row.y, right_w, 1),
    );
}

/// Centre a `w`x`h` box in `area`, shift it by the drag offset and keep it on screen.
fn place(area: Rect, w: u16, h: u16, anchor: Option<(u16, u16)>, offset: (i16, i16)) -> Rect {
    let w = w.min(area.width);
    let h = h.min(area.height);
    let (base_x, base_y) = match anchor {
        Some((row, col)) => (col as i32, row as i32),
        None => (
            (area.x + area.width.saturating_sub(w) / 2) as i32,
            (area.y + area.height.saturating_sub(h) / 2) as i32,
        ),
    };
    let max_x = (area.x + area.width - w) as i32;
    let max_y = (area.y + area.height - h) as i32;
    let x = (base_x + offset.0 as i32).clamp(area.x as i32, max_x);
    let y = (base_y + offset.1 as i32).clamp(area.y as i32, max_y);
    Rect::new(x as u16, y as u16, w, h)
}

fn modal_frame(f: &mut Frame, rect: Rect, title: &str, border: ratatui::style::Color, p: &Palette, zones: &mut Vec<ClickZone>) -> Rect {
    f.render_widget(Clear, rect);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_set(ratatui::symbols::border::PLAIN)
        .border_style(Style::default().fg(border))
        .bg(p.menu_bg)
        .title(format!(" {} ", title));
    f.render_widget(block, rect);
    // Title row drags the window.
    zones.push(ClickZone {
        rect: Rect::new(rect.x, rect.y, rect.width, 1),
        action: Action::BeginDrag { row: rect.y, col: rect.x },
    });
    rect.inner(Margin { vertical: 1, horizontal: 2 })
}

fn button(f: &mut Frame, x: u16, y: u16, label: &str, bg: ratatui::style::Color, p: &Palette, action: Action, zones: &mut Vec<ClickZone>) -> u16 {
    let w = label.chars().count() as u16;
    let rect = Rect::new(x, y, w, 1);
    f.render_widget(
        Paragraph::new(label).style(Style::default().bg(bg).fg(p.bg).add_modifier(Modifier::BOLD)),
        rect,
    );
    zones.push(ClickZone { rect, action });
    x + w + 2
}

fn render_modal(app: &App, f: &mut Frame, area: Rect, floating: &Floating, zones: &mut Vec<ClickZone>) {
    let p = app.palette;
    let offset = floating.offset;
    match &floating.modal {
        Modal::Search(dialog) => {
            let rect = place(area, 64, 8, None, offset);
            let inner = modal_frame(f, rect, "Search", p.accent, &p, zones);
            let rows = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Length(1), Constraint::Length(1), Constraint::Length(1), Constraint::Length(1), Constraint::Min(0)])
                .split(inner);

            f.render_widget(
                Paragraph::new(Line::from(vec![
                    Span::styled("> ", Style::default().fg(p.accent)),
                    Span::styled(dialog.input.text.as_str(), Style::default().fg(p.fg)),
                ])),
                rows[0],
            );
            let cursor_x = rows[0].x + 2 + dialog.input.before_cursor().chars().count() as u16;
            f.set_cursor_position((cursor_x.min(rows[0].x + rows[0].width.saturating_sub(1)), rows[0].y));

            let mut x = rows[2].x;
            let mode = format!(" {} ", dialog.mode.label());
            x = button(f, x, rows[2].y, &mode, p.accent, &p, Action::ModalCycleMode, zones);
            let toggle = |on: bool| if on { p.hash } else { p.border_inactive };
            x = button(f, x, rows[2].y, " Aa ", toggle(dialog.flags.case_sensitive), &p, Action::ModalToggleCase, zones);
            button(f, x, rows[2].y, " .* ", toggle(dialog.flags.regex), &p, Action::ModalToggleRegex, zones);

            if let Some(err) = &dialog.error {
                f.render_widget(Paragraph::new(err.as_str()).style(Style::default().fg(p.error)), rows[3]);
            } else if matches!(dialog.mode, SearchMode::DiffContent | SearchMode::FilePath) {
                f.render_widget(
                    Paragraph::new("fetches diffs as it goes").style(Style::default().fg(p.muted)),
                    rows[3],
                );
            }
            f.render_widget(
                Paragraph::new("Enter search  Tab mode  F2 case  F3 regex  Esc close")
                    .style(Style::default().fg(p.border_inactive)),
                rows[4],
            );
        }
        Modal::ContextMenu(menu) => {
            let width = menu
                .items
                .iter()
                .map(|i| i.label.chars().count())
                .chain(std::iter::once(menu.title.chars().count()))
                .max()
                .unwrap_or(20)
                .clamp(20, 48) as u16
                + 6;
            let height = menu.items.len() as u16 + 2;
            let anchor = (menu.anchor != (0, 0)).then_some(menu.anchor);
            let rect = place(area, width, height, anchor, offset);
            let title: String = menu.title.chars().take(width.saturating_sub(4) as usize).collect();
            f.render_widget(Clear, rect);
            let block = Block::default()
                .borders(Borders::ALL)
                .border_set(ratatui::symbols::border::PLAIN)
                .border_style(Style::default().fg(p.hash))
                .bg(p.menu_bg)
                .title(title);
            f.render_widget(block, rect);
            let inner = rect.inner(Margin { vertical: 1, horizontal: 1 });
            for (i, item) in menu.items.iter().take(inner.height as usize).enumerate() {
                let item_area = Rect::new(inner.x, inner.y + i as u16, inner.width, 1);
                let style = if i == menu.selected {
                    Style::default().bg(p.selection_bg).fg(p.fg).add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(p.fg)
                };
                f.render_widget(Paragraph::new(format!(" {}", item.label)).style(style), item_area);
                zones.push(ClickZone {
                    rect: item_area,
                    action: Action::ModalChoose(i),
                });
            }
        }
        Modal::Prompt(prompt) => {
            let rect = place(area, 56, 7, None, offset);
            let inner = modal_frame(f, rect, &prompt.title, p.accent, &p, zones);
            let rows = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Length(1), Constraint::Length(1), Constraint::Length(1), Constraint::Min(0)])
                .split(inner);
            f.render_widget(Paragraph::new(format!("> {}", prompt.input.text)), rows[0]);
            let cursor_x = rows[0].x + 2 + prompt.input.before_cursor().chars().count() as u16;
            f.set_cursor_position((cursor_x.min(rows[0].x + rows[0].width.saturating_sub(1)), rows[0].y));
            if let Some(err) = &prompt.error {
                f.render_widget(Paragraph::new(err.as_str()).style(Style::default().fg(p.error)), rows[1]);
            }
            let x = button(f, rows[3].x, rows[3].y, " OK ", p.accent, &p, Action::ModalSubmit, zones);
            button(f, x, rows[3].y, " Cancel ", p.border_inactive, &p, Action::ModalCancel, zones);
        }
        Modal::Confirm(confirm) => {
            let rect = place(area, 60, 8, None, offset);
            let inner = modal_frame(f, rect, &confirm.title, p.error, &p, zones);
            let rows = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(0), Constraint::Length(1)])
                .split(inner);
            f.render_widget(
                Paragraph::new(confirm.body.as_str()).wrap(Wrap { trim: false }).style(Style::default().fg(p.fg)),
                rows[0],
            );
            let x = button(f, rows[1].x, rows[1].y, " Yes (y) ", p.error, &p, Action::ModalSubmit, zones);
            button(f, x, rows[1].y, " No (n) ", p.border_inactive, &p, Action::ModalCancel, zones);
        }
        Modal::Notification(note) => {
            let lines = note.body.lines().count().clamp(1, 12) as u16;
            let rect = place(area, 70, lines + 5, None, offset);
            let inner = modal_frame(f, rect, &note.title, p.error, &p, zones);
            let rows = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(0), Constraint::Length(1)])
                .split(inner);
            f.render_widget(
                Paragraph::new(note.body.as_str()).wrap(Wrap { trim: false }).style(Style::default().fg(p.fg)),
                rows[0],
            );
            button(f, rows[1].x, rows[1].y, " OK ", p.accent, &p, Action::ModalCancel, zones);
        }
        Modal::Output(out) => {
            let height = (out.lines.len() as u16 + 4).clamp(6, area.height.saturating_sub(4).max(6));
            let rect = place(area, area.width.saturating_sub(8).clamp(40, 110), height, None, offset);
            let border = if out.failed { p.error } else { p.accent };
            let inner = modal_frame(f, rect, &out.title, border, &p, zones);
            let rows = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(0), Constraint::Length(1)])
                .split(inner);
            let fg = if out.failed { p.error } else { p.fg };
            let lines: Vec<Line> = out
                .lines
                .iter()
                .skip(out.scroll)
                .take(rows[0].height as usize)
                .map(|l| Line::styled(l.as_str(), Style::default().fg(fg)))
                .collect();
            f.render_widget(Paragraph::new(lines), rows[0]);
            let x = button(f, rows[1].x, rows[1].y, " Close ", p.accent, &p, Action::ModalCancel, zones);
            f.render_widget(
                Paragraph::new(format!("{}/{}  j/k d/u scroll", out.scroll + 1, out.lines.len()))
                    .style(Style::default().fg(p.border_inactive)),
                Rect::new(x, rows[1].y, rows[1].width.saturating_sub(x - rows[1].x), 1),
            );
        }
        Modal::Help { scroll } => {
            let rect = place(area, 60, HELP.len() as u16 + 3, None, offset);
            let inner = modal_frame(f, rect, "Keys", p.accent, &p, zones);
            let lines: Vec<Line> = HELP
                .iter()
                .skip(*scroll)
                .map(|(keys, what)| {
                    Line::from(vec![
                        Span::styled(format!("{:<22}", keys), Style::default().fg(p.hash)),
                        Span::styled(*what, Style::default().fg(p.fg)),
                    ])
                })
                .collect();
            f.render_widget(Paragraph::new(lines), inner);
        }
    }
}
