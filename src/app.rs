//! Session context: owns the settings, model, search engine, jump history and
//! view state, and applies dispatched actions and fetch results to them.

use std::ops::Range;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use crate::config::{MAX_CONTEXT, Settings};
use crate::diff::{self, BlameTarget, CommitDiff, DiffKey, DiffRow, DiffSettings};
use crate::dispatch::{self, Action, ClickZone, Context, Input, ModalKind, MutationKind};
use crate::fetch::Completion;
use crate::graph::Graph;
use crate::input::TextInput;
use crate::jump::{ItemId, JumpHistory, Location};
use crate::logging::DebugLog;
use crate::model::{
    Commit, DiffEntry, InvalidateScope, LoadMore, Model, ModelEvent, PageState, RefKind, Reference, RefsState,
    short_id,
};
use crate::references::{self, RefRow};
use crate::search::{Direction, SearchEngine, SearchQuery, SearchStep};
use crate::source::{Mutation, RevisionSource};
use crate::theme::{self, Palette};
use crate::view::{
    CommandOutput, Confirm, ContextMenu, MenuItem, Modal, Notification, Prompt, PromptPurpose, SearchDialog, ViewId,
    ViewState, Views,
};

/// Loaded diff shown by the diff view.
pub struct DiffView {
    pub key: DiffKey,
    pub diff: Arc<CommitDiff>,
    pub rows: Vec<DiffRow>,
    commit: Option<Commit>,
}

/// Where to put the diff selection once the rows exist.
#[derive(Clone, Debug, PartialEq, Eq)]
enum DiffTarget {
    FirstRow,
    Row(usize),
    NewLine { path: String, line: u32 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SearchNav {
    First,
    Step(Direction, usize),
}

/// A search navigation waiting for history pages or diffs.
#[derive(Clone, Debug)]
struct PendingSearch {
    nav: SearchNav,
    origin: Location,
}

/// What the status bar needs for one frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    pub focused: ViewId,
    pub visible: Range<usize>,
    pub selected: usize,
    pub len: usize,
    pub can_back: bool,
    pub can_forward: bool,
    pub search: Option<String>,
    pub pending: Vec<String>,
    pub failures: Vec<String>,
}

pub struct App {
    pub settings: Settings,
    settings_path: Option<PathBuf>,
    pub model: Model,
    pub search: SearchEngine,
    pub history: JumpHistory,
    pub views: Views,
    pub debug_log: DebugLog,
    pub palette: Palette,
    pub zones: Vec<ClickZone>,
    pub status: Option<(String, Instant)>,
    pub should_quit: bool,

    ref_rows: Vec<RefRow>,
    graph: Graph,
    diff_view: Option<DiffView>,
    diff_target: Option<DiffTarget>,
    pending_search: Option<PendingSearch>,
    pending_origin: Option<BlameTarget>,
    reveal: Option<String>,
    mutation_anchor: Option<String>,
    /// Command output that finished while another modal was open.
    queued_output: Option<CommandOutput>,
    drag: Option<(u16, u16)>,
    clipboard: Option<String>,
}

impl App {
    /// Must be called inside a tokio runtime; starts loading the first page
    /// and the reference list.
    pub fn new(
        source: Arc<dyn RevisionSource>,
        filters: Vec<String>,
        settings: Settings,
        settings_path: Option<PathBuf>,
        debug_log: DebugLog,
    ) -> Self {
        let mut model = Model::new(
            source,
            filters,
            settings.diff_settings(),
            settings.diff_cache_capacity,
        );
        model.load_more(settings.page_size);
        model.load_references();

        Self {
            search: SearchEngine::new(settings.page_size, settings.search_prefetch),
            history: JumpHistory::with_capacity(settings.jump_history_limit),
            palette: theme::palette(settings.theme),
            settings,
            settings_path,
            model,
            views: Views::default(),
            debug_log,
            zones: Vec::new(),
            status: None,
            should_quit: false,
            ref_rows: Vec::new(),
            graph: Graph::default(),
            diff_view: None,
            diff_target: None,
            pending_search: None,
            pending_origin: None,
            reveal: None,
            mutation_anchor: None,
            queued_output: None,
            drag: None,
            clipboard: None,
        }
    }

    pub fn set_status<S: Into<String>>(&mut self, msg: S) {
        self.status = Some((msg.into(), Instant::now()));
    }

    pub fn maybe_expire_status(&mut self) -> bool {
        let ttl = self.settings.status_ttl();
        let expired = self.status.as_ref().is_some_and(|(_, t)| t.elapsed() >= ttl);
        if expired {
            self.status = None;
        }
        expired
    }

    pub fn take_pending_clipboard(&mut self) -> Option<String> {
        self.clipboard.take()
    }

    /// True while anything is still expected to change without user input.
    pub fn is_busy(&self) -> bool {
        !self.model.pending().is_empty() || self.pending_search.is_some() || self.reveal.is_some()
    }

    pub fn context(&self) -> Context {
        match self.views.modal() {
            Some(m) => Context::Modal(ModalKind::of(m)),
            None => Context::View(self.views.focused),
        }
    }

    pub fn handle_input(&mut self, input: Input) {
        let action = dispatch::lookup(self.context(), input, &self.zones);
        self.execute(action);
    }

    pub fn on_completion(&mut self, completion: Completion) {
        if let Some(event) = self.model.handle(completion) {
            self.on_model_event(event);
        }
    }

    /// Apply every completion already waiting.
    pub fn drain(&mut self) {
        for event in self.model.drain() {
            self.on_model_event(event);
        }
    }

    /// Per-iteration work after completions were applied.
    pub fn tick(&mut self) {
        self.maybe_expire_status();
        self.graph.sync(&self.model);
        if self.views.modal().is_none() {
            if let Some(output) = self.queued_output.take() {
                self.views.open_modal(Modal::Output(output));
            }
        }
        self.sync_diff_view();
        self.continue_reveal();
        self.continue_search();
        if self.search.is_active() {
            self.search.advance(self.settings.scan_budget, &mut self.model);
        }
        self.maybe_load_more();
    }

    // ----- accessors used by rendering -----

    pub fn diff_view(&self) -> Option<&DiffView> {
        self.diff_view.as_ref()
    }

    /// Cache state of the diff the diff view wants.
    pub fn diff_entry(&self) -> Option<DiffEntry> {
        let commit = self.views.diff_commit.as_deref()?;
        self.model.peek_diff(&self.model.diff_key(commit))
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn ref_rows(&self) -> &[RefRow] {
        &self.ref_rows
    }

    pub fn selected_commit(&self) -> Option<&Commit> {
        self.model.commit(self.views.log.selected)
    }

    pub fn selected_reference(&self) -> Option<&Reference> {
        references::reference_at(&self.ref_rows, self.model.references(), self.views.refs.selected)
    }

    pub fn len_of(&self, view: ViewId) -> usize {
        match view {
            ViewId::Log => self.model.len(),
            ViewId::Diff => self.diff_view.as_ref().map_or(0, |d| d.rows.len()),
            ViewId::References => self.ref_rows.len(),
            ViewId::DebugLog => self.debug_log.len(),
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        let focused = self.views.focused;
        let state = self.views.focused_state();
        let len = self.len_of(focused);
        let start = state.scroll.min(len);
        let end = (state.scroll + state.height).min(len);

        let pending = self
            .model
            .pending()
            .into_iter()
            .map(|p| format!("{} {:.1}s", p.label, p.elapsed.as_secs_f32()))
            .collect();

        let mut failures = Vec::new();
        if let PageState::Failed(e) = self.model.page_state() {
            failures.push(e.to_string());
        }
        if let RefsState::Failed(e) = self.model.refs_state() {
            failures.push(e.to_string());
        }
        if let Some(DiffEntry::Failed(e)) = self.diff_entry() {
            failures.push(e.to_string());
        }

        Snapshot {
            focused,
            visible: start..end,
            selected: state.selected,
            len,
            can_back: self.history.can_go_back(),
            can_forward: self.history.can_go_forward(),
            search: self.search.status(&self.model).map(|s| s.to_string()),
            pending,
            failures,
        }
    }

    // ----- actions -----

    pub fn execute(&mut self, action: Action) {
        match action {
            Action::Noop | Action::Resize => {}
            Action::Quit => self.should_quit = true,

            Action::MoveSelection(delta) => self.move_selection(delta),
            Action::PageDown | Action::PageUp => {
                let step = self.views.focused_state().height.max(2) as isize - 1;
                let delta = if action == Action::PageDown { step } else { -step };
                self.move_selection(delta);
            }
            Action::SelectFirst => self.select_edge(false),
            Action::SelectLast => self.select_edge(true),
            Action::ScrollRows(delta) => {
                let len = self.len_of(self.views.focused);
                self.views.focused_state_mut().scroll_by(delta, len);
            }
            Action::ScrollColumns(delta) => self.views.focused_state_mut().scroll_x_by(delta),
            Action::SelectRow { view, row } => self.select_row(view, row),

            Action::FocusView(view) => self.focus(view),
            Action::FocusNext => self.focus(self.views.focused.next()),
            Action::OpenDiff => self.open_diff(),
            Action::JumpToReference => self.jump_to_reference(),
            Action::ShowOrigin => self.show_origin(),
            Action::Back => {
                let current = self.current_location();
                match self.history.back(current) {
                    Some(target) => self.restore(target),
                    None => self.set_status("No previous location"),
                }
            }
            Action::Forward => {
                let current = self.current_location();
                match self.history.forward(current) {
                    Some(target) => self.restore(target),
                    None => self.set_status("No next location"),
                }
            }

            Action::OpenSearch => self.open_search(),
            Action::SearchNext => self.search_step(Direction::Next),
            Action::SearchPrevious => self.search_step(Direction::Previous),
            Action::ClearSearch => {
                if self.search.is_active() {
                    self.search.clear();
                    self.pending_search = None;
                    self.set_status("Search cleared");
                }
            }

            Action::Mutate(kind) => self.request_mutation(kind),

            Action::CopyId => self.copy_id(),
            Action::Reload => self.reload(),
            Action::RetryFetch => self.retry(),
            Action::CancelFetches => {
                let n = self.model.cancel_all();
                self.pending_search = None;
                self.pending_origin = None;
                self.reveal = None;
                self.set_status(format!("Cancelled {} request(s)", n));
            }
            Action::AdjustContext(delta) => {
                let mut ds = self.model.diff_settings();
                ds.context = (ds.context as i64 + delta as i64).clamp(0, MAX_CONTEXT as i64) as u32;
                self.apply_diff_settings(ds);
                self.set_status(format!("Diff context: {} lines", ds.context));
            }
            Action::ToggleWhitespace => {
                let mut ds = self.model.diff_settings();
                ds.ignore_whitespace = !ds.ignore_whitespace;
                self.apply_diff_settings(ds);
                self.set_status(if ds.ignore_whitespace {
                    "Ignoring whitespace"
                } else {
                    "Showing whitespace changes"
                });
            }
            Action::CycleTheme => {
                self.settings.theme = self.settings.theme.next();
                self.palette = theme::palette(self.settings.theme);
                self.save_settings();
                self.set_status(format!("Theme: {}", self.settings.theme.label()));
            }
            Action::ShowHelp => self.views.open_modal(Modal::Help { scroll: 0 }),
            Action::OpenCommand => self.open_command(),
            Action::OpenContextMenu { row, col } => self.open_context_menu(row, col),

            Action::ModalInput(ch) => self.edit_input(|t| t.insert_char(ch)),
            Action::ModalBackspace => self.edit_input(TextInput::backspace),
            Action::ModalDelete => self.edit_input(TextInput::delete),
            Action::ModalDeleteWord => self.edit_input(TextInput::delete_word),
            Action::ModalLeft => self.edit_input(TextInput::move_left),
            Action::ModalRight => self.edit_input(TextInput::move_right),
            Action::ModalHome => self.edit_input(TextInput::move_home),
            Action::ModalEnd => self.edit_input(TextInput::move_end),
            Action::ModalCycleMode => {
                if let Some(Modal::Search(d)) = self.views.modal_mut() {
                    d.mode = d.mode.cycle();
                    d.error = None;
                }
            }
            Action::ModalToggleCase => {
                if let Some(Modal::Search(d)) = self.views.modal_mut() {
                    d.flags.case_sensitive = !d.flags.case_sensitive;
                }
            }
            Action::ModalToggleRegex => {
                if let Some(Modal::Search(d)) = self.views.modal_mut() {
                    d.flags.regex = !d.flags.regex;
                    d.error = None;
                }
            }
            Action::ModalMove(delta) => match self.views.modal_mut() {
                Some(Modal::ContextMenu(menu)) if !menu.items.is_empty() => {
                    let len = menu.items.len() as isize;
                    menu.selected = (menu.selected as isize + delta).rem_euclid(len) as usize;
                }
                Some(Modal::Help { scroll }) => {
                    *scroll = (*scroll as isize + delta).max(0) as usize;
                }
                Some(Modal::Output(output)) => output.scroll_by(delta),
                _ => {}
            },
            Action::ModalChoose(idx) => self.choose_menu_item(idx),
            Action::ModalSubmit => self.submit_modal(),
            Action::ModalCancel => {
                self.views.close_modal();
                self.drag = None;
            }

            Action::BeginDrag { row, col } => self.drag = Some((row, col)),
            Action::DragTo { row, col } => {
                if let Some((r0, c0)) = self.drag {
                    let dx = col as i32 - c0 as i32;
                    let dy = row as i32 - r0 as i32;
                    self.views.drag_modal(dx as i16, dy as i16);
                    self.drag = Some((row, col));
                }
            }
            Action::EndDrag => self.drag = None,
        }
    }

    fn focus(&mut self, view: ViewId) {
        self.views.focused = view;
        match view {
            ViewId::References => {
                if matches!(self.model.refs_state(), RefsState::NotLoaded) {
                    self.model.load_references();
                }
            }
            ViewId::Diff => {
                if self.views.diff_commit.is_none() {
                    if let Some(id) = self.selected_commit().map(|c| c.id.clone()) {
                        self.show_diff_of(id, DiffTarget::FirstRow);
                    }
                }
                self.sync_diff_view();
            }
            ViewId::Log | ViewId::DebugLog => {}
        }
    }

    fn move_selection(&mut self, delta: isize) {
        let view = self.views.focused;
        let len = self.len_of(view);
        if view == ViewId::References {
            let next = references::move_selection(&self.ref_rows, self.views.refs.selected, delta);
            self.views.refs.select(next, len);
        } else {
            self.views.state_mut(view).move_by(delta, len);
        }
    }

    fn select_edge(&mut self, last: bool) {
        let view = self.views.focused;
        let len = self.len_of(view);
        if view == ViewId::References {
            let row = if last {
                references::move_selection(&self.ref_rows, 0, len as isize)
            } else {
                references::first_selectable(&self.ref_rows).unwrap_or(0)
            };
            self.views.refs.select(row, len);
            return;
        }
        let idx = if last { len.saturating_sub(1) } else { 0 };
        self.views.state_mut(view).select(idx, len);
        if last && view == ViewId::Log && !self.model.reached_end() {
            self.model.load_more(self.settings.page_size);
        }
    }

    fn select_row(&mut self, view: ViewId, row: usize) {
        if view == ViewId::References && !matches!(self.ref_rows.get(row), Some(RefRow::Ref { .. })) {
            return;
        }
        self.views.focused = view;
        let len = self.len_of(view);
        self.views.state_mut(view).select(row, len);
    }

    // ----- locations and jumps -----

    pub fn current_location(&self) -> Location {
        let view = self.views.focused;
        let state = self.views.state(view);
        let item = match view {
            ViewId::Log => ItemId::Commit(self.selected_commit().map(|c| c.id.clone()).unwrap_or_default()),
            ViewId::Diff => ItemId::DiffRow {
                commit: self.views.diff_commit.clone().unwrap_or_default(),
                row: state.selected,
            },
            ViewId::References => {
                ItemId::Reference(self.selected_reference().map(|r| r.name.clone()).unwrap_or_default())
            }
            ViewId::DebugLog => ItemId::DebugLine(state.selected),
        };
        Location::new(view, item, state.scroll)
    }

    fn restore(&mut self, location: Location) {
        self.views.focused = location.view;
        match location.item {
            ItemId::Commit(id) => self.select_commit(&id),
            ItemId::DiffRow { commit, row } => {
                if !commit.is_empty() {
                    self.show_diff_of(commit, DiffTarget::Row(row));
                }
            }
            ItemId::Reference(name) => {
                if let Some(row) = references::row_of(&self.ref_rows, self.model.references(), &name) {
                    let len = self.ref_rows.len();
                    self.views.refs.select(row, len);
                }
            }
            ItemId::DebugLine(line) => {
                let len = self.debug_log.len();
                self.views.debug.select(line, len);
            }
        }
        let state = self.views.state_mut(location.view);
        state.scroll = location.scroll;
        state.ensure_visible();
    }

    /// Select `id` in the log, paging history in until it shows up.
    fn select_commit(&mut self, id: &str) {
        if id.is_empty() {
            return;
        }
        match self.model.index_of(id) {
            Some(idx) => {
                let len = self.model.len();
                self.views.log.select(idx, len);
            }
            None => {
                self.reveal = Some(id.to_string());
                self.continue_reveal();
            }
        }
    }

    fn continue_reveal(&mut self) {
        let Some(id) = self.reveal.clone() else {
            return;
        };
        if let Some(idx) = self.model.index_of(&id) {
            self.reveal = None;
            let len = self.model.len();
            self.views.log.select(idx, len);
            return;
        }
        match self.model.load_more(self.settings.page_size) {
            LoadMore::Started(_) | LoadMore::InFlight(_) => {}
            LoadMore::Exhausted | LoadMore::Failed(_) => {
                self.reveal = None;
                let len = self.model.len();
                self.views.log.clamp(len);
                self.set_status(format!("{} is not in the loaded history", short_id(&id)));
            }
        }
    }

    fn open_diff(&mut self) {
        let Some(id) = self.selected_commit().map(|c| c.id.clone()) else {
            return;
        };
        self.history.push(self.current_location());
        self.show_diff_of(id, DiffTarget::FirstRow);
    }

    fn show_diff_of(&mut self, commit: String, target: DiffTarget) {
        if self.views.diff_commit.as_deref() != Some(commit.as_str()) {
            self.diff_view = None;
            self.views.diff = ViewState {
                height: self.views.diff.height,
                ..Default::default()
            };
        }
        self.views.diff_commit = Some(commit);
        self.diff_target = Some(target);
        self.views.focused = ViewId::Diff;
        self.sync_diff_view();
    }

    /// Rebuild the diff rows when the wanted diff arrives or its key changes.
    fn sync_diff_view(&mut self) {
        let Some(commit) = self.views.diff_commit.clone() else {
            self.diff_view = None;
            return;
        };
        let key = self.model.diff_key(&commit);

        if !self.diff_view.as_ref().is_some_and(|v| v.key == key) {
            self.diff_view = None;
            let entry = if self.views.focused == ViewId::Diff {
                self.model.get_diff(&key)
            } else {
                self.model.peek_diff(&key).unwrap_or(DiffEntry::Pending)
            };
            let DiffEntry::Loaded(diff) = entry else {
                return;
            };
            let meta = self.model.index_of(&commit).and_then(|i| self.model.commit(i)).cloned();
            let rows = diff::flatten(meta.as_ref(), &diff);
            self.diff_view = Some(DiffView {
                key,
                diff,
                rows,
                commit: meta,
            });
        }

        let Some(view) = self.diff_view.as_ref() else {
            return;
        };
        let len = view.rows.len();
        match self.diff_target.take() {
            Some(target) => {
                let row = match target {
                    DiffTarget::FirstRow => diff::first_diff_row(&view.rows),
                    DiffTarget::Row(row) => row,
                    DiffTarget::NewLine { path, line } => diff::row_for_new_line(&view.rows, &view.diff, &path, line)
                        .unwrap_or_else(|| diff::first_diff_row(&view.rows)),
                };
                self.views.diff.select(row, len);
            }
            None => self.views.diff.clamp(len),
        }
    }

    fn jump_to_reference(&mut self) {
        let Some(target) = self.selected_reference().map(|r| r.target.clone()) else {
            return;
        };
        self.history.push(self.current_location());
        self.views.focused = ViewId::Log;
        self.select_commit(&target);
    }

    fn show_origin(&mut self) {
        let Some(view) = self.diff_view.as_ref() else {
            self.set_status("Diff not loaded yet");
            return;
        };
        let Some(row) = view.rows.get(self.views.diff.selected) else {
            return;
        };
        let commit = view.commit.clone().unwrap_or_else(|| Commit {
            id: view.key.commit.clone(),
            parents: Vec::new(),
            author: String::new(),
            date: String::new(),
            subject: String::new(),
            body: String::new(),
            changes: None,
        });
        match diff::blame_target(&commit, &view.diff, row) {
            Some(target) => {
                tracing::debug!("tracing origin of {}:{} at {}", target.path, target.line, short_id(&target.rev));
                self.model.submit_blame(target.clone());
                self.pending_origin = Some(target);
                self.set_status("Tracing origin...");
            }
            None => self.set_status("No origin for this line"),
        }
    }

    // ----- search -----

    fn open_search(&mut self) {
        let mut dialog = SearchDialog::default();
        if let Some(q) = self.search.query() {
            dialog.input = TextInput::with_text(q.pattern.clone());
            dialog.mode = q.mode;
            dialog.flags = q.flags;
        }
        self.views.open_modal(Modal::Search(dialog));
    }

    fn submit_search(&mut self, dialog: SearchDialog) {
        let query = SearchQuery {
            mode: dialog.mode,
            flags: dialog.flags,
            pattern: dialog.input.text.clone(),
        };
        let start = self.views.log.selected;
        match self.search.search(query, start, &self.model) {
            Ok(()) => {
                self.views.close_modal();
                self.pending_search = Some(PendingSearch {
                    nav: SearchNav::First,
                    origin: self.current_location(),
                });
                self.continue_search();
            }
            Err(e) => {
                if let Some(Modal::Search(d)) = self.views.modal_mut() {
                    d.error = Some(e.to_string());
                }
            }
        }
    }

    fn search_step(&mut self, dir: Direction) {
        if !self.search.is_active() {
            self.set_status("No active search (press /)");
            return;
        }
        self.pending_search = Some(PendingSearch {
            nav: SearchNav::Step(dir, self.views.log.selected),
            origin: self.current_location(),
        });
        self.continue_search();
    }

    fn continue_search(&mut self) {
        let Some(pending) = self.pending_search.take() else {
            return;
        };
        self.search.sync(&self.model, self.views.log.selected);
        let step = match pending.nav {
            SearchNav::First => self.search.first(&mut self.model),
            SearchNav::Step(dir, from) => self.search.step(dir, from, &mut self.model),
        };
        match step {
            SearchStep::Found(idx) => {
                let moved = pending.origin.view != ViewId::Log || self.views.log.selected != idx;
                if moved {
                    self.history.push(pending.origin);
                }
                self.views.focused = ViewId::Log;
                let len = self.model.len();
                self.views.log.select(idx, len);
                if let Some(status) = self.search.status(&self.model) {
                    self.set_status(status.to_string());
                }
            }
            SearchStep::Pending => self.pending_search = Some(pending),
            SearchStep::NoMatches => {
                let pattern = self.search.query().map(|q| q.pattern.clone()).unwrap_or_default();
                self.set_status(format!("No matches for '{}'", pattern));
            }
        }
    }

    // ----- mutations -----

    fn commit_for_action(&self) -> Option<String> {
        match self.views.focused {
            ViewId::Log => self.selected_commit().map(|c| c.id.clone()),
            ViewId::Diff => self.views.diff_commit.clone(),
            ViewId::References | ViewId::DebugLog => None,
        }
    }

    fn request_mutation(&mut self, kind: MutationKind) {
        match kind {
            MutationKind::CherryPick
            | MutationKind::Revert
            | MutationKind::SoftReset
            | MutationKind::HardReset
            | MutationKind::CreateBranch
            | MutationKind::CreateTag => {
                let Some(commit) = self.commit_for_action() else {
                    self.set_status("No commit selected");
                    return;
                };
                let short = short_id(&commit).to_string();
                match kind {
                    MutationKind::CherryPick => self.submit_mutation(Mutation::CherryPick { commit }),
                    MutationKind::Revert => self.submit_mutation(Mutation::Revert { commit }),
                    MutationKind::SoftReset => self.submit_mutation(Mutation::SoftReset { commit }),
                    MutationKind::HardReset => self.views.open_modal(Modal::Confirm(Confirm {
                        title: "Hard reset".to_string(),
                        body: format!("Reset the current branch to {} and discard all local changes?", short),
                        mutation: Mutation::HardReset { commit },
                    })),
                    MutationKind::CreateBranch => self.open_prompt(
                        format!("New branch at {}", short),
                        String::new(),
                        PromptPurpose::CreateBranch { commit },
                    ),
                    _ => self.open_prompt(
                        format!("New tag at {}", short),
                        String::new(),
                        PromptPurpose::CreateTag { commit },
                    ),
                }
            }
            MutationKind::DeleteReference | MutationKind::PushReference | MutationKind::RenameReference => {
                let Some(reference) = self.selected_reference().cloned() else {
                    self.set_status("No reference selected");
                    return;
                };
                match kind {
                    MutationKind::DeleteReference => self.views.open_modal(Modal::Confirm(Confirm {
                        title: "Delete reference".to_string(),
                        body: format!("Delete {}?", reference.name),
                        mutation: Mutation::DeleteReference { reference },
                    })),
                    MutationKind::PushReference => self.submit_mutation(Mutation::PushReference { reference }),
                    _ => self.open_prompt(
                        format!("Rename {}", reference.name),
                        reference.name.clone(),
                        PromptPurpose::RenameReference { reference },
                    ),
                }
            }
        }
    }

    fn open_prompt(&mut self, title: String, text: String, purpose: PromptPurpose) {
        self.views.open_modal(Modal::Prompt(Prompt {
            title,
            input: TextInput::with_text(text),
            purpose,
            error: None,
        }));
    }

    /// `:` prompt for a git command run against the focused commit or reference.
    fn open_command(&mut self) {
        let target = match self.views.focused {
            ViewId::References => self.selected_reference().map(|r| r.name.clone()),
            _ => self.commit_for_action(),
        };
        let title = match &target {
            Some(t) => format!("git ... {}", short_id(t)),
            None => "git ...".to_string(),
        };
        self.open_prompt(title, String::new(), PromptPurpose::GitCommand { commit: target });
    }

    fn submit_command(&mut self, text: &str, target: Option<String>) {
        let mut args: Vec<String> = text.split_whitespace().map(str::to_string).collect();
        if args.first().is_some_and(|a| a == "git") {
            args.remove(0);
        }
        if args.is_empty() {
            if let Some(Modal::Prompt(p)) = self.views.modal_mut() {
                p.error = Some("Command must not be empty".to_string());
            }
            return;
        }
        args.extend(target);
        self.views.close_modal();
        let label = format!("git {}", args.join(" "));
        match self.model.submit_command(args) {
            Some(_) => self.set_status(format!("Running {}...", label)),
            None => self.set_status("Another command is still running"),
        }
    }

    fn submit_prompt(&mut self, prompt: Prompt) {
        if let PromptPurpose::GitCommand { commit } = prompt.purpose {
            self.submit_command(&prompt.input.text, commit);
            return;
        }
        let name = prompt.input.text.trim().to_string();
        let problem = if name.is_empty() {
            Some("Name must not be empty")
        } else if name.chars().any(char::is_whitespace) {
            Some("Name must not contain spaces")
        } else if name.starts_with('-') {
            Some("Name must not start with '-'")
        } else {
            None
        };
        if let Some(problem) = problem {
            if let Some(Modal::Prompt(p)) = self.views.modal_mut() {
                p.error = Some(problem.to_string());
            }
            return;
        }

        let mutation = match prompt.purpose {
            PromptPurpose::CreateBranch { commit } => Mutation::CreateBranch { name, commit },
            PromptPurpose::CreateTag { commit } => Mutation::CreateTag { name, commit },
            PromptPurpose::RenameReference { reference } => {
                if reference.name == name {
                    self.views.close_modal();
                    return;
                }
                Mutation::RenameReference {
                    reference,
                    new_name: name,
                }
            }
            PromptPurpose::GitCommand { .. } => return,
        };
        self.views.close_modal();
        self.submit_mutation(mutation);
    }

    fn submit_mutation(&mut self, mutation: Mutation) {
        let anchor = self.selected_commit().map(|c| c.id.clone());
        let describe = mutation.describe();
        match self.model.submit_mutation(mutation) {
            Some(_) => {
                self.mutation_anchor = anchor;
                self.set_status(format!("Running {}...", describe));
            }
            None => self.set_status("Another operation is still running"),
        }
    }

    // ----- modals -----

    fn edit_input(&mut self, edit: impl FnOnce(&mut TextInput)) {
        match self.views.modal_mut() {
            Some(Modal::Search(d)) => {
                edit(&mut d.input);
                d.error = None;
            }
            Some(Modal::Prompt(p)) => {
                edit(&mut p.input);
                p.error = None;
            }
            _ => {}
        }
    }

    fn submit_modal(&mut self) {
        let Some(modal) = self.views.modal().cloned() else {
            return;
        };
        match modal {
            Modal::Search(dialog) => self.submit_search(dialog),
            Modal::ContextMenu(menu) => self.choose_menu_item(menu.selected),
            Modal::Prompt(prompt) => self.submit_prompt(prompt),
            Modal::Confirm(confirm) => {
                self.views.close_modal();
                self.submit_mutation(confirm.mutation);
            }
            Modal::Notification(_) | Modal::Output(_) | Modal::Help { .. } => {
                self.views.close_modal();
            }
        }
    }

    fn choose_menu_item(&mut self, idx: usize) {
        let action = match self.views.modal() {
            Some(Modal::ContextMenu(menu)) => menu.items.get(idx).map(|i| i.action.clone()),
            _ => None,
        };
        if let Some(action) = action {
            self.views.close_modal();
            self.execute(action);
        }
    }

    fn open_context_menu(&mut self, row: u16, col: u16) {
        if (row, col) != (0, 0) {
            let under_pointer = self.zones.iter().rev().find_map(|z| {
                let inside = row >= z.rect.y
                    && row < z.rect.y.saturating_add(z.rect.height)
                    && col >= z.rect.x
                    && col < z.rect.x.saturating_add(z.rect.width);
                match z.action {
                    Action::SelectRow { .. } if inside => Some(z.action.clone()),
                    _ => None,
                }
            });
            if let Some(select) = under_pointer {
                self.execute(select);
            }
        }

        let item = |label: &str, action: Action| MenuItem {
            label: label.to_string(),
            action,
        };
        let (title, items) = match self.views.focused {
            ViewId::Log => match self.selected_commit() {
                Some(c) => (
                    format!("{} {}", c.short_id(), c.subject),
                    vec![
                        item("Open diff", Action::OpenDiff),
                        item("Copy commit id", Action::CopyId),
                        item("Cherry-pick", Action::Mutate(MutationKind::CherryPick)),
                        item("Revert", Action::Mutate(MutationKind::Revert)),
                        item("Create branch here...", Action::Mutate(MutationKind::CreateBranch)),
                        item("Create tag here...", Action::Mutate(MutationKind::CreateTag)),
                        item("Soft reset to here", Action::Mutate(MutationKind::SoftReset)),
                        item("Hard reset to here...", Action::Mutate(MutationKind::HardReset)),
                        item("Run git command...", Action::OpenCommand),
                    ],
                ),
                None => return,
            },
            ViewId::Diff => (
                "Diff".to_string(),
                vec![
                    item("Show origin of line", Action::ShowOrigin),
                    item("Copy commit id", Action::CopyId),
                    item("Run git command...", Action::OpenCommand),
                    item("Back", Action::Back),
                ],
            ),
            ViewId::References => match self.selected_reference() {
                Some(r) => {
                    let mut items = vec![item("Show in log", Action::JumpToReference)];
                    if r.kind != RefKind::RemoteBranch {
                        items.push(item("Push", Action::Mutate(MutationKind::PushReference)));
                        items.push(item("Rename...", Action::Mutate(MutationKind::RenameReference)));
                    }
                    items.push(item("Delete...", Action::Mutate(MutationKind::DeleteReference)));
                    items.push(item("Run git command...", Action::OpenCommand));
                    (r.name.clone(), items)
                }
                None => return,
            },
            ViewId::DebugLog => return,
        };
        self.views.open_modal(Modal::ContextMenu(ContextMenu {
            title,
            items,
            selected: 0,
            anchor: (row, col),
        }));
    }

    // ----- misc -----

    fn copy_id(&mut self) {
        let id = match self.views.focused {
            ViewId::References => self.selected_reference().map(|r| r.target.clone()),
            _ => self.commit_for_action(),
        };
        match id {
            Some(id) => self.clipboard = Some(id),
            None => self.set_status("Nothing to copy"),
        }
    }

    fn reload(&mut self) {
        let anchor = self.selected_commit().map(|c| c.id.clone());
        self.model.invalidate(InvalidateScope::All);
        self.diff_view = None;
        if self.views.diff_commit.is_some() {
            self.diff_target = Some(DiffTarget::Row(self.views.diff.selected));
        }
        self.pending_origin = None;
        self.ref_rows.clear();
        self.model.load_more(self.settings.page_size);
        self.model.load_references();
        if let Some(id) = anchor {
            self.reveal = Some(id);
        }
        self.set_status("Reloading...");
    }

    fn retry(&mut self) {
        match self.views.focused {
            ViewId::Log => {
                if matches!(self.model.page_state(), PageState::Failed(_)) {
                    self.model.retry_load(self.settings.page_size);
                }
            }
            ViewId::Diff => {
                if let Some(commit) = self.views.diff_commit.clone() {
                    let key = self.model.diff_key(&commit);
                    self.diff_view = None;
                    self.model.retry_diff(&key);
                }
            }
            ViewId::References => {
                if matches!(self.model.refs_state(), RefsState::Failed(_)) {
                    self.model.load_references();
                }
            }
            ViewId::DebugLog => {}
        }
    }

    fn apply_diff_settings(&mut self, ds: DiffSettings) {
        self.model.set_diff_settings(ds);
        self.settings.set_diff_settings(ds);
        self.save_settings();
        if self.views.diff_commit.is_some() {
            self.diff_target = Some(DiffTarget::Row(self.views.diff.selected));
        }
        self.sync_diff_view();
    }

    fn save_settings(&self) {
        let Some(path) = self.settings_path.as_ref() else {
            return;
        };
        if let Err(e) = self.settings.save_to(path) {
            tracing::warn!("cannot save settings to {}: {}", path.display(), e);
        }
    }

    fn maybe_load_more(&mut self) {
        if self.views.focused != ViewId::Log || self.model.reached_end() {
            return;
        }
        if !matches!(self.model.page_state(), PageState::Idle) {
            return;
        }
        let len = self.model.len();
        let state = &self.views.log;
        let threshold = self.settings.prefetch_threshold;
        let near_end = state.selected + threshold >= len || state.scroll + state.height + threshold >= len;
        if near_end {
            self.model.load_more(self.settings.page_size);
        }
    }

    fn rebuild_ref_rows(&mut self) {
        let selected = self.selected_reference().map(|r| r.name.clone());
        self.ref_rows = references::build_rows(self.model.references());
        let len = self.ref_rows.len();
        let row = selected
            .and_then(|name| references::row_of(&self.ref_rows, self.model.references(), &name))
            .or_else(|| references::first_selectable(&self.ref_rows))
            .unwrap_or(0);
        self.views.refs.select(row, len);
    }

    fn on_model_event(&mut self, event: ModelEvent) {
        match event {
            ModelEvent::CommitsLoaded { .. } => {
                self.continue_reveal();
            }
            ModelEvent::CommitsFailed(e) => self.set_status(e.to_string()),
            ModelEvent::DiffLoaded(_) => self.sync_diff_view(),
            ModelEvent::DiffFailed(key, e) => {
                if self.views.diff_commit.as_deref() == Some(key.commit.as_str()) {
                    self.set_status(e.to_string());
                }
            }
            ModelEvent::ReferencesLoaded => self.rebuild_ref_rows(),
            ModelEvent::ReferencesFailed(e) => self.set_status(e.to_string()),
            ModelEvent::BlameResolved { target, result } => {
                if self.pending_origin.as_ref() != Some(&target) {
                    return;
                }
                self.pending_origin = None;
                match result {
                    Ok(origin) => {
                        self.history.push(self.current_location());
                        self.set_status(format!(
                            "Origin: {} {}:{}",
                            short_id(&origin.commit),
                            origin.path,
                            origin.line
                        ));
                        match self.model.index_of(&origin.commit) {
                            Some(idx) => {
                                self.views.focused = ViewId::Log;
                                let len = self.model.len();
                                self.views.log.select(idx, len);
                            }
                            None => self.show_diff_of(
                                origin.commit,
                                DiffTarget::NewLine {
                                    path: origin.path,
                                    line: origin.line,
                                },
                            ),
                        }
                    }
                    Err(e) => self.set_status(e.to_string()),
                }
            }
            ModelEvent::MutationSucceeded(mutation) => {
                self.set_status(format!("Done: {}", mutation.describe()));
                let scopes = mutation.scopes();
                if scopes.contains(&InvalidateScope::CommitList) {
                    if let Some(anchor) = self.mutation_anchor.take() {
                        self.reveal = Some(anchor);
                    }
                    self.model.load_more(self.settings.page_size);
                }
                if scopes.contains(&InvalidateScope::References) {
                    self.rebuild_ref_rows();
                    self.model.load_references();
                }
            }
            ModelEvent::MutationFailed(mutation, e) => {
                self.mutation_anchor = None;
                self.views.open_modal(Modal::Notification(Notification {
                    title: format!("{} failed", mutation.operation()),
                    body: e.detail,
                }));
            }
            ModelEvent::CommandFinished { args, result } => {
                let title = format!("git {}", args.join(" "));
                let output = match result {
                    Ok(text) => CommandOutput::new(title.as_str(), &text, false),
                    Err(e) => CommandOutput::new(format!("{} failed", title), &e.detail, true),
                };
                if self.views.modal().is_some() {
                    self.set_status(format!("{} finished", title));
                    self.queued_output = Some(output);
                } else {
                    self.views.open_modal(Modal::Output(output));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::BlameOrigin;
    use crate::search::SearchMode;
    use crate::source::fake::{self, FakeSource};
    use crossterm::event::{KeyCode, KeyModifiers};
    use std::time::Duration;

    fn app_with(source: Arc<FakeSource>) -> App {
        let settings = Settings {
            page_size: 50,
            ..Settings::default()
        };
        App::new(source, vec!["--all".to_string()], settings, None, DebugLog::new(100))
    }

    /// Run ticks and apply completions until nothing is in flight.
    async fn settle(app: &mut App) {
        loop {
            app.tick();
            if app.model.pending().is_empty() {
                app.tick();
                if app.model.pending().is_empty() {
                    return;
                }
            }
            let c = tokio::time::timeout(Duration::from_secs(5), app.model.recv())
                .await
                .expect("timed out")
                .expect("channel closed");
            app.on_completion(c);
        }
    }

    fn key(c: char) -> Input {
        Input::Key(KeyCode::Char(c), KeyModifiers::NONE)
    }

    fn enter() -> Input {
        Input::Key(KeyCode::Enter, KeyModifiers::NONE)
    }

    #[tokio::test]
    async fn test_open_diff_back_and_forward() {
        let source = Arc::new(FakeSource::with_commits(fake::linear(3)));
        source.set_diff("c2", vec![fake::file("a.rs", &[" ctx", "+added"])]);
        let mut app = app_with(source);
        settle(&mut app).await;

        app.handle_input(key('j'));
        assert_eq!(app.selected_commit().map(|c| c.id.as_str()), Some("c2"));
        app.handle_input(enter());
        settle(&mut app).await;

        assert_eq!(app.views.focused, ViewId::Diff);
        let rows = &app.diff_view().unwrap().rows;
        assert_eq!(app.views.diff.selected, diff::first_diff_row(rows));
        assert!(app.history.can_go_back());

        app.handle_input(Input::Key(KeyCode::Left, KeyModifiers::ALT));
        assert_eq!(app.views.focused, ViewId::Log);
        assert_eq!(app.views.log.selected, 1);
        assert!(app.history.can_go_forward());

        app.handle_input(Input::Key(KeyCode::Right, KeyModifiers::ALT));
        assert_eq!(app.views.focused, ViewId::Diff);
        assert_eq!(app.views.diff_commit.as_deref(), Some("c2"));
    }

    #[tokio::test]
    async fn test_snapshot_reports_fetches_failures_and_history() {
        let source = Arc::new(FakeSource::with_commits(fake::linear(3)));
        source.set_diff("c3", vec![fake::file("a.rs", &["+x"])]);
        *source.fail_commits.lock() = true;
        *source.delay.lock() = Some(Duration::from_millis(20));
        let mut app = app_with(source.clone());

        let snap = app.snapshot();
        assert!(snap.pending.iter().any(|p| p.starts_with("loading commits from 0")));
        assert!(snap.pending.iter().any(|p| p.starts_with("loading references")));
        assert!(snap.failures.is_empty());

        settle(&mut app).await;
        let snap = app.snapshot();
        assert!(snap.pending.is_empty());
        assert_eq!(snap.failures, vec!["git log failed: boom".to_string()]);
        assert_eq!(snap.len, 0);

        *source.fail_commits.lock() = false;
        app.execute(Action::RetryFetch);
        assert!(app.snapshot().pending.iter().any(|p| p.starts_with("loading commits")));
        settle(&mut app).await;
        app.views.log.height = 2;
        let snap = app.snapshot();
        assert!(snap.failures.is_empty());
        assert_eq!((snap.len, snap.visible.clone()), (3, 0..2));
        assert!(!snap.can_back && !snap.can_forward);

        app.handle_input(enter());
        settle(&mut app).await;
        let snap = app.snapshot();
        assert_eq!(snap.focused, ViewId::Diff);
        assert!(snap.can_back && !snap.can_forward);

        app.execute(Action::Back);
        let snap = app.snapshot();
        assert_eq!(snap.focused, ViewId::Log);
        assert!(!snap.can_back && snap.can_forward);

        app.execute(Action::Forward);
        let snap = app.snapshot();
        assert!(snap.can_back && !snap.can_forward);
    }

    fn type_text(app: &mut App, text: &str) {
        for ch in text.chars() {
            app.handle_input(key(ch));
        }
    }

    #[tokio::test]
    async fn test_command_runs_against_selected_commit() {
        let source = Arc::new(FakeSource::with_commits(fake::linear(3)));
        let mut app = app_with(source.clone());
        settle(&mut app).await;

        app.handle_input(key('j'));
        app.handle_input(key(':'));
        assert!(matches!(
            app.views.modal(),
            Some(Modal::Prompt(Prompt { purpose: PromptPurpose::GitCommand { commit: Some(c) }, .. })) if c == "c2"
        ));
        app.handle_input(enter());
        match app.views.modal() {
            Some(Modal::Prompt(p)) => assert_eq!(p.error.as_deref(), Some("Command must not be empty")),
            other => panic!("unexpected {:?}", other),
        }

        type_text(&mut app, "git show --stat");
        app.handle_input(enter());
        settle(&mut app).await;

        let args = vec!["show".to_string(), "--stat".to_string(), "c2".to_string()];
        assert_eq!(source.commands.lock().as_slice(), &[args]);
        match app.views.modal() {
            Some(Modal::Output(out)) => {
                assert_eq!(out.title, "git show --stat c2");
                assert_eq!(out.lines, vec!["git show --stat c2".to_string()]);
                assert!(!out.failed);
            }
            other => panic!("unexpected {:?}", other),
        }
        app.handle_input(key('q'));
        assert!(app.views.modal().is_none());
    }

    #[tokio::test]
    async fn test_command_output_waits_for_open_modal() {
        let source = Arc::new(FakeSource::with_commits(fake::linear(3)));
        *source.command_output.lock() = Some(Err("fatal: bad revision".to_string()));
        let mut app = app_with(source.clone());
        settle(&mut app).await;
        *source.delay.lock() = Some(Duration::from_millis(20));

        app.handle_input(key(':'));
        type_text(&mut app, "log");
        app.handle_input(enter());
        app.handle_input(key('?'));
        settle(&mut app).await;

        assert!(matches!(app.views.modal(), Some(Modal::Help { .. })));
        assert_eq!(app.status.as_ref().map(|(s, _)| s.as_str()), Some("git log c3 finished"));

        app.handle_input(key('q'));
        app.tick();
        match app.views.modal() {
            Some(Modal::Output(out)) => {
                assert_eq!(out.title, "git log c3 failed");
                assert_eq!(out.lines, vec!["fatal: bad revision".to_string()]);
                assert!(out.failed);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_graph_follows_reloaded_log() {
        let mut commits = vec![fake::commit("m", &["c3", "side"], "merge")];
        commits.extend(fake::linear(3));
        let source = Arc::new(FakeSource::with_commits(commits));
        let mut app = app_with(source.clone());
        settle(&mut app).await;

        assert_eq!(app.graph().width(), 2);
        assert!(app.graph().row(3).is_some());
        assert_eq!(app.graph().open_lanes(), vec![1]);

        source.commits.lock().remove(0);
        app.handle_input(key('r'));
        settle(&mut app).await;
        assert_eq!(app.graph().width(), 1);
        assert!(app.graph().row(3).is_none());
        assert!(app.graph().open_lanes().is_empty());
    }

    #[tokio::test]
    async fn test_focus_switch_does_not_push_history() {
        let source = Arc::new(FakeSource::with_commits(fake::linear(3)));
        let mut app = app_with(source);
        settle(&mut app).await;
        app.handle_input(key('3'));
        app.handle_input(key('1'));
        app.handle_input(key('j'));
        app.execute(Action::ScrollRows(1));
        assert!(!app.history.can_go_back());
    }

    #[tokio::test]
    async fn test_failed_soft_reset_keeps_selection_and_history() {
        let source = Arc::new(FakeSource::with_commits(fake::linear(5)));
        *source.fail_mutation.lock() = Some("cannot reset: conflict".to_string());
        let mut app = app_with(source.clone());
        settle(&mut app).await;

        app.handle_input(key('j'));
        app.handle_input(key('j'));
        app.handle_input(enter());
        settle(&mut app).await;
        app.execute(Action::Back);
        let back_len = app.history.back_len();
        let forward_len = app.history.forward_len();
        let generation = app.model.generation();

        app.handle_input(key('s'));
        settle(&mut app).await;

        assert_eq!(source.mutations.lock().len(), 1);
        match app.views.modal() {
            Some(Modal::Notification(n)) => {
                assert_eq!(n.title, "soft reset failed");
                assert_eq!(n.body, "cannot reset: conflict");
            }
            other => panic!("expected a notification, got {:?}", other),
        }
        assert_eq!(app.views.log.selected, 2);
        assert_eq!(app.model.len(), 5);
        assert_eq!(app.model.generation(), generation);
        assert_eq!(app.history.back_len(), back_len);
        assert_eq!(app.history.forward_len(), forward_len);

        // Mutating keys are inert while the notification is up.
        app.handle_input(key('s'));
        settle(&mut app).await;
        assert_eq!(source.mutations.lock().len(), 1);
        app.handle_input(Input::Key(KeyCode::Esc, KeyModifiers::NONE));
        assert!(app.views.modal().is_none());
    }

    #[tokio::test]
    async fn test_successful_revert_reloads_and_reselects() {
        let source = Arc::new(FakeSource::with_commits(fake::linear(4)));
        let mut app = app_with(source.clone());
        settle(&mut app).await;
        app.handle_input(key('j'));
        let epoch = app.model.log_epoch();

        app.handle_input(key('v'));
        settle(&mut app).await;

        assert_eq!(app.model.log_epoch(), epoch + 1);
        assert_eq!(app.model.len(), 4);
        assert_eq!(app.selected_commit().map(|c| c.id.as_str()), Some("c3"));
    }

    #[tokio::test]
    async fn test_search_message_walks_matches_and_wraps() {
        let commits = vec![
            fake::commit("a5", &["a4"], "fix parser"),
            fake::commit("a4", &["a3"], "add feature"),
            fake::commit("a3", &["a2"], "Fix lexer"),
            fake::commit("a2", &["a1"], "docs"),
            fake::commit("a1", &[], "prefix cleanup"),
        ];
        let source = Arc::new(FakeSource::with_commits(commits));
        let mut app = app_with(source);
        settle(&mut app).await;

        app.handle_input(key('/'));
        for ch in "fix".chars() {
            app.handle_input(key(ch));
        }
        app.handle_input(enter());
        settle(&mut app).await;
        assert!(app.views.modal().is_none());
        assert_eq!(app.views.log.selected, 0);

        app.handle_input(key('n'));
        settle(&mut app).await;
        assert_eq!(app.views.log.selected, 2);
        app.handle_input(key('n'));
        settle(&mut app).await;
        assert_eq!(app.views.log.selected, 4);
        app.handle_input(key('n'));
        settle(&mut app).await;
        assert_eq!(app.views.log.selected, 0);
        assert_eq!(app.snapshot().search.as_deref(), Some("match 1 of 3"));

        app.handle_input(key('N'));
        settle(&mut app).await;
        assert_eq!(app.views.log.selected, 4);
    }

    #[tokio::test]
    async fn test_empty_search_reports_error_in_dialog() {
        let source = Arc::new(FakeSource::with_commits(fake::linear(2)));
        let mut app = app_with(source);
        settle(&mut app).await;
        app.handle_input(key('/'));
        app.handle_input(enter());
        match app.views.modal() {
            Some(Modal::Search(d)) => assert!(d.error.is_some()),
            other => panic!("expected search dialog, got {:?}", other),
        }
        assert!(!app.search.is_active());
        assert!(app.search.matches().is_empty());
    }

    #[tokio::test]
    async fn test_show_origin_of_removed_line_jumps_to_loaded_commit() {
        let source = Arc::new(FakeSource::with_commits(fake::linear(3)));
        source.set_diff("c3", vec![fake::file("lib.rs", &["-old", "+new"])]);
        source.blame.lock().insert(
            BlameTarget {
                rev: "c2".to_string(),
                path: "lib.rs".to_string(),
                line: 1,
            },
            BlameOrigin {
                commit: "c1".to_string(),
                path: "lib.rs".to_string(),
                line: 1,
            },
        );
        let mut app = app_with(source);
        settle(&mut app).await;

        app.handle_input(enter());
        settle(&mut app).await;
        assert_eq!(app.views.focused, ViewId::Diff);
        app.handle_input(key('b'));
        settle(&mut app).await;

        assert_eq!(app.views.focused, ViewId::Log);
        assert_eq!(app.selected_commit().map(|c| c.id.as_str()), Some("c1"));

        app.execute(Action::Back);
        assert_eq!(app.views.focused, ViewId::Diff);
        assert_eq!(app.views.diff_commit.as_deref(), Some("c3"));
    }

    #[tokio::test]
    async fn test_reference_jump_selects_target() {
        let source = Arc::new(FakeSource::with_commits(fake::linear(4)));
        *source.refs.lock() = crate::source::RefList {
            refs: vec![Reference {
                name: "v0.1".to_string(),
                kind: RefKind::Tag,
                target: "c2".to_string(),
                is_head: false,
            }],
            head: None,
        };
        let mut app = app_with(source);
        settle(&mut app).await;

        app.handle_input(key('3'));
        assert_eq!(app.selected_reference().map(|r| r.name.as_str()), Some("v0.1"));
        app.handle_input(enter());
        assert_eq!(app.views.focused, ViewId::Log);
        assert_eq!(app.selected_commit().map(|c| c.id.as_str()), Some("c2"));
        assert!(app.history.can_go_back());
    }

    #[tokio::test]
    async fn test_diff_options_change_key_and_refetch() {
        let source = Arc::new(FakeSource::with_commits(fake::linear(2)));
        source.set_diff("c2", vec![fake::file("a.rs", &["+x"])]);
        let mut app = app_with(source.clone());
        settle(&mut app).await;
        app.handle_input(enter());
        settle(&mut app).await;
        let before = app.diff_view().unwrap().key.clone();

        app.handle_input(key('+'));
        settle(&mut app).await;
        let after = app.diff_view().unwrap().key.clone();
        assert_eq!(after.context, before.context + 1);
        assert_eq!(fake::calls(&source.diff_calls), 2);
        assert_eq!(app.settings.diff_context, after.context);
    }

    #[tokio::test]
    async fn test_hard_reset_needs_confirmation() {
        let source = Arc::new(FakeSource::with_commits(fake::linear(2)));
        let mut app = app_with(source.clone());
        settle(&mut app).await;
        app.handle_input(key('S'));
        assert!(matches!(app.views.modal(), Some(Modal::Confirm(_))));
        assert!(source.mutations.lock().is_empty());
        app.handle_input(key('y'));
        settle(&mut app).await;
        assert_eq!(
            source.mutations.lock().as_slice(),
            &[Mutation::HardReset { commit: "c2".to_string() }]
        );
    }

    #[tokio::test]
    async fn test_branch_prompt_validates_name() {
        let source = Arc::new(FakeSource::with_commits(fake::linear(1)));
        let mut app = app_with(source.clone());
        settle(&mut app).await;
        app.handle_input(key('B'));
        app.handle_input(enter());
        assert!(matches!(app.views.modal(), Some(Modal::Prompt(p)) if p.error.is_some()));
        for ch in "topic".chars() {
            app.handle_input(key(ch));
        }
        app.handle_input(enter());
        settle(&mut app).await;
        assert_eq!(
            source.mutations.lock().as_slice(),
            &[Mutation::CreateBranch {
                name: "topic".to_string(),
                commit: "c1".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_drag_moves_modal_only() {
        let source = Arc::new(FakeSource::with_commits(fake::linear(3)));
        let mut app = app_with(source);
        settle(&mut app).await;
        app.handle_input(key('j'));
        let log = app.views.log.clone();
        app.handle_input(key('?'));
        app.execute(Action::BeginDrag { row: 5, col: 10 });
        app.handle_input(Input::Drag { row: 7, col: 4 });
        app.handle_input(Input::Release);
        assert_eq!(app.views.modal.as_ref().map(|f| f.offset), Some((-6, 2)));
        assert_eq!(app.views.log, log);
    }

    #[tokio::test]
    async fn test_file_path_search_mode() {
        let source = Arc::new(FakeSource::with_commits(fake::linear(3)));
        source.set_diff("c3", vec![fake::file("README.md", &["+a"])]);
        source.set_diff("c2", vec![fake::file("src/main.rs", &["+b"])]);
        source.set_diff("c1", vec![fake::file("Cargo.toml", &["+c"])]);
        let mut app = app_with(source);
        settle(&mut app).await;

        app.handle_input(key('/'));
        app.handle_input(Input::Key(KeyCode::Tab, KeyModifiers::NONE));
        match app.views.modal() {
            Some(Modal::Search(d)) => assert_eq!(d.mode, SearchMode::FilePath),
            other => panic!("expected search dialog, got {:?}", other),
        }
        for ch in "main.rs".chars() {
            app.handle_input(key(ch));
        }
        app.handle_input(enter());
        settle(&mut app).await;
        assert_eq!(app.selected_commit().map(|c| c.id.as_str()), Some("c2"));
    }
}
