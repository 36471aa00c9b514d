//! Focus, per-view selection/scroll, and the modal overlays.

use crate::dispatch::Action;
use crate::input::TextInput;
use crate::model::Reference;
use crate::search::{SearchFlags, SearchMode};
use crate::source::Mutation;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ViewId {
    Log,
    Diff,
    References,
    DebugLog,
}

impl ViewId {
    pub const ALL: [ViewId; 4] = [ViewId::Log, ViewId::Diff, ViewId::References, ViewId::DebugLog];

    pub fn label(self) -> &'static str {
        match self {
            ViewId::Log => "Log",
            ViewId::Diff => "Diff",
            ViewId::References => "Refs",
            ViewId::DebugLog => "Debug",
        }
    }

    pub fn next(self) -> Self {
        match self {
            ViewId::Log => ViewId::Diff,
            ViewId::Diff => ViewId::References,
            ViewId::References => ViewId::DebugLog,
            ViewId::DebugLog => ViewId::Log,
        }
    }
}

/// Selection and scroll of one view. Kept when focus moves elsewhere.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ViewState {
    pub selected: usize,
    pub scroll: usize,
    pub scroll_x: usize,
    /// Rows visible at the last render.
    pub height: usize,
}

impl ViewState {
    pub fn select(&mut self, idx: usize, len: usize) {
        self.selected = if len == 0 { 0 } else { idx.min(len - 1) };
        self.ensure_visible();
    }

    pub fn move_by(&mut self, delta: isize, len: usize) {
        let next = (self.selected as isize + delta).max(0) as usize;
        self.select(next, len);
    }

    /// Scroll the viewport without moving the selection.
    pub fn scroll_by(&mut self, delta: isize, len: usize) {
        let max = len.saturating_sub(self.height.max(1));
        self.scroll = ((self.scroll as isize + delta).max(0) as usize).min(max);
    }

    pub fn scroll_x_by(&mut self, delta: isize) {
        self.scroll_x = (self.scroll_x as isize + delta).max(0) as usize;
    }

    pub fn ensure_visible(&mut self) {
        let height = self.height.max(1);
        if self.selected < self.scroll {
            self.scroll = self.selected;
        } else if self.selected >= self.scroll + height {
            self.scroll = self.selected + 1 - height;
        }
    }

    pub fn clamp(&mut self, len: usize) {
        if len == 0 {
            self.selected = 0;
            self.scroll = 0;
        } else if self.selected >= len {
            self.select(len - 1, len);
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchDialog {
    pub input: TextInput,
    pub mode: SearchMode,
    pub flags: SearchFlags,
    pub error: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MenuItem {
    pub label: String,
    pub action: Action,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContextMenu {
    pub title: String,
    pub items: Vec<MenuItem>,
    pub selected: usize,
    pub anchor: (u16, u16),
}

/// What a prompt does with its text when submitted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PromptPurpose {
    CreateBranch { commit: String },
    CreateTag { commit: String },
    RenameReference { reference: Reference },
    /// `git <text> <commit>`; without a commit the text runs as typed.
    GitCommand { commit: Option<String> },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Prompt {
    pub title: String,
    pub input: TextInput,
    pub purpose: PromptPurpose,
    pub error: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Confirm {
    pub title: String,
    pub body: String,
    pub mutation: Mutation,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
}

/// Scrollable result of a user-typed git command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandOutput {
    pub title: String,
    pub lines: Vec<String>,
    pub failed: bool,
    pub scroll: usize,
}

impl CommandOutput {
    const MAX_LINES: usize = 5000;

    pub fn new(title: impl Into<String>, text: &str, failed: bool) -> Self {
        let mut lines: Vec<String> = text.lines().map(|l| l.replace('\t', "    ")).collect();
        if lines.len() > Self::MAX_LINES {
            let dropped = lines.len() - Self::MAX_LINES;
            lines.truncate(Self::MAX_LINES);
            lines.push(format!("... {} more lines", dropped));
        }
        if lines.is_empty() {
            lines.push("Command finished with no output.".to_string());
        }
        Self {
            title: title.into(),
            lines,
            failed,
            scroll: 0,
        }
    }

    pub fn scroll_by(&mut self, delta: isize) {
        let max = self.lines.len().saturating_sub(1);
        self.scroll = self.scroll.saturating_add_signed(delta).min(max);
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Modal {
    Search(SearchDialog),
    ContextMenu(ContextMenu),
    Prompt(Prompt),
    Confirm(Confirm),
    Notification(Notification),
    Output(CommandOutput),
    Help { scroll: usize },
}

/// A floating overlay and the offset the user dragged it to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Floating {
    pub modal: Modal,
    pub offset: (i16, i16),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Views {
    pub focused: ViewId,
    pub log: ViewState,
    pub diff: ViewState,
    pub refs: ViewState,
    pub debug: ViewState,
    /// Commit whose diff the diff view shows.
    pub diff_commit: Option<String>,
    pub modal: Option<Floating>,
}

impl Default for Views {
    fn default() -> Self {
        Self {
            focused: ViewId::Log,
            log: ViewState::default(),
            diff: ViewState::default(),
            refs: ViewState::default(),
            debug: ViewState::default(),
            diff_commit: None,
            modal: None,
        }
    }
}

impl Views {
    pub fn state(&self, id: ViewId) -> &ViewState {
        match id {
            ViewId::Log => &self.log,
            ViewId::Diff => &self.diff,
            ViewId::References => &self.refs,
            ViewId::DebugLog => &self.debug,
        }
    }

    pub fn state_mut(&mut self, id: ViewId) -> &mut ViewState {
        match id {
            ViewId::Log => &mut self.log,
            ViewId::Diff => &mut self.diff,
            ViewId::References => &mut self.refs,
            ViewId::DebugLog => &mut self.debug,
        }
    }

    pub fn focused_state(&self) -> &ViewState {
        self.state(self.focused)
    }

    pub fn focused_state_mut(&mut self) -> &mut ViewState {
        self.state_mut(self.focused)
    }

    pub fn open_modal(&mut self, modal: Modal) {
        self.modal = Some(Floating {
            modal,
            offset: (0, 0),
        });
    }

    pub fn close_modal(&mut self) -> Option<Modal> {
        self.modal.take().map(|f| f.modal)
    }

    pub fn modal(&self) -> Option<&Modal> {
        self.modal.as_ref().map(|f| &f.modal)
    }

    pub fn modal_mut(&mut self) -> Option<&mut Modal> {
        self.modal.as_mut().map(|f| &mut f.modal)
    }

    /// Move the open modal; never touches any view state.
    pub fn drag_modal(&mut self, dx: i16, dy: i16) {
        if let Some(f) = self.modal.as_mut() {
            f.offset.0 = f.offset.0.saturating_add(dx);
            f.offset.1 = f.offset.1.saturating_add(dy);
        }
    }
}
