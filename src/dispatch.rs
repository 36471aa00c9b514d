//! Input mapping.
//!
//! Raw terminal events become an `Input`, and `lookup` turns `(Context, Input)`
//! into exactly one `Action` through a single match. Anything the table does
//! not name is `Action::Noop`. While a modal is open only the modal's own keys
//! are mapped, so history-mutating keys cannot leak through to the view below.

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;

use crate::view::{Modal, ViewId};

const HSCROLL_STEP: isize = 5;
const WHEEL_STEP: isize = 3;

/// History-changing operations the user can ask for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MutationKind {
    CherryPick,
    Revert,
    SoftReset,
    HardReset,
    CreateBranch,
    CreateTag,
    DeleteReference,
    PushReference,
    RenameReference,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    Noop,
    Quit,

    MoveSelection(isize),
    PageDown,
    PageUp,
    SelectFirst,
    SelectLast,
    ScrollRows(isize),
    ScrollColumns(isize),
    SelectRow { view: ViewId, row: usize },

    FocusView(ViewId),
    FocusNext,
    OpenDiff,
    JumpToReference,
    ShowOrigin,
    Back,
    Forward,

    OpenSearch,
    SearchNext,
    SearchPrevious,
    ClearSearch,

    Mutate(MutationKind),

    CopyId,
    Reload,
    RetryFetch,
    CancelFetches,
    AdjustContext(i32),
    ToggleWhitespace,
    CycleTheme,
    ShowHelp,
    OpenCommand,
    OpenContextMenu { row: u16, col: u16 },

    ModalInput(char),
    ModalBackspace,
    ModalDelete,
    ModalDeleteWord,
    ModalLeft,
    ModalRight,
    ModalHome,
    ModalEnd,
    ModalCycleMode,
    ModalToggleCase,
    ModalToggleRegex,
    ModalMove(isize),
    ModalChoose(usize),
    ModalSubmit,
    ModalCancel,

    BeginDrag { row: u16, col: u16 },
    DragTo { row: u16, col: u16 },
    EndDrag,
    Resize,
}

/// Which kind of modal owns input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModalKind {
    Search,
    ContextMenu,
    Prompt,
    Confirm,
    Notification,
    Output,
    Help,
}

impl ModalKind {
    pub fn of(modal: &Modal) -> Self {
        match modal {
            Modal::Search(_) => ModalKind::Search,
            Modal::ContextMenu(_) => ModalKind::ContextMenu,
            Modal::Prompt(_) => ModalKind::Prompt,
            Modal::Confirm(_) => ModalKind::Confirm,
            Modal::Notification(_) => ModalKind::Notification,
            Modal::Output(_) => ModalKind::Output,
            Modal::Help { .. } => ModalKind::Help,
        }
    }

    fn takes_text(self) -> bool {
        matches!(self, ModalKind::Search | ModalKind::Prompt)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Context {
    View(ViewId),
    Modal(ModalKind),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Input {
    Key(KeyCode, KeyModifiers),
    Click { row: u16, col: u16 },
    RightClick { row: u16, col: u16 },
    Drag { row: u16, col: u16 },
    Release,
    Wheel { delta: isize, shift: bool },
    Resize,
}

impl Input {
    pub fn from_event(event: &Event) -> Option<Self> {
        match event {
            Event::Key(KeyEvent {
                code,
                modifiers,
                kind: KeyEventKind::Press | KeyEventKind::Repeat,
                ..
            }) => Some(Input::Key(*code, *modifiers)),
            Event::Mouse(mouse) => Self::from_mouse(mouse),
            Event::Resize(_, _) => Some(Input::Resize),
            _ => None,
        }
    }

    fn from_mouse(mouse: &MouseEvent) -> Option<Self> {
        let (row, col) = (mouse.row, mouse.column);
        let shift = mouse.modifiers.contains(KeyModifiers::SHIFT);
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => Some(Input::Click { row, col }),
            MouseEventKind::Down(MouseButton::Right) => Some(Input::RightClick { row, col }),
            MouseEventKind::Drag(MouseButton::Left) => Some(Input::Drag { row, col }),
            MouseEventKind::Up(MouseButton::Left) => Some(Input::Release),
            MouseEventKind::ScrollDown => Some(Input::Wheel { delta: WHEEL_STEP, shift }),
            MouseEventKind::ScrollUp => Some(Input::Wheel { delta: -WHEEL_STEP, shift }),
            _ => None,
        }
    }
}

/// A clickable screen region recorded during render.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClickZone {
    pub rect: Rect,
    pub action: Action,
}

fn hit(zones: &[ClickZone], row: u16, col: u16) -> Option<&ClickZone> {
    // Later zones are drawn on top.
    zones.iter().rev().find(|z| {
        row >= z.rect.y
            && row < z.rect.y.saturating_add(z.rect.height)
            && col >= z.rect.x
            && col < z.rect.x.saturating_add(z.rect.width)
    })
}

/// Map one input to one action.
pub fn lookup(ctx: Context, input: Input, zones: &[ClickZone]) -> Action {
    match (ctx, input) {
        (_, Input::Resize) => Action::Resize,

        (Context::Modal(kind), Input::Key(code, mods)) => modal_key(kind, code, mods),
        (Context::Modal(kind), Input::Click { row, col }) => match hit(zones, row, col) {
            Some(z) if is_modal_action(&z.action) => match z.action {
                Action::BeginDrag { .. } => Action::BeginDrag { row, col },
                ref other => other.clone(),
            },
            _ if kind == ModalKind::ContextMenu => Action::ModalCancel,
            _ => Action::Noop,
        },
        (Context::Modal(ModalKind::ContextMenu), Input::RightClick { .. }) => Action::ModalCancel,
        (Context::Modal(_), Input::RightClick { .. }) => Action::Noop,
        (Context::Modal(_), Input::Drag { row, col }) => Action::DragTo { row, col },
        (Context::Modal(_), Input::Release) => Action::EndDrag,
        (Context::Modal(ModalKind::ContextMenu), Input::Wheel { delta, .. }) => {
            Action::ModalMove(delta.signum())
        }
        (Context::Modal(ModalKind::Help | ModalKind::Output), Input::Wheel { delta, .. }) => {
            Action::ModalMove(delta)
        }
        (Context::Modal(_), Input::Wheel { .. }) => Action::Noop,

        (Context::View(view), Input::Key(code, mods)) => view_key(view, code, mods),
        (Context::View(_), Input::Click { row, col }) => hit(zones, row, col)
            .map(|z| z.action.clone())
            .filter(|a| !is_modal_action(a))
            .unwrap_or(Action::Noop),
        (Context::View(_), Input::RightClick { row, col }) => Action::OpenContextMenu { row, col },
        (Context::View(_), Input::Wheel { delta, shift: true }) => {
            Action::ScrollColumns(delta.signum() * HSCROLL_STEP)
        }
        (Context::View(_), Input::Wheel { delta, shift: false }) => Action::ScrollRows(delta),
        (Context::View(_), Input::Drag { .. }) | (Context::View(_), Input::Release) => Action::Noop,
    }
}

fn is_modal_action(action: &Action) -> bool {
    matches!(
        action,
        Action::ModalChoose(_)
            | Action::ModalSubmit
            | Action::ModalCancel
            | Action::ModalCycleMode
            | Action::ModalToggleCase
            | Action::ModalToggleRegex
            | Action::BeginDrag { .. }
    )
}

fn modal_key(kind: ModalKind, code: KeyCode, mods: KeyModifiers) -> Action {
    let ctrl = mods.contains(KeyModifiers::CONTROL);
    let alt = mods.contains(KeyModifiers::ALT);

    match (kind, code) {
        (_, KeyCode::Esc) => Action::ModalCancel,
        (_, KeyCode::Char('c')) if ctrl => Action::ModalCancel,

        (ModalKind::Search, KeyCode::Tab) => Action::ModalCycleMode,
        (ModalKind::Search, KeyCode::Char('c')) if alt => Action::ModalToggleCase,
        (ModalKind::Search, KeyCode::Char('r')) if alt => Action::ModalToggleRegex,
        (ModalKind::Search, KeyCode::F(2)) => Action::ModalToggleCase,
        (ModalKind::Search, KeyCode::F(3)) => Action::ModalToggleRegex,

        (k, KeyCode::Enter) if k.takes_text() => Action::ModalSubmit,
        (k, KeyCode::Backspace) if k.takes_text() => Action::ModalBackspace,
        (k, KeyCode::Delete) if k.takes_text() => Action::ModalDelete,
        (k, KeyCode::Left) if k.takes_text() => Action::ModalLeft,
        (k, KeyCode::Right) if k.takes_text() => Action::ModalRight,
        (k, KeyCode::Home) if k.takes_text() => Action::ModalHome,
        (k, KeyCode::End) if k.takes_text() => Action::ModalEnd,
        (k, KeyCode::Char('w')) if k.takes_text() && ctrl => Action::ModalDeleteWord,
        (k, KeyCode::Char('a')) if k.takes_text() && ctrl => Action::ModalHome,
        (k, KeyCode::Char('e')) if k.takes_text() && ctrl => Action::ModalEnd,
        (k, KeyCode::Char(ch)) if k.takes_text() && !ctrl && !alt => Action::ModalInput(ch),

        (ModalKind::ContextMenu, KeyCode::Char('j') | KeyCode::Down) => Action::ModalMove(1),
        (ModalKind::ContextMenu, KeyCode::Char('k') | KeyCode::Up) => Action::ModalMove(-1),
        (ModalKind::ContextMenu, KeyCode::Enter) => Action::ModalSubmit,
        (ModalKind::ContextMenu, KeyCode::Char('q')) => Action::ModalCancel,

        (ModalKind::Confirm, KeyCode::Char('y') | KeyCode::Enter) => Action::ModalSubmit,
        (ModalKind::Confirm, KeyCode::Char('n') | KeyCode::Char('q')) => Action::ModalCancel,

        (ModalKind::Notification, KeyCode::Enter | KeyCode::Char('q')) => Action::ModalCancel,

        (ModalKind::Help, KeyCode::Char('j') | KeyCode::Down) => Action::ModalMove(1),
        (ModalKind::Help, KeyCode::Char('k') | KeyCode::Up) => Action::ModalMove(-1),
        (ModalKind::Help, KeyCode::Char('q') | KeyCode::Char('H') | KeyCode::Char('?') | KeyCode::Enter) => {
            Action::ModalCancel
        }

        (ModalKind::Output, KeyCode::Char('j') | KeyCode::Down) => Action::ModalMove(1),
        (ModalKind::Output, KeyCode::Char('k') | KeyCode::Up) => Action::ModalMove(-1),
        (ModalKind::Output, KeyCode::Char('d') | KeyCode::PageDown) => Action::ModalMove(10),
        (ModalKind::Output, KeyCode::Char('u') | KeyCode::PageUp) => Action::ModalMove(-10),
        (ModalKind::Output, KeyCode::Char('q') | KeyCode::Enter) => Action::ModalCancel,

        _ => Action::Noop,
    }
}

fn view_key(view: ViewId, code: KeyCode, mods: KeyModifiers) -> Action {
    let ctrl = mods.contains(KeyModifiers::CONTROL);
    let alt = mods.contains(KeyModifiers::ALT);

    match (view, code) {
        (_, KeyCode::Char('c')) if ctrl => Action::Quit,
        (_, KeyCode::Char('o')) if ctrl => Action::Back,
        (_, KeyCode::Left) if alt => Action::Back,
        (_, KeyCode::Right) if alt => Action::Forward,
        (_, KeyCode::Char('d')) if ctrl => Action::PageDown,
        (_, KeyCode::Char('u')) if ctrl => Action::PageUp,
        (_, KeyCode::Char(_)) if ctrl || alt => Action::Noop,

        (_, KeyCode::Char('q')) => Action::Quit,
        (_, KeyCode::Char('H') | KeyCode::Char('?')) => Action::ShowHelp,
        (_, KeyCode::Char(':')) => Action::OpenCommand,
        (_, KeyCode::Char('1')) => Action::FocusView(ViewId::Log),
        (_, KeyCode::Char('2')) => Action::FocusView(ViewId::Diff),
        (_, KeyCode::Char('3')) => Action::FocusView(ViewId::References),
        (_, KeyCode::Char('4')) => Action::FocusView(ViewId::DebugLog),
        (_, KeyCode::Tab) => Action::FocusNext,

        (_, KeyCode::Char('j') | KeyCode::Down) => Action::MoveSelection(1),
        (_, KeyCode::Char('k') | KeyCode::Up) => Action::MoveSelection(-1),
        (_, KeyCode::Char('g') | KeyCode::Home) => Action::SelectFirst,
        (_, KeyCode::Char('G') | KeyCode::End) => Action::SelectLast,
        (_, KeyCode::Char('d') | KeyCode::PageDown) => Action::PageDown,
        (_, KeyCode::Char('u') | KeyCode::PageUp) => Action::PageUp,
        (_, KeyCode::Char('h') | KeyCode::Left) => Action::ScrollColumns(-HSCROLL_STEP),
        (_, KeyCode::Char('l') | KeyCode::Right) => Action::ScrollColumns(HSCROLL_STEP),
        (_, KeyCode::Char('[')) => Action::Back,
        (_, KeyCode::Char(']')) => Action::Forward,

        (_, KeyCode::Char('/')) => Action::OpenSearch,
        (_, KeyCode::Char('n')) => Action::SearchNext,
        (_, KeyCode::Char('N')) => Action::SearchPrevious,
        (_, KeyCode::Esc) => Action::ClearSearch,

        (_, KeyCode::Char('r')) => Action::Reload,
        (_, KeyCode::Char('R')) => Action::RetryFetch,
        (_, KeyCode::Char('X')) => Action::CancelFetches,
        (_, KeyCode::Char('t')) => Action::CycleTheme,
        (ViewId::Log | ViewId::Diff, KeyCode::Char('c')) => Action::CopyId,
        (ViewId::Log | ViewId::Diff, KeyCode::Char('+') | KeyCode::Char('=')) => {
            Action::AdjustContext(1)
        }
        (ViewId::Log | ViewId::Diff, KeyCode::Char('-')) => Action::AdjustContext(-1),
        (ViewId::Log | ViewId::Diff, KeyCode::Char('w')) => Action::ToggleWhitespace,
        (_, KeyCode::Char('m')) => Action::OpenContextMenu { row: 0, col: 0 },

        (ViewId::Log, KeyCode::Enter) => Action::OpenDiff,
        (ViewId::Log, KeyCode::Char('p')) => Action::Mutate(MutationKind::CherryPick),
        (ViewId::Log, KeyCode::Char('v')) => Action::Mutate(MutationKind::Revert),
        (ViewId::Log, KeyCode::Char('s')) => Action::Mutate(MutationKind::SoftReset),
        (ViewId::Log, KeyCode::Char('S')) => Action::Mutate(MutationKind::HardReset),
        (ViewId::Log, KeyCode::Char('B')) => Action::Mutate(MutationKind::CreateBranch),
        (ViewId::Log, KeyCode::Char('T')) => Action::Mutate(MutationKind::CreateTag),

        (ViewId::Diff, KeyCode::Enter | KeyCode::Char('b')) => Action::ShowOrigin,

        (ViewId::References, KeyCode::Enter) => Action::JumpToReference,
        (ViewId::References, KeyCode::Char('D')) => Action::Mutate(MutationKind::DeleteReference),
        (ViewId::References, KeyCode::Char('P')) => Action::Mutate(MutationKind::PushReference),
        (ViewId::References, KeyCode::Char('E') | KeyCode::F(2)) => {
            Action::Mutate(MutationKind::RenameReference)
        }

        _ => Action::Noop,
    }
}
