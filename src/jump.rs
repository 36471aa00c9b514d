//! Back/forward navigation over visited locations, like a browser.
//!
//! Only jumps that change the focused view or its selection are recorded;
//! scrolling alone never is. Two identical consecutive pushes coalesce.

use crate::view::ViewId;

/// The selected item of a view.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ItemId {
    /// A commit in the log, by hash.
    Commit(String),
    /// A row of the diff for `commit`.
    DiffRow { commit: String, row: usize },
    /// A reference by full display name.
    Reference(String),
    DebugLine(usize),
}

impl ItemId {
    pub fn view(&self) -> ViewId {
        match self {
            ItemId::Commit(_) => ViewId::Log,
            ItemId::DiffRow { .. } => ViewId::Diff,
            ItemId::Reference(_) => ViewId::References,
            ItemId::DebugLine(_) => ViewId::DebugLog,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Location {
    pub view: ViewId,
    pub item: ItemId,
    pub scroll: usize,
}

impl Location {
    pub fn new(view: ViewId, item: ItemId, scroll: usize) -> Self {
        debug_assert_eq!(item.view(), view, "location item does not belong to its view");
        Self { view, item, scroll }
    }
}

pub struct JumpHistory {
    back: Vec<Location>,
    forward: Vec<Location>,
    max_entries: usize,
}

impl Default for JumpHistory {
    fn default() -> Self {
        Self::with_capacity(100)
    }
}

impl JumpHistory {
    pub fn with_capacity(max_entries: usize) -> Self {
        Self {
            back: Vec::new(),
            forward: Vec::new(),
            max_entries: max_entries.max(1),
        }
    }

    /// Record the location being left. Clears the forward stack even when the
    /// entry itself coalesces with the previous one.
    pub fn push(&mut self, location: Location) {
        self.forward.clear();
        if self.back.last() == Some(&location) {
            return;
        }
        self.record(location);
    }

    /// Append to the back stack, dropping the oldest entry past the cap.
    fn record(&mut self, location: Location) {
        self.back.push(location);
        if self.back.len() > self.max_entries {
            self.back.remove(0);
        }
    }

    /// Step back; `current` becomes the first forward entry.
    pub fn back(&mut self, current: Location) -> Option<Location> {
        let target = self.back.pop()?;
        self.forward.push(current);
        Some(target)
    }

    pub fn forward(&mut self, current: Location) -> Option<Location> {
        let target = self.forward.pop()?;
        self.record(current);
        Some(target)
    }

    pub fn can_go_back(&self) -> bool {
        !self.back.is_empty()
    }

    pub fn can_go_forward(&self) -> bool {
        !self.forward.is_empty()
    }

    pub fn back_len(&self) -> usize {
        self.back.len()
    }

    pub fn forward_len(&self) -> usize {
        self.forward.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log(id: &str) -> Location {
        Location::new(ViewId::Log, ItemId::Commit(id.to_string()), 0)
    }

    fn diff(id: &str, row: usize) -> Location {
        Location::new(
            ViewId::Diff,
            ItemId::DiffRow {
                commit: id.to_string(),
                row,
            },
            row.saturating_sub(5),
        )
    }

    #[test]
    fn test_back_then_forward_restores_current() {
        let mut h = JumpHistory::default();
        h.push(log("a"));
        h.push(diff("a", 3));
        let current = log("b");

        let back = h.back(current.clone()).unwrap();
        assert_eq!(back, diff("a", 3));
        let fwd = h.forward(back).unwrap();
        assert_eq!(fwd, current);
    }

    #[test]
    fn test_push_after_back_clears_forward() {
        let mut h = JumpHistory::default();
        h.push(log("a"));
        h.push(log("b"));
        let b = h.back(log("c")).unwrap();
        let _ = h.back(b).unwrap();
        assert_eq!(h.forward_len(), 2);

        h.push(log("d"));
        assert!(!h.can_go_forward());
        assert!(h.forward(log("e")).is_none());
    }

    #[test]
    fn test_identical_pushes_coalesce() {
        let mut h = JumpHistory::default();
        h.push(log("a"));
        h.push(log("a"));
        assert_eq!(h.back_len(), 1);
        h.push(diff("a", 1));
        h.push(log("a"));
        assert_eq!(h.back_len(), 3);
    }

    #[test]
    fn test_empty_stacks_report_none() {
        let mut h = JumpHistory::default();
        assert!(!h.can_go_back());
        assert!(h.back(log("x")).is_none());
        assert!(h.forward(log("x")).is_none());
        assert!(!h.can_go_forward());
    }

    #[test]
    fn test_capacity_drops_oldest() {
        let mut h = JumpHistory::with_capacity(2);
        h.push(log("a"));
        h.push(log("b"));
        h.push(log("c"));
        assert_eq!(h.back_len(), 2);
        assert_eq!(h.back(log("d")), Some(log("c")));
        assert_eq!(h.back(log("c")), Some(log("b")));
        assert_eq!(h.back(log("b")), None);
    }

    #[test]
    fn test_forward_respects_capacity() {
        let mut h = JumpHistory::with_capacity(2);
        h.push(log("a"));
        h.push(log("b"));
        let b = h.back(log("c")).unwrap();
        let a = h.back(b).unwrap();
        assert_eq!(a, log("a"));
        let b = h.forward(a).unwrap();
        let c = h.forward(b).unwrap();
        assert_eq!(c, log("c"));
        assert_eq!(h.back_len(), 2);
        assert_eq!(h.back(c), Some(log("b")));
        assert_eq!(h.back(log("b")), Some(log("a")));
        assert!(!h.can_go_back());
    }

    #[test]
    fn test_random_walk_round_trips() {
        let mut h = JumpHistory::with_capacity(50);
        let mut current = log("start");
        for i in 0..40usize {
            match i % 5 {
                0 | 1 | 3 => {
                    h.push(current.clone());
                    current = log(&format!("n{}", i));
                }
                _ => {
                    let before = current.clone();
                    if let Some(prev) = h.back(current.clone()) {
                        current = prev;
                        let again = h.forward(current.clone()).unwrap();
                        assert_eq!(again, before);
                        current = again;
                    }
                }
            }
            assert!(h.back_len() <= 50);
        }
    }
}
