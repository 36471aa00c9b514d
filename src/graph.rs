//! Lane layout for the graph column of the log.
//!
//! Rows are laid out incrementally as pages arrive: each lane remembers the
//! commit it is waiting for, and a commit takes over the first lane waiting
//! for it. Lanes still waiting once the log is exhausted lead to parents the
//! filtered history never reaches; the log draws them as continuing off-screen.

use crate::model::{Commit, Model};

/// Lanes beyond this fold into the last one.
pub const MAX_LANES: usize = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cell {
    Empty,
    /// A lane passing this row on its way to an older commit.
    Pass,
    /// The row's own commit.
    Node { merge: bool },
    /// A lane that ends here, merging into the node's lane.
    Join,
    /// A lane opened here for an extra parent of the node.
    Fork,
}

#[derive(Debug, Default)]
pub struct Graph {
    epoch: u64,
    lanes: Vec<Option<String>>,
    rows: Vec<Vec<Cell>>,
    width: usize,
}

impl Graph {
    /// Lay out any commits loaded since the last call. A new log epoch starts over.
    pub fn sync(&mut self, model: &Model) {
        if self.epoch != model.log_epoch() || model.len() < self.rows.len() {
            *self = Graph {
                epoch: model.log_epoch(),
                ..Default::default()
            };
        }
        for idx in self.rows.len()..model.len() {
            let Some(commit) = model.commit(idx) else {
                break;
            };
            self.push(commit);
        }
    }

    pub fn row(&self, idx: usize) -> Option<&[Cell]> {
        self.rows.get(idx).map(Vec::as_slice)
    }

    /// Widest row so far, in lanes.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Lanes still waiting for a commit that has not been laid out.
    pub fn open_lanes(&self) -> Vec<usize> {
        self.lanes
            .iter()
            .enumerate()
            .filter_map(|(i, l)| l.as_ref().map(|_| i))
            .collect()
    }

    fn push(&mut self, commit: &Commit) {
        let mut cells: Vec<Cell> = self
            .lanes
            .iter()
            .map(|l| if l.is_some() { Cell::Pass } else { Cell::Empty })
            .collect();

        let waiting: Vec<usize> = self
            .lanes
            .iter()
            .enumerate()
            .filter(|(_, l)| l.as_deref() == Some(commit.id.as_str()))
            .map(|(i, _)| i)
            .collect();
        let col = match waiting.first() {
            Some(&c) => c,
            None => self.free_lane(&mut cells, None),
        };
        for &w in waiting.iter().skip(1) {
            cells[w] = Cell::Join;
            self.lanes[w] = None;
        }

        cells[col] = Cell::Node {
            merge: commit.is_merge(),
        };
        self.lanes[col] = commit.parents.first().cloned();

        for parent in commit.parents.iter().skip(1) {
            if self.lanes.iter().any(|l| l.as_ref() == Some(parent)) {
                continue;
            }
            let slot = self.free_lane(&mut cells, Some(col));
            if slot != col {
                cells[slot] = Cell::Fork;
                self.lanes[slot] = Some(parent.clone());
            }
        }

        while self.lanes.last().is_some_and(Option::is_none) {
            self.lanes.pop();
        }
        self.width = self.width.max(cells.len());
        self.rows.push(cells);
    }

    /// First unused lane other than `skip`, opening a new one while under the cap.
    fn free_lane(&mut self, cells: &mut Vec<Cell>, skip: Option<usize>) -> usize {
        let unused = (0..self.lanes.len())
            .find(|&i| self.lanes[i].is_none() && cells[i] == Cell::Empty && Some(i) != skip);
        if let Some(i) = unused {
            return i;
        }
        if self.lanes.len() < MAX_LANES {
            self.lanes.push(None);
            cells.push(Cell::Empty);
            return self.lanes.len() - 1;
        }
        MAX_LANES - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::fake::commit;

    fn layout(commits: &[Commit]) -> Graph {
        let mut g = Graph::default();
        for c in commits {
            g.push(c);
        }
        g
    }

    #[test]
    fn test_linear_history_uses_one_lane() {
        let g = layout(&crate::source::fake::linear(3));
        assert_eq!(g.width(), 1);
        for i in 0..3 {
            assert_eq!(g.row(i), Some(&[Cell::Node { merge: false }][..]));
        }
        assert!(g.open_lanes().is_empty());
    }

    #[test]
    fn test_merge_forks_and_joins() {
        // m merges b into a; both branch off base.
        let g = layout(&[
            commit("m", &["a", "b"], "merge"),
            commit("a", &["base"], "a"),
            commit("b", &["base"], "b"),
            commit("base", &[], "base"),
        ]);
        assert_eq!(g.row(0), Some(&[Cell::Node { merge: true }, Cell::Fork][..]));
        assert_eq!(g.row(1), Some(&[Cell::Node { merge: false }, Cell::Pass][..]));
        assert_eq!(g.row(2), Some(&[Cell::Pass, Cell::Node { merge: false }][..]));
        assert_eq!(g.row(3), Some(&[Cell::Node { merge: false }, Cell::Join][..]));
        assert_eq!(g.width(), 2);
        assert!(g.open_lanes().is_empty());
    }

    #[test]
    fn test_unreached_parents_stay_open() {
        // A path-filtered log: c2's parent and the merge's second parent never show up.
        let g = layout(&[commit("m", &["c2", "side"], "merge"), commit("c2", &["c1"], "two")]);
        assert_eq!(g.open_lanes(), vec![0, 1]);
        assert_eq!(g.row(1), Some(&[Cell::Node { merge: false }, Cell::Pass][..]));
    }

    #[test]
    fn test_lanes_are_capped() {
        let parents: Vec<String> = (0..12).map(|i| format!("p{}", i)).collect();
        let refs: Vec<&str> = parents.iter().map(String::as_str).collect();
        let g = layout(&[commit("octopus", &refs, "octopus")]);
        assert_eq!(g.width(), MAX_LANES);
        assert_eq!(g.open_lanes().len(), MAX_LANES);
    }

    #[test]
    fn test_free_lane_is_reused() {
        let g = layout(&[
            commit("o", &["a", "b", "c"], "octopus"),
            commit("b", &[], "root b"),
            commit("x", &["a"], "unrelated tip"),
        ]);
        assert_eq!(g.row(0), Some(&[Cell::Node { merge: true }, Cell::Fork, Cell::Fork][..]));
        assert_eq!(g.row(1), Some(&[Cell::Pass, Cell::Node { merge: false }, Cell::Pass][..]));
        assert_eq!(g.row(2), Some(&[Cell::Pass, Cell::Node { merge: false }, Cell::Pass][..]));
        assert_eq!(g.open_lanes(), vec![0, 1, 2]);
    }
}
