//! Parsed commit diffs and the flattened rows the diff view shows.

use crate::model::Commit;

/// How a path changed in a commit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
    Renamed,
}

impl ChangeKind {
    /// Map a `--name-status` letter (`A`, `M`, `D`, `R100`, ...).
    pub fn from_status(status: &str) -> Self {
        match status.chars().next() {
            Some('A') | Some('C') => ChangeKind::Added,
            Some('D') => ChangeKind::Deleted,
            Some('R') => ChangeKind::Renamed,
            _ => ChangeKind::Modified,
        }
    }
}

/// Diff generation options. Part of the cache key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DiffSettings {
    pub context: u32,
    pub ignore_whitespace: bool,
}

impl DiffSettings {
    pub fn key_for(self, commit: &str) -> DiffKey {
        DiffKey {
            commit: commit.to_string(),
            context: self.context,
            ignore_whitespace: self.ignore_whitespace,
        }
    }
}

impl Default for DiffSettings {
    fn default() -> Self {
        Self {
            context: 3,
            ignore_whitespace: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DiffKey {
    pub commit: String,
    pub context: u32,
    pub ignore_whitespace: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiffLineKind {
    Header,
    Added,
    Removed,
    Context,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiffLine {
    pub kind: DiffLineKind,
    pub text: String,
    pub old_line: Option<u32>,
    pub new_line: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileDiff {
    pub path: String,
    pub old_path: Option<String>,
    pub kind: ChangeKind,
    pub lines: Vec<DiffLine>,
}

/// All file diffs of one commit for one set of diff options.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitDiff {
    pub key: DiffKey,
    pub files: Vec<FileDiff>,
}

impl CommitDiff {
    /// Every path the commit touches, old names of renames included.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.iter().flat_map(|f| {
            std::iter::once(f.path.as_str()).chain(f.old_path.as_deref())
        })
    }

    /// Text of added and removed lines, without the `+`/`-` marker.
    pub fn changed_text(&self) -> impl Iterator<Item = &str> {
        self.files.iter().flat_map(|f| {
            f.lines
                .iter()
                .filter(|l| matches!(l.kind, DiffLineKind::Added | DiffLineKind::Removed))
                .map(|l| l.text.get(1..).unwrap_or(""))
        })
    }
}

/// A line whose origin can be traced with blame.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BlameTarget {
    pub rev: String,
    pub path: String,
    pub line: u32,
}

/// Result of tracing a line back to the commit that introduced it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlameOrigin {
    pub commit: String,
    pub path: String,
    pub line: u32,
}

fn parse_hunk_header(line: &str) -> Option<(u32, u32)> {
    let rest = line.trim().strip_prefix("@@")?.trim_start();
    let (range, _) = rest.split_once("@@")?;
    let mut it = range.split_whitespace();
    let old_tok = it.next()?;
    let new_tok = it.next()?;

    let old_start = old_tok.strip_prefix('-')?.split(',').next()?.parse().ok()?;
    let new_start = new_tok.strip_prefix('+')?.split(',').next()?.parse().ok()?;

    Some((old_start, new_start))
}

fn header(text: &str) -> DiffLine {
    DiffLine {
        kind: DiffLineKind::Header,
        text: text.to_string(),
        old_line: None,
        new_line: None,
    }
}

/// Parse `git diff`/`git show --patch` output into per-file diffs.
pub fn parse_unified(text: &str) -> Vec<FileDiff> {
    let mut files: Vec<FileDiff> = Vec::new();
    let mut in_hunk = false;
    let mut old_line: Option<u32> = None;
    let mut new_line: Option<u32> = None;

    for line in text.lines() {
        if let Some(rest) = line.strip_prefix("diff --git ") {
            in_hunk = false;
            let (old, new) = rest.rsplit_once(" b/").unwrap_or((rest, rest));
            let old = old.strip_prefix("a/").unwrap_or(old).to_string();
            files.push(FileDiff {
                path: new.to_string(),
                old_path: Some(old),
                kind: ChangeKind::Modified,
                lines: vec![header(line)],
            });
            continue;
        }

        let Some(file) = files.last_mut() else {
            continue;
        };

        if line.starts_with("@@") {
            in_hunk = true;
            if let Some((o, n)) = parse_hunk_header(line) {
                old_line = Some(o);
                new_line = Some(n);
            }
            file.lines.push(header(line));
            continue;
        }

        if !in_hunk {
            if line.starts_with("new file ") {
                file.kind = ChangeKind::Added;
            } else if line.starts_with("deleted file ") {
                file.kind = ChangeKind::Deleted;
            } else if let Some(from) = line.strip_prefix("rename from ") {
                file.kind = ChangeKind::Renamed;
                file.old_path = Some(from.to_string());
            } else if let Some(to) = line.strip_prefix("rename to ") {
                file.path = to.to_string();
            } else if let Some(p) = line.strip_prefix("+++ b/") {
                file.path = p.to_string();
            } else if let Some(p) = line.strip_prefix("--- a/") {
                file.old_path = Some(p.to_string());
            }
            file.lines.push(header(line));
            continue;
        }

        match line.chars().next() {
            Some('+') => {
                file.lines.push(DiffLine {
                    kind: DiffLineKind::Added,
                    text: line.to_string(),
                    old_line: None,
                    new_line,
                });
                if let Some(v) = new_line.as_mut() {
                    *v += 1;
                }
            }
            Some('-') => {
                file.lines.push(DiffLine {
                    kind: DiffLineKind::Removed,
                    text: line.to_string(),
                    old_line,
                    new_line: None,
                });
                if let Some(v) = old_line.as_mut() {
                    *v += 1;
                }
            }
            Some(' ') | None => {
                file.lines.push(DiffLine {
                    kind: DiffLineKind::Context,
                    text: line.to_string(),
                    old_line,
                    new_line,
                });
                if let Some(v) = old_line.as_mut() {
                    *v += 1;
                }
                if let Some(v) = new_line.as_mut() {
                    *v += 1;
                }
            }
            _ => file.lines.push(header(line)),
        }
    }

    for f in &mut files {
        if f.kind != ChangeKind::Renamed && f.old_path.as_deref() == Some(f.path.as_str()) {
            f.old_path = None;
        }
    }

    files
}

/// One row of the diff view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiffRow {
    pub kind: DiffLineKind,
    pub text: String,
    /// `(file index, line index)` into the `CommitDiff`; `None` for commit metadata.
    pub source: Option<(usize, usize)>,
}

/// Rows for the diff view: commit metadata followed by every file's lines.
pub fn flatten(commit: Option<&Commit>, diff: &CommitDiff) -> Vec<DiffRow> {
    let mut rows = Vec::new();
    let meta = |text: String| DiffRow {
        kind: DiffLineKind::Header,
        text,
        source: None,
    };

    rows.push(meta(format!("commit {}", diff.key.commit)));
    if let Some(c) = commit {
        if c.parents.len() > 1 {
            let short: Vec<&str> = c.parents.iter().map(|p| crate::model::short_id(p)).collect();
            rows.push(meta(format!("Merge: {}", short.join(" "))));
        }
        rows.push(meta(format!("Author: {}", c.author)));
        rows.push(meta(format!("Date:   {}", c.date)));
        rows.push(meta(String::new()));
        rows.push(meta(format!("    {}", c.subject)));
        for body_line in c.body.lines() {
            rows.push(meta(format!("    {}", body_line)));
        }
    }
    rows.push(meta(String::new()));

    if diff.files.is_empty() {
        rows.push(meta("(no changes)".to_string()));
    }

    for (fi, file) in diff.files.iter().enumerate() {
        for (li, line) in file.lines.iter().enumerate() {
            rows.push(DiffRow {
                kind: line.kind,
                text: line.text.clone(),
                source: Some((fi, li)),
            });
        }
    }

    rows
}

/// Index of the first row that belongs to a file.
pub fn first_diff_row(rows: &[DiffRow]) -> usize {
    rows.iter().position(|r| r.source.is_some()).unwrap_or(0)
}

/// Where blame should look for the origin of `row`.
///
/// Added and context lines exist in the commit itself; removed lines only in
/// its first parent. Headers and lines of root-commit deletions have no target.
pub fn blame_target(commit: &Commit, diff: &CommitDiff, row: &DiffRow) -> Option<BlameTarget> {
    let (fi, li) = row.source?;
    let file = diff.files.get(fi)?;
    let line = file.lines.get(li)?;
    match line.kind {
        DiffLineKind::Added | DiffLineKind::Context => Some(BlameTarget {
            rev: commit.id.clone(),
            path: file.path.clone(),
            line: line.new_line?,
        }),
        DiffLineKind::Removed => Some(BlameTarget {
            rev: commit.parents.first()?.clone(),
            path: file.old_path.clone().unwrap_or_else(|| file.path.clone()),
            line: line.old_line?,
        }),
        DiffLineKind::Header => None,
    }
}

/// Row showing `line` of `path` on the new side, used after an origin jump.
pub fn row_for_new_line(rows: &[DiffRow], diff: &CommitDiff, path: &str, line: u32) -> Option<usize> {
    rows.iter().position(|r| {
        let Some((fi, li)) = r.source else {
            return false;
        };
        diff.files.get(fi).is_some_and(|f| {
            f.path == path
                && f.lines
                    .get(li)
                    .is_some_and(|l| l.kind != DiffLineKind::Removed && l.new_line == Some(line))
        })
    })
}
