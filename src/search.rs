//! Multi-mode search over the loaded history.
//!
//! A search never scans inside `search`; it only compiles the query. Commits are
//! evaluated on demand by `next`/`previous` and in bounded batches by `advance`,
//! and every verdict is remembered, so later calls and newly loaded commits
//! resume instead of rescanning. Modes that need a diff fetch it through the
//! model and yield `SearchStep::Pending` until it arrives.

use std::fmt;

use regex::{Regex, RegexBuilder};

use crate::error::QueryError;
use crate::model::{DiffEntry, LoadMore, Model};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SearchMode {
    CommitId,
    #[default]
    Message,
    DiffContent,
    FilePath,
}

impl SearchMode {
    pub fn label(self) -> &'static str {
        match self {
            SearchMode::CommitId => "commit id",
            SearchMode::Message => "message",
            SearchMode::DiffContent => "diff content",
            SearchMode::FilePath => "file path",
        }
    }

    pub fn cycle(self) -> Self {
        match self {
            SearchMode::Message => SearchMode::FilePath,
            SearchMode::FilePath => SearchMode::DiffContent,
            SearchMode::DiffContent => SearchMode::CommitId,
            SearchMode::CommitId => SearchMode::Message,
        }
    }

    fn needs_diff(self) -> bool {
        matches!(self, SearchMode::DiffContent | SearchMode::FilePath)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SearchFlags {
    pub case_sensitive: bool,
    pub regex: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchQuery {
    pub mode: SearchMode,
    pub flags: SearchFlags,
    pub pattern: String,
}

enum Matcher {
    Substring { needle: String, case_sensitive: bool },
    Prefix { needle: String, case_sensitive: bool },
    Regex(Regex),
}

impl Matcher {
    fn compile(query: &SearchQuery) -> Result<Self, QueryError> {
        if query.pattern.is_empty() {
            return Err(QueryError::EmptyPattern);
        }
        let case_sensitive = query.flags.case_sensitive;
        if query.flags.regex {
            let re = RegexBuilder::new(&query.pattern)
                .case_insensitive(!case_sensitive)
                .build()
                .map_err(|e| QueryError::InvalidRegex(e.to_string()))?;
            return Ok(Matcher::Regex(re));
        }

        let needle = if case_sensitive {
            query.pattern.clone()
        } else {
            query.pattern.to_lowercase()
        };
        Ok(match query.mode {
            SearchMode::CommitId => Matcher::Prefix {
                needle,
                case_sensitive,
            },
            _ => Matcher::Substring {
                needle,
                case_sensitive,
            },
        })
    }

    fn is_match(&self, haystack: &str) -> bool {
        match self {
            Matcher::Regex(re) => re.is_match(haystack),
            Matcher::Substring {
                needle,
                case_sensitive: true,
            } => haystack.contains(needle.as_str()),
            Matcher::Substring { needle, .. } => haystack.to_lowercase().contains(needle.as_str()),
            Matcher::Prefix {
                needle,
                case_sensitive: true,
            } => haystack.starts_with(needle.as_str()),
            Matcher::Prefix { needle, .. } => haystack.to_lowercase().starts_with(needle.as_str()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mark {
    Unknown,
    Match,
    NoMatch,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchStep {
    Found(usize),
    /// Waiting on a diff or a history page; call again on a later tick.
    Pending,
    NoMatches,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
}

/// Resumable scan state for one query over one log epoch. Verdicts that came
/// from a diff are dropped when the model's diff epoch moves on.
struct MatchCursor {
    query: SearchQuery,
    matcher: Matcher,
    epoch: u64,
    diff_epoch: u64,
    marks: Vec<Mark>,
    start: usize,
    hi: usize,
    lo: usize,
    current: Option<usize>,
}

impl MatchCursor {
    fn new(query: SearchQuery, matcher: Matcher, model: &Model, start: usize) -> Self {
        Self {
            query,
            matcher,
            epoch: model.log_epoch(),
            diff_epoch: model.diff_epoch(),
            marks: Vec::new(),
            start,
            hi: start,
            lo: 0,
            current: None,
        }
    }

    /// Catch up with the model: extend the marks to the loaded history and
    /// forget diff-based verdicts computed under older diffs.
    fn refresh(&mut self, model: &Model) {
        if self.diff_epoch != model.diff_epoch() {
            self.diff_epoch = model.diff_epoch();
            if self.query.mode.needs_diff() {
                tracing::debug!("diffs changed, rescanning '{}'", self.query.pattern);
                self.marks.fill(Mark::Unknown);
                self.hi = self.start;
                self.lo = 0;
            }
        }
        self.grow(model.len());
    }

    fn grow(&mut self, len: usize) {
        if self.marks.len() < len {
            self.marks.resize(len, Mark::Unknown);
        }
        if self.start > len {
            self.start = len;
            self.hi = len;
        }
    }

    /// Verdict for `idx`, or `None` while its diff is still loading.
    fn eval(&mut self, idx: usize, model: &mut Model, prefetch: usize) -> Option<bool> {
        match self.marks.get(idx) {
            Some(Mark::Match) => return Some(true),
            Some(Mark::NoMatch) => return Some(false),
            _ => {}
        }
        let verdict = self.judge(idx, model);
        if self.query.mode.needs_diff() && prefetch > 0 {
            self.prefetch(idx, model, prefetch);
        }
        let verdict = verdict?;
        if let Some(m) = self.marks.get_mut(idx) {
            *m = if verdict { Mark::Match } else { Mark::NoMatch };
        }
        Some(verdict)
    }

    fn judge(&self, idx: usize, model: &mut Model) -> Option<bool> {
        let commit = model.commit(idx)?;
        let m = &self.matcher;
        match self.query.mode {
            SearchMode::CommitId => Some(m.is_match(&commit.id)),
            SearchMode::Message => Some(m.is_match(&commit.message())),
            SearchMode::FilePath => {
                if let Some(changes) = &commit.changes {
                    return Some(changes.keys().any(|p| m.is_match(p)));
                }
                let key = model.diff_key(&commit.id);
                match model.get_diff(&key) {
                    DiffEntry::Loaded(diff) => Some(diff.paths().any(|p| self.matcher.is_match(p))),
                    DiffEntry::Failed(_) => Some(false),
                    DiffEntry::Pending => None,
                }
            }
            SearchMode::DiffContent => {
                let key = model.diff_key(&commit.id);
                match model.get_diff(&key) {
                    DiffEntry::Loaded(diff) => {
                        Some(diff.changed_text().any(|t| self.matcher.is_match(t)))
                    }
                    DiffEntry::Failed(_) => Some(false),
                    DiffEntry::Pending => None,
                }
            }
        }
    }

    /// Start diff fetches for the next few commits in scan order.
    fn prefetch(&self, idx: usize, model: &mut Model, window: usize) {
        let end = (idx + 1 + window).min(model.len());
        for i in idx + 1..end {
            if self.marks.get(i) != Some(&Mark::Unknown) {
                continue;
            }
            let Some(commit) = model.commit(i) else {
                break;
            };
            if self.query.mode == SearchMode::FilePath && commit.changes.is_some() {
                continue;
            }
            let key = model.diff_key(&commit.id);
            model.get_diff(&key);
        }
    }

    fn known_matches(&self) -> impl Iterator<Item = usize> + '_ {
        self.marks
            .iter()
            .enumerate()
            .filter(|(_, m)| **m == Mark::Match)
            .map(|(i, _)| i)
    }

    fn fully_scanned(&self, len: usize) -> bool {
        self.marks.len() >= len && self.marks[..len].iter().all(|m| *m != Mark::Unknown)
    }
}

/// Position of the current match among the known ones, for the status bar.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchStatus {
    pub query: SearchQuery,
    pub position: Option<usize>,
    pub known: usize,
    pub complete: bool,
}

impl fmt::Display for SearchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let more = if self.complete { "" } else { "+" };
        match (self.position, self.known) {
            (_, 0) if self.complete => write!(f, "no matches for '{}'", self.query.pattern),
            (_, 0) => write!(f, "searching '{}'", self.query.pattern),
            (Some(p), n) => write!(f, "match {} of {}{}", p, n, more),
            (None, n) => write!(f, "{}{} matches", n, more),
        }
    }
}

pub struct SearchEngine {
    cursor: Option<MatchCursor>,
    page_size: usize,
    prefetch: usize,
}

impl SearchEngine {
    pub fn new(page_size: usize, prefetch: usize) -> Self {
        Self {
            cursor: None,
            page_size,
            prefetch,
        }
    }

    /// Compile `query` and start a fresh cursor at `start`. An invalid query
    /// leaves no cursor behind.
    pub fn search(&mut self, query: SearchQuery, start: usize, model: &Model) -> Result<(), QueryError> {
        self.cursor = None;
        let matcher = Matcher::compile(&query)?;
        tracing::debug!("search {:?} '{}'", query.mode, query.pattern);
        let mut cursor = MatchCursor::new(query, matcher, model, start);
        cursor.grow(model.len());
        self.cursor = Some(cursor);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.cursor = None;
    }

    pub fn is_active(&self) -> bool {
        self.cursor.is_some()
    }

    pub fn query(&self) -> Option<&SearchQuery> {
        self.cursor.as_ref().map(|c| &c.query)
    }

    /// Rebuild the cursor lazily when the commit list was reset underneath it,
    /// and rescan diff-based modes when the diffs changed.
    pub fn sync(&mut self, model: &Model, selection: usize) {
        let Some(cursor) = self.cursor.as_mut() else {
            return;
        };
        if cursor.epoch != model.log_epoch() {
            let query = cursor.query.clone();
            if let Ok(matcher) = Matcher::compile(&query) {
                tracing::debug!("search cursor stale, rebuilding");
                *cursor = MatchCursor::new(query, matcher, model, selection);
            }
        }
        cursor.refresh(model);
    }

    /// First match at or after the scan start, wrapping.
    pub fn first(&mut self, model: &mut Model) -> SearchStep {
        let Some(start) = self.cursor.as_ref().map(|c| c.start) else {
            return SearchStep::NoMatches;
        };
        self.seek(start, true, Direction::Next, model)
    }

    pub fn next(&mut self, from: usize, model: &mut Model) -> SearchStep {
        self.seek(from, false, Direction::Next, model)
    }

    pub fn previous(&mut self, from: usize, model: &mut Model) -> SearchStep {
        self.seek(from, false, Direction::Previous, model)
    }

    pub fn step(&mut self, dir: Direction, from: usize, model: &mut Model) -> SearchStep {
        match dir {
            Direction::Next => self.next(from, model),
            Direction::Previous => self.previous(from, model),
        }
    }

    fn seek(&mut self, from: usize, inclusive: bool, dir: Direction, model: &mut Model) -> SearchStep {
        let (page_size, prefetch) = (self.page_size, self.prefetch);
        let Some(cursor) = self.cursor.as_mut() else {
            return SearchStep::NoMatches;
        };
        cursor.refresh(model);

        let len = model.len();
        if len == 0 {
            return match model.load_more(page_size) {
                LoadMore::Started(_) | LoadMore::InFlight(_) => SearchStep::Pending,
                _ => SearchStep::NoMatches,
            };
        }

        let mut pos = from.min(len - 1);
        let mut first = inclusive;
        for _ in 0..=len {
            if first {
                first = false;
            } else {
                match dir {
                    Direction::Next => {
                        pos += 1;
                        if pos >= len {
                            if !model.reached_end() {
                                match model.load_more(page_size) {
                                    LoadMore::Started(_) | LoadMore::InFlight(_) => {
                                        return SearchStep::Pending;
                                    }
                                    LoadMore::Exhausted | LoadMore::Failed(_) => {}
                                }
                            }
                            pos = 0;
                        }
                    }
                    Direction::Previous => {
                        pos = if pos == 0 { len - 1 } else { pos - 1 };
                    }
                }
            }

            match cursor.eval(pos, model, prefetch) {
                Some(true) => {
                    cursor.current = Some(pos);
                    return SearchStep::Found(pos);
                }
                Some(false) => {}
                None => return SearchStep::Pending,
            }
        }

        SearchStep::NoMatches
    }

    /// Scan up to `budget` unevaluated commits in scan order for highlighting.
    /// Returns true when more work remains in the loaded history.
    pub fn advance(&mut self, budget: usize, model: &mut Model) -> bool {
        let prefetch = self.prefetch;
        let Some(cursor) = self.cursor.as_mut() else {
            return false;
        };
        cursor.refresh(model);
        let len = model.len();

        let mut spent = 0;
        while spent < budget {
            let idx = if cursor.hi < len {
                cursor.hi
            } else if cursor.lo < cursor.start {
                cursor.lo
            } else {
                return false;
            };
            match cursor.eval(idx, model, prefetch) {
                None => return true,
                Some(_) => {
                    if idx == cursor.hi {
                        cursor.hi += 1;
                    } else {
                        cursor.lo += 1;
                    }
                }
            }
            spent += 1;
        }
        cursor.hi < len || cursor.lo < cursor.start
    }

    pub fn is_match(&self, idx: usize) -> bool {
        self.cursor
            .as_ref()
            .and_then(|c| c.marks.get(idx))
            .is_some_and(|m| *m == Mark::Match)
    }

    /// Known matches in model order.
    pub fn matches(&self) -> Vec<usize> {
        self.cursor
            .as_ref()
            .map(|c| c.known_matches().collect())
            .unwrap_or_default()
    }

    pub fn status(&self, model: &Model) -> Option<SearchStatus> {
        let cursor = self.cursor.as_ref()?;
        let matches: Vec<usize> = cursor.known_matches().collect();
        let position = cursor
            .current
            .and_then(|cur| matches.iter().position(|&m| m == cur))
            .map(|p| p + 1);
        Some(SearchStatus {
            query: cursor.query.clone(),
            position,
            known: matches.len(),
            complete: model.reached_end() && cursor.fully_scanned(model.len()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::DiffSettings;
    use crate::source::fake::{self, FakeSource};
    use std::sync::Arc;
    use std::time::Duration;

    fn query(mode: SearchMode, pattern: &str) -> SearchQuery {
        SearchQuery {
            mode,
            flags: SearchFlags::default(),
            pattern: pattern.to_string(),
        }
    }

    async fn settle(model: &mut Model) {
        while !model.pending().is_empty() {
            let c = tokio::time::timeout(Duration::from_secs(5), model.recv())
                .await
                .expect("timed out")
                .expect("channel closed");
            model.handle(c);
        }
    }

    async fn loaded(source: Arc<FakeSource>, page: usize) -> Model {
        let mut model = Model::new(source, vec![], DiffSettings::default(), 64);
        model.load_more(page);
        settle(&mut model).await;
        model
    }

    fn subjects(subjects: &[&str]) -> Arc<FakeSource> {
        let commits = subjects
            .iter()
            .enumerate()
            .map(|(i, s)| fake::commit(&format!("{:040x}", i + 1), &[], s))
            .collect();
        Arc::new(FakeSource::with_commits(commits))
    }

    #[tokio::test]
    async fn test_fix_message_scenario() {
        let mut model = loaded(subjects(&["Fix bug", "Fixups", "unrelated"]), 10).await;
        let mut engine = SearchEngine::new(10, 4);
        engine.search(query(SearchMode::Message, "fix"), 0, &model).unwrap();

        assert_eq!(engine.first(&mut model), SearchStep::Found(0));
        assert_eq!(engine.next(0, &mut model), SearchStep::Found(1));
        assert_eq!(engine.next(1, &mut model), SearchStep::Found(0));
        assert_eq!(engine.previous(0, &mut model), SearchStep::Found(1));
        assert_eq!(engine.matches(), vec![0, 1]);

        let status = engine.status(&model).unwrap();
        assert_eq!(status.to_string(), "match 2 of 2");
    }

    #[tokio::test]
    async fn test_empty_pattern_yields_no_cursor() {
        let model = loaded(subjects(&["a", "b"]), 10).await;
        let mut engine = SearchEngine::new(10, 4);
        for mode in [
            SearchMode::CommitId,
            SearchMode::Message,
            SearchMode::DiffContent,
            SearchMode::FilePath,
        ] {
            assert_eq!(engine.search(query(mode, ""), 0, &model), Err(QueryError::EmptyPattern));
            assert!(engine.matches().is_empty());
            assert!(engine.status(&model).is_none());
        }
    }

    #[tokio::test]
    async fn test_invalid_regex_is_a_query_error() {
        let model = loaded(subjects(&["a"]), 10).await;
        let mut engine = SearchEngine::new(10, 4);
        let mut q = query(SearchMode::Message, "fix(");
        q.flags.regex = true;
        assert!(matches!(engine.search(q, 0, &model), Err(QueryError::InvalidRegex(_))));
        assert!(!engine.is_active());
    }

    #[tokio::test]
    async fn test_next_wraps_after_match_count() {
        let mut model =
            loaded(subjects(&["feat: a", "chore", "feat: b", "docs", "feat: c"]), 10).await;
        let mut engine = SearchEngine::new(10, 4);
        let mut q = query(SearchMode::Message, "^feat");
        q.flags.regex = true;
        engine.search(q, 2, &model).unwrap();

        let SearchStep::Found(start) = engine.first(&mut model) else {
            panic!("expected a match");
        };
        assert_eq!(start, 2);
        let mut pos = start;
        for _ in 0..3 {
            let SearchStep::Found(p) = engine.next(pos, &mut model) else {
                panic!("expected a match");
            };
            pos = p;
        }
        assert_eq!(pos, start);
    }

    #[tokio::test]
    async fn test_case_sensitive_and_commit_prefix() {
        let mut model = loaded(subjects(&["Fix bug", "fix typo"]), 10).await;
        let mut engine = SearchEngine::new(10, 4);
        let mut q = query(SearchMode::Message, "fix");
        q.flags.case_sensitive = true;
        engine.search(q, 0, &model).unwrap();
        assert_eq!(engine.first(&mut model), SearchStep::Found(1));
        assert_eq!(engine.next(1, &mut model), SearchStep::Found(1));

        let id = model.commit(0).unwrap().id.clone();
        engine.search(query(SearchMode::CommitId, &id), 1, &model).unwrap();
        assert_eq!(engine.first(&mut model), SearchStep::Found(0));
        engine.search(query(SearchMode::CommitId, "zz"), 0, &model).unwrap();
        assert_eq!(engine.first(&mut model), SearchStep::NoMatches);
    }

    #[tokio::test]
    async fn test_next_loads_more_history_before_wrapping() {
        let mut commits = fake::linear(6);
        commits[4].subject = "needle".to_string();
        let source = Arc::new(FakeSource::with_commits(commits));
        let mut model = loaded(source, 3).await;
        assert!(!model.reached_end());

        let mut engine = SearchEngine::new(3, 4);
        engine.search(query(SearchMode::Message, "needle"), 0, &model).unwrap();
        assert_eq!(engine.next(0, &mut model), SearchStep::Pending);
        settle(&mut model).await;
        engine.sync(&model, 0);
        assert_eq!(engine.next(0, &mut model), SearchStep::Found(4));
    }

    #[tokio::test]
    async fn test_diff_content_fetches_on_demand() {
        let source = Arc::new(FakeSource::with_commits(fake::linear(3)));
        source.set_diff("c3", vec![fake::file("a.rs", &[" let unchanged = 1;"])]);
        source.set_diff("c2", vec![fake::file("b.rs", &["+let needle = 2;"])]);
        source.set_diff("c1", vec![fake::file("c.rs", &["-let needle = 3;"])]);
        let mut model = loaded(source, 10).await;

        let mut engine = SearchEngine::new(10, 1);
        engine.search(query(SearchMode::DiffContent, "needle"), 0, &model).unwrap();
        assert_eq!(engine.first(&mut model), SearchStep::Pending);
        settle(&mut model).await;
        let mut step = engine.first(&mut model);
        while step == SearchStep::Pending {
            settle(&mut model).await;
            step = engine.first(&mut model);
        }
        assert_eq!(step, SearchStep::Found(1));
    }

    #[tokio::test]
    async fn test_context_lines_do_not_match_diff_content() {
        let source = Arc::new(FakeSource::with_commits(fake::linear(1)));
        source.set_diff("c1", vec![fake::file("a.rs", &[" needle in context"])]);
        let mut model = loaded(source, 10).await;
        let mut engine = SearchEngine::new(10, 0);
        engine.search(query(SearchMode::DiffContent, "needle"), 0, &model).unwrap();
        while engine.advance(10, &mut model) {
            settle(&mut model).await;
        }
        assert!(engine.matches().is_empty());
        assert_eq!(engine.status(&model).unwrap().to_string(), "no matches for 'needle'");
    }

    async fn first_settled(engine: &mut SearchEngine, model: &mut Model) -> SearchStep {
        let mut step = engine.first(model);
        while step == SearchStep::Pending {
            settle(model).await;
            step = engine.first(model);
        }
        step
    }

    #[tokio::test]
    async fn test_new_diff_options_rescan_diff_content() {
        let source = Arc::new(FakeSource::with_commits(fake::linear(1)));
        source.set_diff("c1", vec![fake::file("a.rs", &["+needle"])]);
        let mut model = loaded(source.clone(), 10).await;
        let mut engine = SearchEngine::new(10, 0);
        engine.search(query(SearchMode::DiffContent, "needle"), 0, &model).unwrap();
        assert_eq!(first_settled(&mut engine, &mut model).await, SearchStep::Found(0));

        source.set_diff("c1", vec![fake::file("a.rs", &[" needle"])]);
        model.set_diff_settings(DiffSettings {
            ignore_whitespace: true,
            ..model.diff_settings()
        });
        engine.sync(&model, 0);
        assert!(!engine.is_match(0));
        assert_eq!(engine.first(&mut model), SearchStep::Pending);
        let new_key = model.diff_key("c1");
        assert!(matches!(model.peek_diff(&new_key), Some(DiffEntry::Pending)));
        assert_eq!(first_settled(&mut engine, &mut model).await, SearchStep::NoMatches);
    }

    #[tokio::test]
    async fn test_retried_diff_is_judged_again() {
        let source = Arc::new(FakeSource::with_commits(fake::linear(1)));
        let mut model = loaded(source.clone(), 10).await;
        let mut engine = SearchEngine::new(10, 0);
        engine.search(query(SearchMode::DiffContent, "needle"), 0, &model).unwrap();
        assert_eq!(first_settled(&mut engine, &mut model).await, SearchStep::NoMatches);

        source.set_diff("c1", vec![fake::file("a.rs", &["-needle"])]);
        let key = model.diff_key("c1");
        model.retry_diff(&key);
        settle(&mut model).await;
        engine.sync(&model, 0);
        assert_eq!(first_settled(&mut engine, &mut model).await, SearchStep::Found(0));
    }

    #[tokio::test]
    async fn test_message_regex_spans_subject_and_body() {
        let mut commits = fake::linear(1);
        commits[0].subject = "Fix parser".to_string();
        commits[0].body = "Closes #12".to_string();
        let mut model = loaded(Arc::new(FakeSource::with_commits(commits)), 10).await;
        let mut engine = SearchEngine::new(10, 0);
        let mut q = query(SearchMode::Message, r"parser\s+Closes");
        q.flags.regex = true;
        engine.search(q, 0, &model).unwrap();
        assert_eq!(engine.first(&mut model), SearchStep::Found(0));
    }

    #[tokio::test]
    async fn test_file_path_uses_known_changes() {
        let mut commits = fake::linear(2);
        commits[0].changes = Some([("src/main.rs".to_string(), crate::diff::ChangeKind::Modified)].into());
        commits[1].changes = Some(Default::default());
        let mut model = loaded(Arc::new(FakeSource::with_commits(commits)), 10).await;
        let mut engine = SearchEngine::new(10, 4);
        engine.search(query(SearchMode::FilePath, "MAIN"), 1, &model).unwrap();
        assert_eq!(engine.first(&mut model), SearchStep::Found(0));
        assert!(model.pending().is_empty());
    }

    #[tokio::test]
    async fn test_cursor_rebuilt_after_reload() {
        let mut model = loaded(subjects(&["Fix bug", "other"]), 10).await;
        let mut engine = SearchEngine::new(10, 4);
        engine.search(query(SearchMode::Message, "fix"), 0, &model).unwrap();
        assert_eq!(engine.first(&mut model), SearchStep::Found(0));

        model.invalidate(crate::model::InvalidateScope::CommitList);
        model.load_more(10);
        settle(&mut model).await;
        engine.sync(&model, 0);
        assert!(engine.matches().is_empty());
        assert_eq!(engine.first(&mut model), SearchStep::Found(0));
    }

    #[tokio::test]
    async fn test_advance_marks_matches() {
        let mut model = loaded(subjects(&["x fix", "y", "z fix"]), 10).await;
        let mut engine = SearchEngine::new(10, 4);
        engine.search(query(SearchMode::Message, "fix"), 1, &model).unwrap();
        assert!(engine.advance(1, &mut model));
        assert!(!engine.advance(10, &mut model));
        assert!(engine.is_match(0));
        assert!(engine.is_match(2));
        assert!(!engine.is_match(1));
        assert_eq!(engine.status(&model).unwrap().to_string(), "2 matches");
    }
}
