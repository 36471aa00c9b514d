//! In-memory commits, diffs and references, loaded lazily through the fetcher.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use crate::diff::{BlameOrigin, BlameTarget, ChangeKind, CommitDiff, DiffKey, DiffSettings};
use crate::diff_cache::{CachedDiff, DiffCache};
use crate::error::{FetchError, MutationError};
use crate::fetch::{Completion, FetchHandle, FetchKey, FetchOutput, FetchRequest, Fetcher, PendingFetch};
use crate::source::{CommitPage, Mutation, RevisionSource};

pub fn short_id(id: &str) -> &str {
    id.get(..7).unwrap_or(id)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Commit {
    pub id: String,
    pub parents: Vec<String>,
    pub author: String,
    pub date: String,
    pub subject: String,
    pub body: String,
    /// Changed paths, `None` until known (merges, or sources that omit them).
    pub changes: Option<BTreeMap<String, ChangeKind>>,
}

impl Commit {
    pub fn short_id(&self) -> &str {
        short_id(&self.id)
    }

    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }

    /// Subject and body as one message.
    pub fn message(&self) -> String {
        if self.body.is_empty() {
            self.subject.clone()
        } else {
            format!("{}\n\n{}", self.subject, self.body)
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RefKind {
    LocalBranch,
    RemoteBranch,
    Tag,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reference {
    pub name: String,
    pub kind: RefKind,
    pub target: String,
    pub is_head: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParentState {
    Loaded(usize),
    NotLoaded,
}

#[derive(Clone, Debug)]
pub enum DiffEntry {
    Pending,
    Loaded(Arc<CommitDiff>),
    Failed(FetchError),
}

impl From<CachedDiff> for DiffEntry {
    fn from(c: CachedDiff) -> Self {
        match c {
            CachedDiff::Loaded(d) => DiffEntry::Loaded(d),
            CachedDiff::Failed(e) => DiffEntry::Failed(e),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvalidateScope {
    Diff(String),
    References,
    CommitList,
    All,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PageState {
    Idle,
    Loading(FetchHandle),
    Failed(FetchError),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadMore {
    Started(FetchHandle),
    InFlight(FetchHandle),
    Exhausted,
    Failed(FetchError),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RefsState {
    NotLoaded,
    Loading,
    Loaded,
    Failed(FetchError),
}

/// What an applied fetch result changed, for the app to react to.
#[derive(Clone, Debug)]
pub enum ModelEvent {
    CommitsLoaded { added: usize },
    CommitsFailed(FetchError),
    DiffLoaded(DiffKey),
    DiffFailed(DiffKey, FetchError),
    ReferencesLoaded,
    ReferencesFailed(FetchError),
    BlameResolved {
        target: BlameTarget,
        result: Result<BlameOrigin, FetchError>,
    },
    MutationSucceeded(Mutation),
    MutationFailed(Mutation, MutationError),
    CommandFinished {
        args: Vec<String>,
        result: Result<String, FetchError>,
    },
}

pub struct Model {
    fetcher: Fetcher,
    filters: Vec<String>,
    diff_settings: DiffSettings,

    commits: Vec<Commit>,
    index: HashMap<String, usize>,
    delivered: usize,
    reached_end: bool,
    page: PageState,

    diffs: DiffCache,

    refs: Vec<Reference>,
    head: Option<String>,
    refs_by_target: HashMap<String, Vec<usize>>,
    refs_state: RefsState,

    generation: u64,
    log_epoch: u64,
    diff_epoch: u64,
}

impl Model {
    pub fn new(
        source: Arc<dyn RevisionSource>,
        filters: Vec<String>,
        diff_settings: DiffSettings,
        diff_cache_capacity: usize,
    ) -> Self {
        Self {
            fetcher: Fetcher::new(source),
            filters,
            diff_settings,
            commits: Vec::new(),
            index: HashMap::new(),
            delivered: 0,
            reached_end: false,
            page: PageState::Idle,
            diffs: DiffCache::new(diff_cache_capacity),
            refs: Vec::new(),
            head: None,
            refs_by_target: HashMap::new(),
            refs_state: RefsState::NotLoaded,
            generation: 0,
            log_epoch: 0,
            diff_epoch: 0,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn log_epoch(&self) -> u64 {
        self.log_epoch
    }

    /// Bumped whenever diffs seen so far may no longer hold: new diff
    /// options, an explicit retry, or an invalidated diff.
    pub fn diff_epoch(&self) -> u64 {
        self.diff_epoch
    }

    pub fn commits(&self) -> &[Commit] {
        &self.commits
    }

    pub fn commit(&self, idx: usize) -> Option<&Commit> {
        self.commits.get(idx)
    }

    pub fn len(&self) -> usize {
        self.commits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn reached_end(&self) -> bool {
        self.reached_end
    }

    pub fn page_state(&self) -> &PageState {
        &self.page
    }

    /// Parent `n` of the commit at `idx`. A parent outside the loaded window is
    /// reported as `NotLoaded`, never dropped.
    pub fn parent_state(&self, idx: usize, n: usize) -> Option<ParentState> {
        let parent = self.commits.get(idx)?.parents.get(n)?;
        Some(match self.index.get(parent) {
            Some(&i) => ParentState::Loaded(i),
            None => ParentState::NotLoaded,
        })
    }

    /// True when some parent of the commit is not loaded.
    pub fn is_boundary(&self, idx: usize) -> bool {
        self.commits
            .get(idx)
            .is_some_and(|c| c.parents.iter().any(|p| !self.index.contains_key(p)))
    }

    /// Request the next page after the last loaded commit.
    pub fn load_more(&mut self, count: usize) -> LoadMore {
        match &self.page {
            PageState::Loading(h) => return LoadMore::InFlight(*h),
            PageState::Failed(e) => return LoadMore::Failed(e.clone()),
            PageState::Idle => {}
        }
        if self.reached_end {
            return LoadMore::Exhausted;
        }

        let page = CommitPage {
            after: self.commits.last().map(|c| c.id.clone()),
            offset: self.delivered,
            count: count.max(1),
            filters: self.filters.clone(),
        };
        let handle = self.fetcher.submit(FetchRequest::Commits(page));
        self.page = PageState::Loading(handle);
        LoadMore::Started(handle)
    }

    pub fn retry_load(&mut self, count: usize) -> LoadMore {
        if let PageState::Failed(_) = self.page {
            self.page = PageState::Idle;
            self.generation += 1;
        }
        self.load_more(count)
    }

    pub fn diff_settings(&self) -> DiffSettings {
        self.diff_settings
    }

    pub fn set_diff_settings(&mut self, settings: DiffSettings) {
        if self.diff_settings != settings {
            self.diff_settings = settings;
            self.diff_epoch += 1;
            self.generation += 1;
        }
    }

    pub fn diff_key(&self, commit: &str) -> DiffKey {
        self.diff_settings.key_for(commit)
    }

    /// Diff for `key`, fetching it on a miss. A failed entry stays failed until `retry_diff`.
    pub fn get_diff(&mut self, key: &DiffKey) -> DiffEntry {
        if let Some(entry) = self.diffs.get(key) {
            return entry.into();
        }
        let fetch_key = FetchKey::Diff(key.clone());
        if !self.fetcher.is_busy(&fetch_key) {
            self.fetcher.submit(FetchRequest::Diff(key.clone()));
        }
        DiffEntry::Pending
    }

    /// Cached state of `key` without starting a fetch.
    pub fn peek_diff(&self, key: &DiffKey) -> Option<DiffEntry> {
        if let Some(entry) = self.diffs.peek(key) {
            return Some(entry.into());
        }
        self.fetcher
            .is_busy(&FetchKey::Diff(key.clone()))
            .then_some(DiffEntry::Pending)
    }

    pub fn retry_diff(&mut self, key: &DiffKey) -> DiffEntry {
        self.diffs.remove(key);
        self.diff_epoch += 1;
        self.generation += 1;
        self.get_diff(key)
    }

    pub fn load_references(&mut self) {
        if self.fetcher.is_busy(&FetchKey::References) {
            return;
        }
        self.fetcher.submit(FetchRequest::References);
        self.refs_state = RefsState::Loading;
    }

    pub fn references(&self) -> &[Reference] {
        &self.refs
    }

    pub fn refs_state(&self) -> &RefsState {
        &self.refs_state
    }

    pub fn head(&self) -> Option<&str> {
        self.head.as_deref()
    }

    /// References pointing at `commit`: local branches, remote branches, then tags.
    pub fn refs_for(&self, commit: &str) -> Vec<&Reference> {
        self.refs_by_target
            .get(commit)
            .map(|ids| ids.iter().filter_map(|&i| self.refs.get(i)).collect())
            .unwrap_or_default()
    }

    pub fn invalidate(&mut self, scope: InvalidateScope) {
        tracing::debug!("invalidate {:?}", scope);
        match scope {
            InvalidateScope::Diff(commit) => {
                self.diffs.invalidate_commit(&commit);
                self.fetcher.cancel_diffs_of(&commit);
                self.diff_epoch += 1;
            }
            InvalidateScope::References => {
                self.fetcher.cancel_key(&FetchKey::References);
                self.refs.clear();
                self.refs_by_target.clear();
                self.head = None;
                self.refs_state = RefsState::NotLoaded;
            }
            InvalidateScope::CommitList => {
                self.fetcher.cancel_key(&FetchKey::Commits);
                self.commits.clear();
                self.index.clear();
                self.delivered = 0;
                self.reached_end = false;
                self.page = PageState::Idle;
                self.log_epoch += 1;
            }
            InvalidateScope::All => {
                self.invalidate(InvalidateScope::CommitList);
                self.invalidate(InvalidateScope::References);
                self.fetcher.cancel_all();
                self.diffs.clear();
                self.diff_epoch += 1;
            }
        }
        self.generation += 1;
    }

    pub fn submit_blame(&mut self, target: BlameTarget) -> FetchHandle {
        self.fetcher.submit(FetchRequest::Blame(target))
    }

    /// Start a mutation unless one is already running.
    pub fn submit_mutation(&mut self, mutation: Mutation) -> Option<FetchHandle> {
        if self.fetcher.is_busy(&FetchKey::Mutation) {
            return None;
        }
        tracing::info!("running {}", mutation.describe());
        Some(self.fetcher.submit(FetchRequest::Mutation(mutation)))
    }

    /// Run a user-typed git command unless one is already running.
    pub fn submit_command(&mut self, args: Vec<String>) -> Option<FetchHandle> {
        if self.fetcher.is_busy(&FetchKey::Command) {
            return None;
        }
        tracing::info!("running git {}", args.join(" "));
        Some(self.fetcher.submit(FetchRequest::Command(args)))
    }

    pub fn cancel(&mut self, handle: FetchHandle) -> bool {
        let cancelled = self.fetcher.cancel(handle);
        if cancelled && self.page == PageState::Loading(handle) {
            self.page = PageState::Idle;
        }
        cancelled
    }

    pub fn cancel_all(&mut self) -> usize {
        let n = self.fetcher.cancel_all();
        if let PageState::Loading(_) = self.page {
            self.page = PageState::Idle;
        }
        if self.refs_state == RefsState::Loading {
            self.refs_state = RefsState::NotLoaded;
        }
        n
    }

    pub fn pending(&self) -> Vec<PendingFetch> {
        self.fetcher.pending()
    }

    pub async fn recv(&mut self) -> Option<Completion> {
        self.fetcher.recv().await
    }

    /// Apply a completion if it is still live; stale ones are dropped.
    pub fn handle(&mut self, completion: Completion) -> Option<ModelEvent> {
        let output = self.fetcher.accept(completion)?;
        self.apply(output)
    }

    /// Apply every completion that is already waiting.
    pub fn drain(&mut self) -> Vec<ModelEvent> {
        let mut events = Vec::new();
        while let Some(c) = self.fetcher.try_recv() {
            events.extend(self.handle(c));
        }
        events
    }

    fn apply(&mut self, output: FetchOutput) -> Option<ModelEvent> {
        let event = match output {
            FetchOutput::Commits { page, result } => match result {
                Ok(batch) => {
                    self.delivered = page.offset + batch.len();
                    self.reached_end = batch.len() < page.count;
                    let before = self.commits.len();
                    for c in batch {
                        if self.index.contains_key(&c.id) {
                            continue;
                        }
                        self.index.insert(c.id.clone(), self.commits.len());
                        self.commits.push(c);
                    }
                    self.page = PageState::Idle;
                    let added = self.commits.len() - before;
                    tracing::debug!("loaded {} commits ({} total)", added, self.commits.len());
                    ModelEvent::CommitsLoaded { added }
                }
                Err(e) => {
                    tracing::warn!("{}", e);
                    self.page = PageState::Failed(e.clone());
                    ModelEvent::CommitsFailed(e)
                }
            },
            FetchOutput::Diff { key, result } => match result {
                Ok(diff) => {
                    self.diffs.insert(key.clone(), CachedDiff::Loaded(Arc::new(diff)));
                    ModelEvent::DiffLoaded(key)
                }
                Err(e) => {
                    tracing::warn!("{}", e);
                    self.diffs.insert(key.clone(), CachedDiff::Failed(e.clone()));
                    ModelEvent::DiffFailed(key, e)
                }
            },
            FetchOutput::References(result) => match result {
                Ok(list) => {
                    self.set_references(list.refs, list.head);
                    ModelEvent::ReferencesLoaded
                }
                Err(e) => {
                    tracing::warn!("{}", e);
                    self.refs_state = RefsState::Failed(e.clone());
                    ModelEvent::ReferencesFailed(e)
                }
            },
            FetchOutput::Blame { target, result } => ModelEvent::BlameResolved { target, result },
            FetchOutput::Mutation { mutation, result } => match result {
                Ok(()) => {
                    for scope in mutation.scopes() {
                        self.invalidate(scope);
                    }
                    ModelEvent::MutationSucceeded(mutation)
                }
                Err(e) => {
                    tracing::warn!("{}", e);
                    return Some(ModelEvent::MutationFailed(mutation, e));
                }
            },
            FetchOutput::Command { args, result } => {
                if let Err(e) = &result {
                    tracing::warn!("{}", e);
                }
                return Some(ModelEvent::CommandFinished { args, result });
            }
        };
        self.generation += 1;
        Some(event)
    }

    fn set_references(&mut self, mut refs: Vec<Reference>, head: Option<String>) {
        refs.sort_by(|a, b| (a.kind, &a.name).cmp(&(b.kind, &b.name)));
        let mut seen = HashSet::new();
        refs.retain(|r| seen.insert((r.kind, r.name.clone())));

        self.refs_by_target.clear();
        for (i, r) in refs.iter().enumerate() {
            self.refs_by_target.entry(r.target.clone()).or_default().push(i);
        }
        self.refs = refs;
        self.head = head;
        self.refs_state = RefsState::Loaded;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::fake::{self, FakeSource, calls};
    use std::time::Duration;

    fn model_with(source: Arc<FakeSource>) -> Model {
        Model::new(source, vec!["--all".to_string()], DiffSettings::default(), 16)
    }

    async fn settle(model: &mut Model) -> Vec<ModelEvent> {
        let mut events = Vec::new();
        while !model.pending().is_empty() {
            let c = tokio::time::timeout(Duration::from_secs(5), model.recv())
                .await
                .expect("timed out")
                .expect("channel closed");
            events.extend(model.handle(c));
        }
        events
    }

    #[tokio::test]
    async fn test_load_more_coalesces_and_appends() {
        let source = Arc::new(FakeSource::with_commits(fake::linear(5)));
        *source.delay.lock() = Some(Duration::from_millis(10));
        let mut model = model_with(source.clone());

        let first = model.load_more(3);
        assert!(matches!(first, LoadMore::Started(_)));
        let LoadMore::Started(h) = first else { unreachable!() };
        assert_eq!(model.load_more(3), LoadMore::InFlight(h));
        settle(&mut model).await;
        assert_eq!(calls(&source.commit_calls), 1);
        assert_eq!(model.len(), 3);

        model.load_more(3);
        settle(&mut model).await;
        assert_eq!(model.len(), 5);
        assert!(model.reached_end());
        assert_eq!(model.load_more(3), LoadMore::Exhausted);

        let ids: Vec<&str> = model.commits().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c5", "c4", "c3", "c2", "c1"]);
    }

    #[tokio::test]
    async fn test_duplicate_ids_are_skipped() {
        let mut commits = fake::linear(3);
        commits.insert(2, commits[0].clone());
        let source = Arc::new(FakeSource::with_commits(commits));
        let mut model = model_with(source);
        model.load_more(10);
        settle(&mut model).await;
        assert_eq!(model.len(), 3);
        assert_eq!(model.index_of("c1"), Some(2));
    }

    #[tokio::test]
    async fn test_boundary_parent_not_loaded() {
        let source = Arc::new(FakeSource::with_commits(fake::linear(4)));
        let mut model = model_with(source);
        model.load_more(2);
        settle(&mut model).await;
        assert_eq!(model.parent_state(0, 0), Some(ParentState::Loaded(1)));
        assert_eq!(model.parent_state(1, 0), Some(ParentState::NotLoaded));
        assert!(model.is_boundary(1));
        assert!(!model.is_boundary(0));
    }

    #[tokio::test]
    async fn test_failed_page_is_not_retried_automatically() {
        let source = Arc::new(FakeSource::with_commits(fake::linear(2)));
        *source.fail_commits.lock() = true;
        let mut model = model_with(source.clone());
        model.load_more(10);
        let events = settle(&mut model).await;
        assert!(matches!(events[0], ModelEvent::CommitsFailed(_)));
        assert!(matches!(model.load_more(10), LoadMore::Failed(_)));
        assert_eq!(calls(&source.commit_calls), 1);

        *source.fail_commits.lock() = false;
        assert!(matches!(model.retry_load(10), LoadMore::Started(_)));
        settle(&mut model).await;
        assert_eq!(model.len(), 2);
    }

    #[tokio::test]
    async fn test_diff_cache_keyed_by_settings() {
        let source = Arc::new(FakeSource::with_commits(fake::linear(1)));
        source.set_diff("c1", vec![fake::file("a.rs", &["+x"])]);
        let mut model = model_with(source.clone());

        let narrow = DiffSettings { context: 1, ignore_whitespace: false }.key_for("c1");
        let wide = DiffSettings { context: 10, ignore_whitespace: false }.key_for("c1");
        assert!(matches!(model.get_diff(&narrow), DiffEntry::Pending));
        assert!(matches!(model.get_diff(&narrow), DiffEntry::Pending));
        settle(&mut model).await;
        assert_eq!(calls(&source.diff_calls), 1);
        assert!(matches!(model.get_diff(&narrow), DiffEntry::Loaded(_)));

        assert!(matches!(model.get_diff(&wide), DiffEntry::Pending));
        settle(&mut model).await;
        assert_eq!(calls(&source.diff_calls), 2);
        assert!(matches!(model.peek_diff(&narrow), Some(DiffEntry::Loaded(_))));
    }

    #[tokio::test]
    async fn test_failed_diff_stays_failed_until_retry() {
        let source = Arc::new(FakeSource::default());
        let mut model = model_with(source.clone());
        let key = model.diff_key("missing");
        model.get_diff(&key);
        settle(&mut model).await;
        assert!(matches!(model.get_diff(&key), DiffEntry::Failed(_)));
        assert_eq!(calls(&source.diff_calls), 1);

        source.set_diff("missing", vec![]);
        assert!(matches!(model.retry_diff(&key), DiffEntry::Pending));
        settle(&mut model).await;
        assert!(matches!(model.get_diff(&key), DiffEntry::Loaded(_)));
    }

    #[tokio::test]
    async fn test_cancelled_fetch_never_mutates() {
        let source = Arc::new(FakeSource::with_commits(fake::linear(3)));
        *source.delay.lock() = Some(Duration::from_millis(30));
        let mut model = model_with(source);
        let LoadMore::Started(handle) = model.load_more(3) else {
            panic!("expected a fetch");
        };
        let generation = model.generation();
        assert!(model.cancel(handle));
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(model.drain().is_empty());
        assert_eq!(model.len(), 0);
        assert_eq!(model.generation(), generation);
    }

    #[tokio::test]
    async fn test_invalidate_commit_list_bumps_epoch() {
        let source = Arc::new(FakeSource::with_commits(fake::linear(3)));
        let mut model = model_with(source);
        model.load_more(10);
        settle(&mut model).await;
        let (generation, epoch) = (model.generation(), model.log_epoch());

        model.invalidate(InvalidateScope::Diff("c1".to_string()));
        assert_eq!(model.log_epoch(), epoch);
        assert!(model.generation() > generation);

        model.invalidate(InvalidateScope::CommitList);
        assert_eq!(model.log_epoch(), epoch + 1);
        assert!(model.is_empty());
        assert!(!model.reached_end());
    }

    #[tokio::test]
    async fn test_references_and_labels() {
        let source = Arc::new(FakeSource::with_commits(fake::linear(2)));
        *source.refs.lock() = crate::source::RefList {
            refs: vec![
                Reference { name: "v1".into(), kind: RefKind::Tag, target: "c2".into(), is_head: false },
                Reference { name: "origin/main".into(), kind: RefKind::RemoteBranch, target: "c2".into(), is_head: false },
                Reference { name: "main".into(), kind: RefKind::LocalBranch, target: "c2".into(), is_head: true },
            ],
            head: Some("c2".into()),
        };
        let mut model = model_with(source);
        model.load_references();
        assert_eq!(model.refs_state(), &RefsState::Loading);
        settle(&mut model).await;
        let names: Vec<&str> = model.refs_for("c2").iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["main", "origin/main", "v1"]);
        assert_eq!(model.head(), Some("c2"));
        assert!(model.refs_for("c1").is_empty());
    }

    #[tokio::test]
    async fn test_mutation_failure_leaves_model_untouched() {
        let source = Arc::new(FakeSource::with_commits(fake::linear(2)));
        *source.fail_mutation.lock() = Some("conflict".to_string());
        let mut model = model_with(source);
        model.load_more(10);
        settle(&mut model).await;
        let generation = model.generation();

        let m = Mutation::SoftReset { commit: "c1".into() };
        assert!(model.submit_mutation(m.clone()).is_some());
        assert!(model.submit_mutation(m).is_none());
        let events = settle(&mut model).await;
        assert!(matches!(&events[0], ModelEvent::MutationFailed(_, e) if e.detail == "conflict"));
        assert_eq!(model.len(), 2);
        assert_eq!(model.generation(), generation);
    }

    #[tokio::test]
    async fn test_mutation_success_invalidates_scope() {
        let source = Arc::new(FakeSource::with_commits(fake::linear(2)));
        let mut model = model_with(source);
        model.load_more(10);
        settle(&mut model).await;
        let epoch = model.log_epoch();

        model.submit_mutation(Mutation::Revert { commit: "c2".into() });
        let events = settle(&mut model).await;
        assert!(matches!(events[0], ModelEvent::MutationSucceeded(_)));
        assert_eq!(model.log_epoch(), epoch + 1);
        assert!(model.is_empty());
    }

    #[tokio::test]
    async fn test_command_runs_one_at_a_time_and_keeps_the_log() {
        let source = Arc::new(FakeSource::with_commits(fake::linear(2)));
        *source.command_output.lock() = Some(Err("unknown revision".to_string()));
        let mut model = model_with(source.clone());
        model.load_more(10);
        settle(&mut model).await;
        let generation = model.generation();

        let args = vec!["show".to_string(), "c2".to_string()];
        assert!(model.submit_command(args.clone()).is_some());
        assert!(model.submit_command(args.clone()).is_none());
        let events = settle(&mut model).await;
        match &events[0] {
            ModelEvent::CommandFinished { args: got, result } => {
                assert_eq!(got, &args);
                assert_eq!(result.as_ref().unwrap_err().detail, "unknown revision");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(model.len(), 2);
        assert_eq!(model.generation(), generation);
        assert_eq!(source.commands.lock().len(), 1);
    }
}
