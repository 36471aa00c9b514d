//! The narrow interface to the repository that every background fetch goes through.

use std::path::PathBuf;

use crate::diff::{self, BlameOrigin, BlameTarget, CommitDiff, DiffKey};
use crate::error::{FetchError, MutationError};
use crate::git_ops;
use crate::model::{Commit, InvalidateScope, RefKind, Reference};

/// One page of history. `offset` counts commits already delivered for the
/// same filters; `after` is the last of them, kept for logging.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitPage {
    pub after: Option<String>,
    pub offset: usize,
    pub count: usize,
    pub filters: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RefList {
    pub refs: Vec<Reference>,
    pub head: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Mutation {
    CherryPick { commit: String },
    Revert { commit: String },
    SoftReset { commit: String },
    HardReset { commit: String },
    CreateBranch { name: String, commit: String },
    CreateTag { name: String, commit: String },
    DeleteReference { reference: Reference },
    PushReference { reference: Reference },
    RenameReference { reference: Reference, new_name: String },
}

impl Mutation {
    pub fn operation(&self) -> &'static str {
        match self {
            Mutation::CherryPick { .. } => "cherry-pick",
            Mutation::Revert { .. } => "revert",
            Mutation::SoftReset { .. } => "soft reset",
            Mutation::HardReset { .. } => "hard reset",
            Mutation::CreateBranch { .. } => "create branch",
            Mutation::CreateTag { .. } => "create tag",
            Mutation::DeleteReference { .. } => "delete reference",
            Mutation::PushReference { .. } => "push",
            Mutation::RenameReference { .. } => "rename reference",
        }
    }

    /// Model state a successful run of this mutation makes stale.
    pub fn scopes(&self) -> Vec<InvalidateScope> {
        match self {
            Mutation::CherryPick { .. }
            | Mutation::Revert { .. }
            | Mutation::SoftReset { .. }
            | Mutation::HardReset { .. } => {
                vec![InvalidateScope::CommitList, InvalidateScope::References]
            }
            Mutation::CreateBranch { .. }
            | Mutation::CreateTag { .. }
            | Mutation::DeleteReference { .. }
            | Mutation::PushReference { .. }
            | Mutation::RenameReference { .. } => vec![InvalidateScope::References],
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Mutation::CherryPick { commit }
            | Mutation::Revert { commit }
            | Mutation::SoftReset { commit }
            | Mutation::HardReset { commit } => {
                format!("{} {}", self.operation(), crate::model::short_id(commit))
            }
            Mutation::CreateBranch { name, .. } | Mutation::CreateTag { name, .. } => {
                format!("{} {}", self.operation(), name)
            }
            Mutation::DeleteReference { reference } | Mutation::PushReference { reference } => {
                format!("{} {}", self.operation(), reference.name)
            }
            Mutation::RenameReference {
                reference,
                new_name,
            } => format!("rename {} to {}", reference.name, new_name),
        }
    }
}

/// Everything the model needs from a repository. Calls block; the fetch
/// coordinator runs them on the blocking pool.
pub trait RevisionSource: Send + Sync {
    fn fetch_commits(&self, page: &CommitPage) -> Result<Vec<Commit>, FetchError>;
    fn fetch_diff(&self, key: &DiffKey) -> Result<CommitDiff, FetchError>;
    fn fetch_blame(&self, target: &BlameTarget) -> Result<BlameOrigin, FetchError>;
    fn fetch_references(&self) -> Result<RefList, FetchError>;
    fn mutate(&self, mutation: &Mutation) -> Result<(), MutationError>;
    /// Run a user-typed git subcommand; `args` excludes the leading `git`.
    fn run_command(&self, args: &[String]) -> Result<String, FetchError>;
}

/// `RevisionSource` backed by the `git` binary.
pub struct GitSource {
    repo_root: PathBuf,
    remote: String,
}

impl GitSource {
    pub fn new(repo_root: PathBuf, remote: impl Into<String>) -> Self {
        Self {
            repo_root,
            remote: remote.into(),
        }
    }
}

impl RevisionSource for GitSource {
    fn fetch_commits(&self, page: &CommitPage) -> Result<Vec<Commit>, FetchError> {
        git_ops::list_commits(&self.repo_root, &page.filters, page.offset, page.count)
            .map_err(|e| FetchError::new("git log", e))
    }

    fn fetch_diff(&self, key: &DiffKey) -> Result<CommitDiff, FetchError> {
        let text = git_ops::show_commit_diff(&self.repo_root, key)
            .map_err(|e| FetchError::new("git diff", e))?;
        Ok(CommitDiff {
            key: key.clone(),
            files: diff::parse_unified(&text),
        })
    }

    fn fetch_blame(&self, target: &BlameTarget) -> Result<BlameOrigin, FetchError> {
        git_ops::blame_line(&self.repo_root, target).map_err(|e| FetchError::new("git blame", e))
    }

    fn fetch_references(&self) -> Result<RefList, FetchError> {
        let (refs, head) = git_ops::list_references(&self.repo_root)
            .map_err(|e| FetchError::new("git for-each-ref", e))?;
        Ok(RefList { refs, head })
    }

    fn mutate(&self, mutation: &Mutation) -> Result<(), MutationError> {
        let root = &self.repo_root;
        let result = match mutation {
            Mutation::CherryPick { commit } => git_ops::cherry_pick(root, commit),
            Mutation::Revert { commit } => git_ops::revert(root, commit),
            Mutation::SoftReset { commit } => git_ops::reset(root, commit, false),
            Mutation::HardReset { commit } => git_ops::reset(root, commit, true),
            Mutation::CreateBranch { name, commit } => git_ops::create_branch(root, name, commit),
            Mutation::CreateTag { name, commit } => git_ops::create_tag(root, name, commit),
            Mutation::DeleteReference { reference } => match reference.kind {
                RefKind::LocalBranch => git_ops::delete_branch(root, &reference.name),
                RefKind::Tag => git_ops::delete_tag(root, &reference.name),
                RefKind::RemoteBranch => git_ops::delete_remote_branch(root, &reference.name),
            },
            Mutation::PushReference { reference } => match reference.kind {
                RefKind::LocalBranch => git_ops::push_branch(root, &self.remote, &reference.name),
                RefKind::Tag => git_ops::push_tag(root, &self.remote, &reference.name),
                RefKind::RemoteBranch => Err("remote branches cannot be pushed".to_string()),
            },
            Mutation::RenameReference {
                reference,
                new_name,
            } => match reference.kind {
                RefKind::LocalBranch => git_ops::rename_branch(root, &reference.name, new_name),
                RefKind::Tag => git_ops::rename_tag(root, &reference.name, new_name),
                RefKind::RemoteBranch => Err("remote branches cannot be renamed".to_string()),
            },
        };
        result.map_err(|detail| MutationError {
            operation: mutation.operation(),
            detail,
        })
    }

    fn run_command(&self, args: &[String]) -> Result<String, FetchError> {
        git_ops::run_command(&self.repo_root, args)
            .map_err(|e| FetchError::new(format!("git {}", args.first().map_or("", String::as_str)), e))
    }
}

#[cfg(test)]
pub mod fake {
    //! In-memory `RevisionSource` for model, search and app tests.

    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use parking_lot::Mutex;

    use super::*;
    use crate::diff::{ChangeKind, DiffLine, DiffLineKind, FileDiff};

    #[derive(Default)]
    pub struct FakeSource {
        pub commits: Mutex<Vec<Commit>>,
        pub diffs: Mutex<HashMap<String, Vec<FileDiff>>>,
        pub refs: Mutex<RefList>,
        pub blame: Mutex<HashMap<BlameTarget, BlameOrigin>>,
        pub fail_commits: Mutex<bool>,
        pub fail_mutation: Mutex<Option<String>>,
        pub delay: Mutex<Option<Duration>>,
        pub commit_calls: AtomicUsize,
        pub diff_calls: AtomicUsize,
        pub mutations: Mutex<Vec<Mutation>>,
        pub commands: Mutex<Vec<Vec<String>>>,
        pub command_output: Mutex<Option<Result<String, String>>>,
    }

    impl FakeSource {
        pub fn with_commits(commits: Vec<Commit>) -> Self {
            Self {
                commits: Mutex::new(commits),
                ..Default::default()
            }
        }

        pub fn set_diff(&self, commit: &str, files: Vec<FileDiff>) {
            self.diffs.lock().insert(commit.to_string(), files);
        }

        fn pause(&self) {
            if let Some(d) = *self.delay.lock() {
                std::thread::sleep(d);
            }
        }
    }

    pub fn commit(id: &str, parents: &[&str], subject: &str) -> Commit {
        Commit {
            id: id.to_string(),
            parents: parents.iter().map(|p| p.to_string()).collect(),
            author: "Test <test@example.com>".to_string(),
            date: "2024-01-01 12:00".to_string(),
            subject: subject.to_string(),
            body: String::new(),
            changes: None,
        }
    }

    /// A linear history `c<n>` .. `c1`, newest first.
    pub fn linear(n: usize) -> Vec<Commit> {
        (1..=n)
            .rev()
            .map(|i| {
                let id = format!("c{}", i);
                let parent = format!("c{}", i - 1);
                let parents: Vec<&str> = if i > 1 { vec![parent.as_str()] } else { vec![] };
                commit(&id, &parents, &format!("commit {}", i))
            })
            .collect()
    }

    pub fn file(path: &str, lines: &[&str]) -> FileDiff {
        let mut new_line = 1;
        let mut out = Vec::new();
        for l in lines {
            let kind = match l.chars().next() {
                Some('+') => DiffLineKind::Added,
                Some('-') => DiffLineKind::Removed,
                _ => DiffLineKind::Context,
            };
            out.push(DiffLine {
                kind,
                text: l.to_string(),
                old_line: (kind != DiffLineKind::Added).then_some(new_line),
                new_line: (kind != DiffLineKind::Removed).then_some(new_line),
            });
            new_line += 1;
        }
        FileDiff {
            path: path.to_string(),
            old_path: None,
            kind: ChangeKind::Modified,
            lines: out,
        }
    }

    impl RevisionSource for FakeSource {
        fn fetch_commits(&self, page: &CommitPage) -> Result<Vec<Commit>, FetchError> {
            self.commit_calls.fetch_add(1, Ordering::SeqCst);
            self.pause();
            if *self.fail_commits.lock() {
                return Err(FetchError::new("git log", "boom"));
            }
            let commits = self.commits.lock();
            Ok(commits
                .iter()
                .skip(page.offset)
                .take(page.count)
                .cloned()
                .collect())
        }

        fn fetch_diff(&self, key: &DiffKey) -> Result<CommitDiff, FetchError> {
            self.diff_calls.fetch_add(1, Ordering::SeqCst);
            self.pause();
            match self.diffs.lock().get(&key.commit) {
                Some(files) => Ok(CommitDiff {
                    key: key.clone(),
                    files: files.clone(),
                }),
                None => Err(FetchError::new("git diff", format!("unknown commit {}", key.commit))),
            }
        }

        fn fetch_blame(&self, target: &BlameTarget) -> Result<BlameOrigin, FetchError> {
            self.blame
                .lock()
                .get(target)
                .cloned()
                .ok_or_else(|| FetchError::new("git blame", "no such line"))
        }

        fn fetch_references(&self) -> Result<RefList, FetchError> {
            Ok(self.refs.lock().clone())
        }

        fn mutate(&self, mutation: &Mutation) -> Result<(), MutationError> {
            self.mutations.lock().push(mutation.clone());
            match self.fail_mutation.lock().clone() {
                Some(detail) => Err(MutationError {
                    operation: mutation.operation(),
                    detail,
                }),
                None => Ok(()),
            }
        }

        fn run_command(&self, args: &[String]) -> Result<String, FetchError> {
            self.commands.lock().push(args.to_vec());
            self.pause();
            match self.command_output.lock().clone() {
                Some(Ok(text)) => Ok(text),
                Some(Err(detail)) => Err(FetchError::new("git", detail)),
                None => Ok(format!("git {}\n", args.join(" "))),
            }
        }
    }

    pub fn calls(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}
