//! Background fetches with supersede and cancellation support.
//!
//! Every request runs the blocking `RevisionSource` call on
//! `tokio::task::spawn_blocking` and reports back over an mpsc channel that the
//! main loop polls. At most one request per `FetchKey` is in flight; a newer
//! submit for the same key cancels the older one, and results whose handle is
//! no longer in the in-flight table are dropped on arrival.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::diff::{BlameOrigin, BlameTarget, CommitDiff, DiffKey};
use crate::error::{FetchError, MutationError};
use crate::model::{Commit, short_id};
use crate::source::{CommitPage, Mutation, RefList, RevisionSource};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FetchHandle(u64);

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum FetchKey {
    Commits,
    Diff(DiffKey),
    References,
    Blame,
    Mutation,
    Command,
}

impl FetchKey {
    /// Requests that may change the repository; never cancelled in bulk.
    fn writes(&self) -> bool {
        matches!(self, FetchKey::Mutation | FetchKey::Command)
    }
}

#[derive(Clone, Debug)]
pub enum FetchRequest {
    Commits(CommitPage),
    Diff(DiffKey),
    References,
    Blame(BlameTarget),
    Mutation(Mutation),
    /// A git subcommand typed by the user, without the leading `git`.
    Command(Vec<String>),
}

impl FetchRequest {
    pub fn key(&self) -> FetchKey {
        match self {
            FetchRequest::Commits(_) => FetchKey::Commits,
            FetchRequest::Diff(key) => FetchKey::Diff(key.clone()),
            FetchRequest::References => FetchKey::References,
            FetchRequest::Blame(_) => FetchKey::Blame,
            FetchRequest::Mutation(_) => FetchKey::Mutation,
            FetchRequest::Command(_) => FetchKey::Command,
        }
    }

    pub fn label(&self) -> String {
        match self {
            FetchRequest::Commits(page) => format!("loading commits from {}", page.offset),
            FetchRequest::Diff(key) => format!("loading diff {}", short_id(&key.commit)),
            FetchRequest::References => "loading references".to_string(),
            FetchRequest::Blame(target) => format!("tracing {}:{}", target.path, target.line),
            FetchRequest::Mutation(m) => m.describe(),
            FetchRequest::Command(args) => format!("git {}", args.join(" ")),
        }
    }

    fn run(self, source: &dyn RevisionSource) -> FetchOutput {
        match self {
            FetchRequest::Commits(page) => {
                let result = source.fetch_commits(&page);
                FetchOutput::Commits { page, result }
            }
            FetchRequest::Diff(key) => {
                let result = source.fetch_diff(&key);
                FetchOutput::Diff { key, result }
            }
            FetchRequest::References => FetchOutput::References(source.fetch_references()),
            FetchRequest::Blame(target) => {
                let result = source.fetch_blame(&target);
                FetchOutput::Blame { target, result }
            }
            FetchRequest::Mutation(mutation) => {
                let result = source.mutate(&mutation);
                FetchOutput::Mutation { mutation, result }
            }
            FetchRequest::Command(args) => {
                let result = source.run_command(&args);
                FetchOutput::Command { args, result }
            }
        }
    }

    fn failed(self, detail: String) -> FetchOutput {
        let err = |what: &str| FetchError::new(what, detail.clone());
        match self {
            FetchRequest::Commits(page) => FetchOutput::Commits {
                page,
                result: Err(err("git log")),
            },
            FetchRequest::Diff(key) => FetchOutput::Diff {
                key,
                result: Err(err("git diff")),
            },
            FetchRequest::References => FetchOutput::References(Err(err("git for-each-ref"))),
            FetchRequest::Blame(target) => FetchOutput::Blame {
                target,
                result: Err(err("git blame")),
            },
            FetchRequest::Mutation(mutation) => FetchOutput::Mutation {
                result: Err(MutationError {
                    operation: mutation.operation(),
                    detail: detail.clone(),
                }),
                mutation,
            },
            FetchRequest::Command(args) => FetchOutput::Command {
                result: Err(err("git")),
                args,
            },
        }
    }
}

#[derive(Debug)]
pub enum FetchOutput {
    Commits {
        page: CommitPage,
        result: Result<Vec<Commit>, FetchError>,
    },
    Diff {
        key: DiffKey,
        result: Result<CommitDiff, FetchError>,
    },
    References(Result<RefList, FetchError>),
    Blame {
        target: BlameTarget,
        result: Result<BlameOrigin, FetchError>,
    },
    Mutation {
        mutation: Mutation,
        result: Result<(), MutationError>,
    },
    Command {
        args: Vec<String>,
        result: Result<String, FetchError>,
    },
}

impl FetchOutput {
    pub fn key(&self) -> FetchKey {
        match self {
            FetchOutput::Commits { .. } => FetchKey::Commits,
            FetchOutput::Diff { key, .. } => FetchKey::Diff(key.clone()),
            FetchOutput::References(_) => FetchKey::References,
            FetchOutput::Blame { .. } => FetchKey::Blame,
            FetchOutput::Mutation { .. } => FetchKey::Mutation,
            FetchOutput::Command { .. } => FetchKey::Command,
        }
    }
}

#[derive(Debug)]
pub struct Completion {
    pub handle: FetchHandle,
    pub output: FetchOutput,
}

struct InFlight {
    handle: FetchHandle,
    cancel: CancellationToken,
    started: Instant,
    label: String,
}

/// A request still running, for the progress display.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingFetch {
    pub handle: FetchHandle,
    pub label: String,
    pub elapsed: Duration,
}

pub struct Fetcher {
    source: Arc<dyn RevisionSource>,
    next_id: u64,
    in_flight: HashMap<FetchKey, InFlight>,
    tx: mpsc::Sender<Completion>,
    rx: mpsc::Receiver<Completion>,
}

impl Fetcher {
    /// Must be called from within a tokio runtime.
    pub fn new(source: Arc<dyn RevisionSource>) -> Self {
        let (tx, rx) = mpsc::channel::<Completion>(64);
        Self {
            source,
            next_id: 0,
            in_flight: HashMap::new(),
            tx,
            rx,
        }
    }

    /// Start `request` in the background, cancelling any older request for the same key.
    pub fn submit(&mut self, request: FetchRequest) -> FetchHandle {
        self.next_id += 1;
        let handle = FetchHandle(self.next_id);
        let key = request.key();
        let label = request.label();

        if let Some(old) = self.in_flight.remove(&key) {
            tracing::debug!("superseding {} ({:?})", old.label, old.handle);
            old.cancel.cancel();
        }

        let cancel = CancellationToken::new();
        self.in_flight.insert(
            key,
            InFlight {
                handle,
                cancel: cancel.clone(),
                started: Instant::now(),
                label: label.clone(),
            },
        );
        tracing::debug!("submit {} ({:?})", label, handle);

        let source = Arc::clone(&self.source);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            if cancel.is_cancelled() {
                return;
            }

            let retry = request.clone();
            let result = tokio::task::spawn_blocking(move || request.run(source.as_ref())).await;

            if cancel.is_cancelled() {
                tracing::debug!("dropping cancelled result ({:?})", handle);
                return;
            }

            let output = match result {
                Ok(output) => output,
                Err(e) => retry.failed(format!("Task join error: {}", e)),
            };
            let _ = tx.send(Completion { handle, output }).await;
        });

        handle
    }

    pub fn in_flight(&self, key: &FetchKey) -> Option<FetchHandle> {
        self.in_flight.get(key).map(|f| f.handle)
    }

    pub fn is_busy(&self, key: &FetchKey) -> bool {
        self.in_flight.contains_key(key)
    }

    pub fn cancel(&mut self, handle: FetchHandle) -> bool {
        let key = self
            .in_flight
            .iter()
            .find(|(_, f)| f.handle == handle)
            .map(|(k, _)| k.clone());
        match key {
            Some(k) => self.cancel_key(&k),
            None => false,
        }
    }

    pub fn cancel_key(&mut self, key: &FetchKey) -> bool {
        match self.in_flight.remove(key) {
            Some(f) => {
                tracing::debug!("cancel {} ({:?})", f.label, f.handle);
                f.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel everything except a running mutation or command, which cannot be
    /// undone halfway.
    pub fn cancel_all(&mut self) -> usize {
        let keys: Vec<FetchKey> = self
            .in_flight
            .keys()
            .filter(|k| !k.writes())
            .cloned()
            .collect();
        keys.iter().filter(|k| self.cancel_key(k)).count()
    }

    /// Cancel every diff fetch for `commit`, whatever its diff options.
    pub fn cancel_diffs_of(&mut self, commit: &str) {
        let keys: Vec<FetchKey> = self
            .in_flight
            .keys()
            .filter(|k| matches!(k, FetchKey::Diff(d) if d.commit == commit))
            .cloned()
            .collect();
        for k in keys {
            self.cancel_key(&k);
        }
    }

    pub fn pending(&self) -> Vec<PendingFetch> {
        let mut out: Vec<PendingFetch> = self
            .in_flight
            .values()
            .map(|f| PendingFetch {
                handle: f.handle,
                label: f.label.clone(),
                elapsed: f.started.elapsed(),
            })
            .collect();
        out.sort_by_key(|p| p.handle);
        out
    }

    pub async fn recv(&mut self) -> Option<Completion> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Completion> {
        self.rx.try_recv().ok()
    }

    /// Accept a completion if it is still the live request for its key.
    pub fn accept(&mut self, completion: Completion) -> Option<FetchOutput> {
        let key = completion.output.key();
        match self.in_flight.get(&key) {
            Some(f) if f.handle == completion.handle => {
                self.in_flight.remove(&key);
                Some(completion.output)
            }
            _ => {
                tracing::debug!("dropping stale result ({:?})", completion.handle);
                None
            }
        }
    }
}
