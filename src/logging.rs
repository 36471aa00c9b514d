//! Tracing setup.
//!
//! Events go to an in-memory ring buffer that the debug-log view renders and,
//! when `HISTVIEW_LOG_FILE` is set, to that file as well. `RUST_LOG` filters
//! both; without it everything from this crate at DEBUG and up is kept.

use std::collections::VecDeque;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use tracing::Level;
use tracing_subscriber::layer::Context;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer, fmt};

pub const LOG_FILE_ENV: &str = "HISTVIEW_LOG_FILE";
const DEFAULT_FILTER: &str = "histview=debug";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DebugEntry {
    pub time: String,
    pub level: Level,
    pub target: String,
    pub message: String,
}

/// Shared handle to the captured log lines. Oldest lines drop first.
#[derive(Clone)]
pub struct DebugLog {
    entries: Arc<Mutex<VecDeque<DebugEntry>>>,
    capacity: Arc<AtomicUsize>,
}

impl DebugLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(VecDeque::new())),
            capacity: Arc::new(AtomicUsize::new(capacity.max(1))),
        }
    }

    /// Resize the ring once settings are known; every handle sees it.
    pub fn set_capacity(&self, capacity: usize) {
        let capacity = capacity.max(1);
        self.capacity.store(capacity, Ordering::Relaxed);
        let mut entries = self.entries.lock();
        while entries.len() > capacity {
            entries.pop_front();
        }
    }

    fn push(&self, entry: DebugEntry) {
        let capacity = self.capacity.load(Ordering::Relaxed);
        let mut entries = self.entries.lock();
        while entries.len() >= capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Copy of the lines in `start..start + count`.
    pub fn slice(&self, start: usize, count: usize) -> Vec<DebugEntry> {
        self.entries.lock().iter().skip(start).take(count).cloned().collect()
    }

    pub fn get(&self, idx: usize) -> Option<DebugEntry> {
        self.entries.lock().get(idx).cloned()
    }
}

pub struct DebugLogLayer {
    log: DebugLog,
}

impl DebugLogLayer {
    pub fn new(log: DebugLog) -> Self {
        Self { log }
    }
}

impl<S> Layer<S> for DebugLogLayer
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = StringVisitor::default();
        event.record(&mut visitor);
        let meta = event.metadata();
        self.log.push(DebugEntry {
            time: chrono::Local::now().format("%H:%M:%S%.3f").to_string(),
            level: *meta.level(),
            target: meta.target().to_string(),
            message: visitor.0,
        });
    }
}

#[derive(Default)]
struct StringVisitor(String);

impl StringVisitor {
    fn append(&mut self, name: &str, value: String) {
        if name == "message" {
            if self.0.is_empty() {
                self.0 = value;
            } else {
                self.0 = format!("{} {}", value, self.0);
            }
        } else {
            if !self.0.is_empty() {
                self.0.push(' ');
            }
            self.0.push_str(&format!("{}={}", name, value));
        }
    }
}

impl tracing::field::Visit for StringVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.append(field.name(), format!("{:?}", value));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.append(field.name(), value.to_string());
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

pub fn build_subscriber(
    log: DebugLog,
    log_file: Option<File>,
) -> impl tracing::Subscriber + Send + Sync {
    let file_layer = log_file.map(|f| fmt::layer().with_ansi(false).with_writer(Arc::new(f)));

    tracing_subscriber::registry()
        .with(file_layer)
        .with(DebugLogLayer::new(log))
        .with(env_filter())
}

/// Install the global subscriber and return the debug-log buffer.
pub fn init(capacity: usize, log_file: Option<&Path>) -> DebugLog {
    let log = DebugLog::new(capacity);
    let file = log_file.and_then(|p| match File::create(p) {
        Ok(f) => Some(f),
        Err(e) => {
            eprintln!("histview: cannot open log file {}: {}", p.display(), e);
            None
        }
    });
    // A second init (tests) keeps the first subscriber.
    let _ = build_subscriber(log.clone(), file).try_init();
    log
}
