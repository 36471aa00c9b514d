//! Error taxonomy shared by the model, the search engine and the app.

use thiserror::Error;

/// A revision-source call that failed or timed out.
///
/// Stored on the affected model entry and shown inline; never retried
/// without an explicit user action.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{what} failed: {detail}")]
pub struct FetchError {
    pub what: String,
    pub detail: String,
}

impl FetchError {
    pub fn new(what: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            what: what.into(),
            detail: detail.into(),
        }
    }
}

/// Rejected search query. Reported synchronously, never creates a cursor.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("empty search pattern")]
    EmptyPattern,
    #[error("invalid regex: {0}")]
    InvalidRegex(String),
}

/// A history mutation the revision source refused (conflict, bad name, ...).
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{operation} failed: {detail}")]
pub struct MutationError {
    pub operation: &'static str,
    pub detail: String,
}
