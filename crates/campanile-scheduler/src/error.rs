//! Error types for the scheduler.

use thiserror::Error;

use crate::types::WebId;

/// Errors that can occur in scheduler operations.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The alarm store is full.
    #[error("alarm capacity exceeded (max {capacity})")]
    CapacityExceeded { capacity: usize },

    /// No live alarm carries this web id.
    #[error("alarm not found: {0}")]
    NotFound(WebId),

    /// The web id resolves to an alarm that is not customizable.
    #[error("alarm is not customizable: {0}")]
    NotCustomizable(WebId),

    /// A modification was attempted without a callback.
    #[error("no callback supplied for alarm {0}")]
    MissingCallback(WebId),

    /// A field failed validation.
    #[error("invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    /// The persisted document could not be parsed.
    #[error("document corrupt: {0}")]
    DocumentCorrupt(String),

    /// Document store error.
    #[error("document store error: {0}")]
    Store(#[from] StoreError),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An alarm action failed while being dispatched.
    #[error("action for alarm at index {index} failed: {source}")]
    Action {
        index: usize,
        #[source]
        source: ActionError,
    },
}

/// Errors from a [`DocumentStore`](crate::DocumentStore).
#[derive(Debug, Error)]
pub enum StoreError {
    /// The document does not exist.
    #[error("document not found: {0}")]
    NotFound(String),

    /// IO error while reading or writing.
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Failure reported by an alarm callback.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct ActionError(pub String);

impl ActionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}
