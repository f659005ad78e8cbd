//! Error types for the extractor, transfer, worker and workflow seams.
//!
//! Everything here derives `Display`/`Error` through `thiserror`. The binary
//! layer (config loading, input reading) stays on `anyhow`.

use thiserror::Error;

use crate::workflow::WorkflowState;

/// Rejections from [`Workflow::start`](crate::workflow::Workflow::start).
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// The raw text was empty; the run never left `Idle`.
    #[error("input text must not be empty")]
    EmptyInput,

    /// A workflow runs once. Build a new one for the next run.
    #[error("workflow already started (state: {0})")]
    AlreadyStarted(WorkflowState),

    #[error("background worker is not running")]
    WorkerUnavailable,
}

/// Failures while copying a remote resource to disk.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("invalid source URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("source URL has no file name: {0}")]
    NoFileName(String),

    /// Connection failures and non-success status codes.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures building a [`FieldPattern`](crate::extractor::FieldPattern).
///
/// Extraction itself never fails; only custom patterns can be rejected.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("invalid pattern for field {field}: {source}")]
    InvalidPattern {
        field: String,
        #[source]
        source: regex::Error,
    },

    #[error("pattern for field {0} has no capture group")]
    MissingCaptureGroup(String),
}

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("worker has shut down")]
    Closed,
}
