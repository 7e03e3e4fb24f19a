use std::path::{Path, PathBuf};

use common::ValidationError;

/// Errors that stop an operation. Per-target fetch and archive failures are
/// not among them: those end up in result rows and run warnings.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("invalid keyword pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("failed to format timestamp: {0}")]
    Time(#[from] time::error::Format),

    #[error("HTTP client setup failed: {0}")]
    Client(#[from] reqwest::Error),

    #[error("no target {company} / {role}")]
    TargetNotFound { company: String, role: String },

    #[error("history row {0} does not exist")]
    RowNotFound(usize),

    #[error("no reference manager configured")]
    NoReferenceManager,

    #[error("registry sync aborted: {0}")]
    Sync(#[source] ExternalError),
}

impl MonitorError {
    pub(crate) fn io(path: &Path) -> impl FnOnce(std::io::Error) -> MonitorError + '_ {
        move |source| MonitorError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn csv(path: &Path) -> impl FnOnce(csv::Error) -> MonitorError + '_ {
        move |source| MonitorError::Csv {
            path: path.to_path_buf(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, MonitorError>;

/// Why a page could not be fetched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("transport error: {0}")]
    Transport(String),
}

/// Failures of the screenshot service or the reference manager.
#[derive(Debug, thiserror::Error)]
pub enum ExternalError {
    #[error("{service} request failed: {message}")]
    Request {
        service: &'static str,
        message: String,
    },

    #[error("{service} returned HTTP {status}")]
    Status { service: &'static str, status: u16 },

    #[error("{service} returned an unexpected response: {message}")]
    Response {
        service: &'static str,
        message: String,
    },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
