//! Installation error types

use std::path::PathBuf;
use thiserror::Error;

use crate::download::{DownloadError, FileOperation};

/// Errors that can occur while installing a version.
///
/// Every task in the tree returns this type, so a parent can propagate a
/// child's failure with `?` or catch it and keep going.
#[derive(Debug, Error)]
pub enum InstallError {
    /// Malformed input (unreadable index, bad configuration). Never retried.
    #[error("Invalid input: {message}")]
    Validation {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Every candidate of one artifact failed
    #[error("Transfer failed: {0}")]
    Transfer(#[source] DownloadError),

    /// The file was re-downloaded and still does not match
    #[error("Checksum mismatch for {path:?}: expected {algorithm} {expected}, got {actual}")]
    ChecksumMismatch {
        path: PathBuf,
        algorithm: String,
        expected: String,
        actual: String,
    },

    #[error("Task '{task}' was cancelled")]
    Cancelled { task: String },

    /// Collected failures of a best-effort batch
    #[error(transparent)]
    Aggregate(#[from] AggregateError),

    #[error("IO error while {operation} {path:?}: {source}")]
    Io {
        path: PathBuf,
        operation: FileOperation,
        source: std::io::Error,
    },

    #[error("Task '{task}' panicked: {reason}")]
    TaskPanicked { task: String, reason: String },
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, InstallError>;

impl InstallError {
    pub fn validation(message: impl Into<String>) -> Self {
        InstallError::Validation {
            message: message.into(),
            source: None,
        }
    }

    pub fn io(path: impl Into<PathBuf>, operation: FileOperation, source: std::io::Error) -> Self {
        InstallError::Io {
            path: path.into(),
            operation,
            source,
        }
    }

    /// Attribute a cancellation that does not name its task yet to `path`
    pub(crate) fn within_task(self, path: &str) -> Self {
        match self {
            InstallError::Cancelled { task } if task.is_empty() => InstallError::Cancelled {
                task: path.to_string(),
            },
            other => other,
        }
    }

    /// True for cancellation, which callers must not treat as a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, InstallError::Cancelled { .. })
    }
}

impl From<DownloadError> for InstallError {
    fn from(error: DownloadError) -> Self {
        match error {
            // The enclosing task fills in its path, see `within_task`
            DownloadError::Cancelled { .. } => InstallError::Cancelled {
                task: String::new(),
            },
            other => InstallError::Transfer(other),
        }
    }
}

/// A list of per-item errors surfaced by a best-effort batch.
///
/// The batch attempted every item; these are the ones that failed. Whether a
/// partially complete install is usable is the caller's call.
#[derive(Debug, Error)]
#[error("{} item(s) failed; first error: {}", errors.len(), first_message(errors))]
pub struct AggregateError {
    pub errors: Vec<InstallError>,
}

fn first_message(errors: &[InstallError]) -> String {
    errors
        .first()
        .map(|e| e.to_string())
        .unwrap_or_else(|| "none".to_string())
}

impl AggregateError {
    pub fn new(errors: Vec<InstallError>) -> Self {
        Self { errors }
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &InstallError> {
        self.errors.iter()
    }
}
