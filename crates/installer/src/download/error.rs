//! Error types for a single artifact transfer with context and recovery information

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while verifying or transferring one artifact.
///
/// Every variant carries enough context (url, path, operation) to be logged
/// on its own, because a transfer error usually surfaces far away from the
/// candidate that produced it.
#[derive(Error, Debug)]
pub enum DownloadError {
    /// HTTP-level failure (connect, TLS, body stream)
    #[error("HTTP request to '{url}' failed")]
    HttpRequest {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Server answered, but not with a 2xx
    #[error("HTTP request to '{url}' returned status {status}")]
    HttpStatus { url: String, status: u16 },

    /// One candidate attempt exceeded its timeout
    #[error("Request to '{url}' timed out after {duration_secs}s")]
    NetworkTimeout { url: String, duration_secs: u64 },

    /// File system I/O errors with file context
    #[error("File operation failed while {operation} '{path}'")]
    FileSystem {
        path: PathBuf,
        operation: FileOperation,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid URL '{url}'")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Unsupported URL scheme '{scheme}' in '{url}' (supported: http, https, file)")]
    UnsupportedUrl { url: String, scheme: String },

    /// A download spec reached the transfer engine without a single candidate
    #[error("No candidate URL to download '{destination}'")]
    NoCandidates { destination: PathBuf },

    #[error("Unsupported checksum algorithm '{algorithm}' (supported: sha1, sha256, md5)")]
    UnsupportedAlgorithm { algorithm: String },

    /// Hash computation thread failed or panicked
    #[error("Checksum computation failed for '{file}': {reason}")]
    HashTask { file: PathBuf, reason: String },

    /// Transfer torn down by a cancellation request
    #[error("Download cancelled{}", url.as_ref().map(|u| format!(": {}", u)).unwrap_or_default())]
    Cancelled { url: Option<String> },
}

/// Types of file operations for error context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOperation {
    Read,
    Write,
    Create,
    Delete,
    Move,
    Metadata,
    CreateDir,
}

impl std::fmt::Display for FileOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileOperation::Read => write!(f, "reading"),
            FileOperation::Write => write!(f, "writing"),
            FileOperation::Create => write!(f, "creating"),
            FileOperation::Delete => write!(f, "deleting"),
            FileOperation::Move => write!(f, "moving"),
            FileOperation::Metadata => write!(f, "reading metadata of"),
            FileOperation::CreateDir => write!(f, "creating directory"),
        }
    }
}

pub type Result<T> = std::result::Result<T, DownloadError>;

impl DownloadError {
    /// Build a file system error for `path`
    pub fn fs(path: impl Into<PathBuf>, operation: FileOperation, source: std::io::Error) -> Self {
        DownloadError::FileSystem {
            path: path.into(),
            operation,
            source,
        }
    }

    /// Check if error is recoverable (worth retrying the same candidate)
    pub fn is_recoverable(&self) -> bool {
        match self {
            DownloadError::HttpRequest { source, .. } => {
                // Only retry on network-related HTTP errors, not client errors (4xx)
                source
                    .status()
                    .map_or(true, |status| status.is_server_error() || status.as_u16() == 429)
            }
            DownloadError::HttpStatus { status, .. } => *status >= 500 || *status == 429,
            DownloadError::NetworkTimeout { .. } => true,
            DownloadError::FileSystem { source, .. } => matches!(
                source.kind(),
                std::io::ErrorKind::Interrupted
                    | std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::WouldBlock
            ),
            DownloadError::InvalidUrl { .. } => false,
            DownloadError::UnsupportedUrl { .. } => false,
            DownloadError::NoCandidates { .. } => false,
            DownloadError::UnsupportedAlgorithm { .. } => false,
            DownloadError::HashTask { .. } => false,
            DownloadError::Cancelled { .. } => false,
        }
    }

    /// Get error category for metrics and logging
    pub fn category(&self) -> &'static str {
        match self {
            DownloadError::HttpRequest { .. } => "http_request",
            DownloadError::HttpStatus { .. } => "http_status",
            DownloadError::NetworkTimeout { .. } => "network_timeout",
            DownloadError::FileSystem { .. } => "file_system",
            DownloadError::InvalidUrl { .. } => "invalid_url",
            DownloadError::UnsupportedUrl { .. } => "unsupported_url",
            DownloadError::NoCandidates { .. } => "no_candidates",
            DownloadError::UnsupportedAlgorithm { .. } => "unsupported_algorithm",
            DownloadError::HashTask { .. } => "hash_task",
            DownloadError::Cancelled { .. } => "cancelled",
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, DownloadError::Cancelled { .. })
    }
}
