//! Error taxonomy for sync operations.
//!
//! Every failure surfaced by the library is a [`SyncError`]. Callers that only
//! care about the broad category (retry or not, abort or recover) match on
//! [`SyncError::kind`].

use std::fmt;
use std::io;
use std::path::PathBuf;

use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};

pub type Result<T, E = SyncError> = std::result::Result<T, E>;

/// Broad error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Local path missing, unreadable, or of the wrong type.
    Path,
    /// Connectivity, timeout or rate limiting; retries already exhausted.
    TransientNetwork,
    /// Credentials were rejected.
    Auth,
    /// Remote bucket or object does not exist.
    NotFound,
    /// Permanent store rejection that is not an auth failure.
    Remote,
    /// Invalid configuration or credentials file.
    Config,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Path => "path error",
            ErrorKind::TransientNetwork => "transient network error",
            ErrorKind::Auth => "auth error",
            ErrorKind::NotFound => "not found",
            ErrorKind::Remote => "remote error",
            ErrorKind::Config => "config error",
        };
        f.write_str(name)
    }
}

/// Which per-key transfer failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferAction {
    Upload,
    Download,
    Delete,
}

impl fmt::Display for TransferAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferAction::Upload => f.write_str("upload"),
            TransferAction::Download => f.write_str("download"),
            TransferAction::Delete => f.write_str("delete"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("{operation} failed for {}: {source}", .path.display())]
    Path {
        path: PathBuf,
        operation: String,
        #[source]
        source: io::Error,
    },

    #[error("not a directory: {}", .path.display())]
    NotADirectory { path: PathBuf },

    #[error("invalid path key {key:?}: {reason}")]
    InvalidKey { key: String, reason: &'static str },

    #[error("{operation} failed after retries: {message}")]
    TransientNetwork { operation: String, message: String },

    #[error("{operation} rejected credentials: {message}")]
    Auth { operation: String, message: String },

    #[error("{operation}: not found: {message}")]
    NotFound { operation: String, message: String },

    #[error("{operation} failed: {message}")]
    Remote { operation: String, message: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("{action} of {key} aborted: {source}")]
    Transfer {
        key: String,
        action: TransferAction,
        #[source]
        source: Box<SyncError>,
    },
}

impl SyncError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::Path { .. } | SyncError::NotADirectory { .. } | SyncError::InvalidKey { .. } => {
                ErrorKind::Path
            }
            SyncError::TransientNetwork { .. } => ErrorKind::TransientNetwork,
            SyncError::Auth { .. } => ErrorKind::Auth,
            SyncError::NotFound { .. } => ErrorKind::NotFound,
            SyncError::Remote { .. } => ErrorKind::Remote,
            SyncError::Config(_) => ErrorKind::Config,
            SyncError::Transfer { source, .. } => source.kind(),
        }
    }

    /// Key of the per-key transfer that aborted the operation, if any.
    pub fn failed_key(&self) -> Option<&str> {
        match self {
            SyncError::Transfer { key, .. } => Some(key),
            _ => None,
        }
    }

    pub fn path(path: impl Into<PathBuf>, operation: &str, source: io::Error) -> Self {
        SyncError::Path {
            path: path.into(),
            operation: operation.to_string(),
            source,
        }
    }

    pub fn transfer(key: impl Into<String>, action: TransferAction, source: SyncError) -> Self {
        SyncError::Transfer {
            key: key.into(),
            action,
            source: Box::new(source),
        }
    }

    /// Classify an object-store error. The retry layer has already run by the
    /// time an error reaches here, so a temporary error is final.
    ///
    /// The retry layer marks every error it hands back as persistent. An
    /// unexpected error in that state is counted as exhausted retries.
    pub fn from_opendal(err: opendal::Error, operation: &str) -> Self {
        let operation = operation.to_string();
        let message = err.to_string();
        match err.kind() {
            opendal::ErrorKind::PermissionDenied => SyncError::Auth { operation, message },
            opendal::ErrorKind::NotFound => SyncError::NotFound { operation, message },
            opendal::ErrorKind::ConfigInvalid => SyncError::Config(format!("{operation}: {message}")),
            opendal::ErrorKind::RateLimited => SyncError::TransientNetwork { operation, message },
            opendal::ErrorKind::Unexpected if err.is_persistent() => {
                SyncError::TransientNetwork { operation, message }
            }
            _ if err.is_temporary() => SyncError::TransientNetwork { operation, message },
            _ => SyncError::Remote { operation, message },
        }
    }

    /// Classify a bucket-admin SDK error by transport outcome and HTTP status.
    pub fn from_sdk<E>(err: SdkError<E, HttpResponse>, operation: &str) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        let operation = operation.to_string();
        let status = err.raw_response().map(|r| r.status().as_u16());
        let message = DisplayErrorContext(&err).to_string();
        match &err {
            SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
                SyncError::TransientNetwork { operation, message }
            }
            SdkError::ConstructionFailure(_) => SyncError::Config(format!("{operation}: {message}")),
            _ => match status {
                Some(401) | Some(403) => SyncError::Auth { operation, message },
                Some(404) => SyncError::NotFound { operation, message },
                Some(429) => SyncError::TransientNetwork { operation, message },
                Some(code) if code >= 500 => SyncError::TransientNetwork { operation, message },
                _ => SyncError::Remote { operation, message },
            },
        }
    }
}
