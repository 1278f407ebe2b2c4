//! Error types for depcache
//!
//! All modules use `DepCacheResult<T>` as their return type.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for depcache operations
pub type DepCacheResult<T> = Result<T, DepCacheError>;

/// All errors that can occur in depcache
#[derive(Error, Debug)]
pub enum DepCacheError {
    // Configuration errors
    #[error("Configuration file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("{0} is not set")]
    MissingSetting(&'static str),

    #[error("Invalid download policy {value:?}, expected \"default\" or \"skip_not_empty\"")]
    InvalidDownloadPolicy { value: String },

    #[error("No cache entries configured")]
    NoCacheEntries,

    #[error("No AWS credentials available: {0}")]
    CredentialsUnavailable(String),

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read manifest {path}")]
    ManifestRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Archive errors
    #[error("Archive error at {path}: {reason}")]
    Archive { path: PathBuf, reason: String },

    // Object store errors
    #[error("Store {operation} failed for {key}: {message}")]
    Store {
        operation: &'static str,
        key: String,
        message: String,
    },

    #[error("Store {operation} for {key} timed out after {}s", timeout.as_secs())]
    StoreTimeout {
        operation: &'static str,
        key: String,
        timeout: Duration,
    },

    // Run outcome
    #[error("{failed} of {total} cache entries failed")]
    EntriesFailed { failed: usize, total: usize },

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse error category, used when reporting per-entry failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Config,
    Io,
    Archive,
    Store,
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Config => "config",
            Self::Io => "io",
            Self::Archive => "archive",
            Self::Store => "store",
            Self::Internal => "internal",
        };
        write!(f, "{}", name)
    }
}

impl DepCacheError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create an archive error
    pub fn archive(path: impl Into<PathBuf>, reason: impl fmt::Display) -> Self {
        Self::Archive {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Create an object store error
    pub fn store(operation: &'static str, key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Store {
            operation,
            key: key.into(),
            message: message.into(),
        }
    }

    /// Which bucket of the error taxonomy this error belongs to
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ConfigNotFound(_)
            | Self::ConfigInvalid { .. }
            | Self::MissingSetting(_)
            | Self::InvalidDownloadPolicy { .. }
            | Self::NoCacheEntries
            | Self::CredentialsUnavailable(_) => ErrorCategory::Config,
            Self::Io { .. } | Self::ManifestRead { .. } => ErrorCategory::Io,
            Self::Archive { .. } => ErrorCategory::Archive,
            Self::Store { .. } | Self::StoreTimeout { .. } => ErrorCategory::Store,
            Self::EntriesFailed { .. } | Self::Internal(_) => ErrorCategory::Internal,
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store { .. } | Self::StoreTimeout { .. })
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::ConfigNotFound(_) => Some("Pass --config <PATH> or create ./depcache.json"),
            Self::MissingSetting("s3.bucket") => Some("Set \"bucket\" in the \"s3\" section"),
            Self::MissingSetting("s3.region") => Some("Set \"region\" in the \"s3\" section"),
            Self::MissingSetting("s3.key") | Self::MissingSetting("s3.secret") => Some(
                "Set both \"key\" and \"secret\", or neither to use ambient AWS credentials",
            ),
            Self::NoCacheEntries => Some("Add at least one entry to the \"cache\" array"),
            Self::CredentialsUnavailable(_) => Some(
                "Set \"key\" and \"secret\" in the \"s3\" section, or provide AWS credentials via environment, profile or instance metadata",
            ),
            Self::StoreTimeout { .. } => Some("Raise --timeout or check connectivity to the store"),
            _ => None,
        }
    }
}

impl From<tokio::task::JoinError> for DepCacheError {
    fn from(err: tokio::task::JoinError) -> Self {
        if err.is_panic() {
            Self::Internal("cache task panicked".to_string())
        } else {
            Self::Internal(format!("cache task did not complete: {}", err))
        }
    }
}
