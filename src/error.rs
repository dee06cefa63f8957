//! Error types for shellcache
//!
//! All modules use `ShellcacheResult<T>` as their return type.

use crate::worker::WorkerState;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for shellcache operations
pub type ShellcacheResult<T> = Result<T, ShellcacheError>;

/// All errors that can occur in shellcache
#[derive(Error, Debug)]
pub enum ShellcacheError {
    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Invalid bucket name '{0}': use letters, digits, '.', '_' or '-'")]
    InvalidBucketName(String),

    // Lifecycle errors
    #[error("Invalid worker transition: {from} -> {to}")]
    InvalidTransition { from: WorkerState, to: WorkerState },

    #[error("Worker is not active (state: {0})")]
    NotActive(WorkerState),

    #[error("No {0} generation found")]
    NoGeneration(&'static str),

    // Install errors
    #[error("Duplicate asset in application shell: {0}")]
    DuplicateAsset(String),

    #[error("Asset {url} returned HTTP {status}")]
    AssetStatus { url: String, status: u16 },

    #[error("Caching failed for bucket {bucket}: {source}")]
    InstallFailed {
        bucket: String,
        #[source]
        source: Box<ShellcacheError>,
    },

    // Network errors
    #[error("Network request to {url} failed: {reason}")]
    Network { url: String, reason: String },

    #[error("Unsupported request method: {0}")]
    UnsupportedMethod(String),

    // Storage errors
    #[error("Cache bucket not found: {0}")]
    BucketNotFound(String),

    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ShellcacheError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a network error for a request URL
    pub fn network(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::Network {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether this error came from the network layer
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network { .. })
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::InstallFailed { .. } => {
                Some("Check that every entry in [worker].assets is reachable from [worker].origin")
            }
            Self::NoGeneration("waiting") => Some("Run: shellcache install"),
            Self::NoGeneration(_) | Self::NotActive(_) => Some("Run: shellcache update"),
            Self::InvalidBucketName(_) => Some("Example: bucket_name = \"speechsync-cache-v2\""),
            _ => None,
        }
    }
}
