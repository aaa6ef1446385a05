//! Error types for hoard

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for hoard operations
pub type Result<T> = std::result::Result<T, HoardError>;

/// Main error type for hoard
#[derive(Error, Debug)]
pub enum HoardError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// The plugin variant does not implement the requested operation.
    #[error("Plugin '{plugin}' does not support {operation}")]
    Unsupported {
        plugin: String,
        operation: &'static str,
    },

    /// Upstream unreachable or returned data that could not be parsed.
    #[error("Fetch failed for '{plugin}': {message}")]
    Fetch { plugin: String, message: String },

    /// One or more artifacts of a file import could not be transferred.
    ///
    /// Artifacts that did transfer keep their presence flag set.
    #[error("Import of file {file_id} failed: {}", format_failures(.failures))]
    Import {
        file_id: i64,
        failures: Vec<ImportFailure>,
    },

    #[error("File has no assigned id; flush it to the store before importing")]
    UnassignedId,

    #[error("Storage layout mismatch: archive uses slot size {stored}, configuration has {configured}")]
    LayoutMismatch { stored: i64, configured: i64 },

    #[error("Invalid post: {0}")]
    InvalidPost(String),

    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },
}

/// A single failed artifact transfer during an import.
#[derive(Debug)]
pub struct ImportFailure {
    pub artifact: Artifact,
    pub path: PathBuf,
    pub source: std::io::Error,
}

/// Which half of a file record an import touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    Original,
    Thumbnail,
}

impl std::fmt::Display for Artifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Artifact::Original => write!(f, "original"),
            Artifact::Thumbnail => write!(f, "thumbnail"),
        }
    }
}

#[cfg(feature = "database")]
impl From<sqlx::Error> for HoardError {
    fn from(err: sqlx::Error) -> Self {
        HoardError::Database(err.to_string())
    }
}

#[cfg(feature = "database")]
impl From<sqlx::migrate::MigrateError> for HoardError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        HoardError::Database(format!("migration failed: {}", err))
    }
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for HoardError {
    fn from(err: reqwest::Error) -> Self {
        HoardError::Network(err.to_string())
    }
}

fn format_failures(failures: &[ImportFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{} from {}: {}", f.artifact, f.path.display(), f.source))
        .collect::<Vec<_>>()
        .join("; ")
}

impl HoardError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a transient fetch error
    pub fn fetch(plugin: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Fetch {
            plugin: plugin.into(),
            message: message.into(),
        }
    }

    /// Create a capability error
    pub fn unsupported(plugin: impl Into<String>, operation: &'static str) -> Self {
        Self::Unsupported {
            plugin: plugin.into(),
            operation,
        }
    }

    /// Create a not found error
    pub fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            key: key.into(),
        }
    }

    /// Whether retrying the same call later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, HoardError::Fetch { .. } | HoardError::Network(_))
    }
}
