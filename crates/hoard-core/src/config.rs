//! Configuration management

use hoard_common::{checksum::ChecksumAlgorithm, logging::LogConfig, HoardError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ============================================================================
// Archive Configuration Constants
// ============================================================================

/// Default archive root.
pub const DEFAULT_BASE_PATH: &str = "./archive";

/// Default number of files per shard directory.
pub const DEFAULT_FILES_SLOT_SIZE: i64 = 1000;

/// Default maximum database connections in the pool.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 4;

/// Default time a write session waits for another writer to commit.
pub const DEFAULT_BUSY_TIMEOUT_SECS: u64 = 60;

/// Name of the SQLite database created under the archive root when no URL is
/// configured.
pub const DEFAULT_DATABASE_FILE: &str = "hoard.db";

/// Archive configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Root directory holding `files/` and `thumbs/`
    pub base_path: PathBuf,
    pub database_url: String,
    /// Files per shard directory; fixed for the lifetime of an archive
    pub files_slot_size: i64,
    pub hash_algorithm: ChecksumAlgorithm,
    pub max_connections: u32,
    /// How long a write session waits for the database write lock
    pub busy_timeout_secs: u64,
    /// Log every SQL statement at info level
    pub debug: bool,
    pub log: LogConfig,
}

/// On-disk form of [`Config`], where everything but the base path is optional
#[derive(Debug, Deserialize)]
struct FileConfig {
    base_path: PathBuf,
    database_url: Option<String>,
    files_slot_size: Option<i64>,
    hash_algorithm: Option<ChecksumAlgorithm>,
    max_connections: Option<u32>,
    busy_timeout_secs: Option<u64>,
    #[serde(default)]
    debug: bool,
    #[serde(default)]
    log: LogConfig,
}

impl Config {
    /// Configuration rooted at `base_path` with every other setting at its
    /// default.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        let base_path = base_path.into();
        Self {
            database_url: default_database_url(&base_path),
            base_path,
            files_slot_size: DEFAULT_FILES_SLOT_SIZE,
            hash_algorithm: ChecksumAlgorithm::default(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            busy_timeout_secs: DEFAULT_BUSY_TIMEOUT_SECS,
            debug: false,
            log: LogConfig::default(),
        }
    }

    /// Load configuration from `HOARD_*` environment variables and defaults
    ///
    /// A `.env` file in the working directory is read first when present.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let base_path = std::env::var("HOARD_BASE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_BASE_PATH));

        let hash_algorithm = match std::env::var("HOARD_HASH_ALGORITHM") {
            Ok(value) => value.parse()?,
            Err(_) => ChecksumAlgorithm::default(),
        };

        let log = LogConfig::default()
            .merge_env()
            .map_err(|e| HoardError::config(e.to_string()))?;

        let config = Config {
            database_url: std::env::var("HOARD_DATABASE_URL")
                .unwrap_or_else(|_| default_database_url(&base_path)),
            files_slot_size: std::env::var("HOARD_FILES_SLOT_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_FILES_SLOT_SIZE),
            max_connections: std::env::var("HOARD_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_MAX_CONNECTIONS),
            busy_timeout_secs: std::env::var("HOARD_BUSY_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_BUSY_TIMEOUT_SECS),
            debug: std::env::var("HOARD_DEBUG")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(false),
            base_path,
            hash_algorithm,
            log,
        };

        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
            .map_err(|e| HoardError::config(format!("{}: {}", path.display(), e)))
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: FileConfig =
            toml::from_str(content).map_err(|e| HoardError::config(e.to_string()))?;

        let config = Config {
            database_url: file
                .database_url
                .unwrap_or_else(|| default_database_url(&file.base_path)),
            files_slot_size: file.files_slot_size.unwrap_or(DEFAULT_FILES_SLOT_SIZE),
            hash_algorithm: file.hash_algorithm.unwrap_or_default(),
            max_connections: file.max_connections.unwrap_or(DEFAULT_MAX_CONNECTIONS),
            busy_timeout_secs: file.busy_timeout_secs.unwrap_or(DEFAULT_BUSY_TIMEOUT_SECS),
            debug: file.debug,
            log: file.log,
            base_path: file.base_path,
        };

        config.validate()?;

        Ok(config)
    }

    pub fn with_database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = url.into();
        self
    }

    pub fn with_files_slot_size(mut self, slot_size: i64) -> Self {
        self.files_slot_size = slot_size;
        self
    }

    pub fn with_busy_timeout_secs(mut self, secs: u64) -> Self {
        self.busy_timeout_secs = secs;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Level sqlx logs executed statements at
    pub fn statement_log_level(&self) -> log::LevelFilter {
        if self.debug {
            log::LevelFilter::Info
        } else {
            log::LevelFilter::Off
        }
    }

    pub fn with_hash_algorithm(mut self, algorithm: ChecksumAlgorithm) -> Self {
        self.hash_algorithm = algorithm;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.base_path.as_os_str().is_empty() {
            return Err(HoardError::config("Base path cannot be empty"));
        }

        if self.database_url.is_empty() {
            return Err(HoardError::config("Database URL cannot be empty"));
        }

        if self.files_slot_size <= 0 {
            return Err(HoardError::config(format!(
                "files_slot_size must be greater than 0, got {}",
                self.files_slot_size
            )));
        }

        if self.max_connections == 0 {
            return Err(HoardError::config("max_connections must be greater than 0"));
        }

        Ok(())
    }

    /// Root of the original-files tree
    pub fn files_path(&self) -> PathBuf {
        self.base_path.join("files")
    }

    /// Root of the thumbnail tree
    pub fn thumbs_path(&self) -> PathBuf {
        self.base_path.join("thumbs")
    }
}

fn default_database_url(base_path: &Path) -> String {
    format!(
        "sqlite://{}",
        base_path.join(DEFAULT_DATABASE_FILE).display()
    )
}
