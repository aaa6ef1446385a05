//! The archive facade

use crate::config::Config;
use crate::db::{meta, Database, Session};
use crate::models::{File, Service};
use crate::plugin::PluginCore;
use crate::registry;
use crate::storage::{StorageManager, Transfer};
use hoard_common::{HoardError, Result};
use std::path::Path;
use tracing::{info, instrument};

/// An open archive: configuration, database and file tree
///
/// Cloning is cheap; clones share the connection pool and HTTP client.
#[derive(Debug, Clone)]
pub struct Hoard {
    config: Config,
    database: Database,
    storage: StorageManager,
    http: reqwest::Client,
}

impl Hoard {
    /// Open the archive described by `config`, creating the schema if needed
    pub async fn open(config: Config) -> Result<Self> {
        config.validate()?;
        let database = Database::connect(&config).await?;
        Self::with_database(config, database).await
    }

    /// Open an archive on an already connected database
    #[instrument(skip_all, fields(base_path = %config.base_path.display()))]
    pub async fn with_database(config: Config, database: Database) -> Result<Self> {
        config.validate()?;
        let storage = StorageManager::from_config(&config)?;

        let http = reqwest::Client::builder()
            .user_agent(concat!("hoard/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let hoard = Self {
            config,
            database,
            storage,
            http,
        };

        hoard.create_all().await?;
        hoard.check_layout().await?;

        info!(
            slot_size = hoard.storage.slot_size(),
            "Archive opened"
        );

        Ok(hoard)
    }

    /// Create any missing tables
    pub async fn create_all(&self) -> Result<()> {
        self.database.migrate().await
    }

    /// Record the slot size on first open and refuse a different one later
    async fn check_layout(&self) -> Result<()> {
        let configured = self.config.files_slot_size;
        let mut conn = self.database.pool().acquire().await?;

        let stored = meta::get_or_insert(&mut conn, meta::FILES_SLOT_SIZE, &configured.to_string())
            .await?;
        let stored: i64 = stored.parse().map_err(|_| {
            HoardError::Database(format!("corrupt {} value: '{}'", meta::FILES_SLOT_SIZE, stored))
        })?;

        if stored != configured {
            return Err(HoardError::LayoutMismatch { stored, configured });
        }

        Ok(())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn storage(&self) -> &StorageManager {
        &self.storage
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Start a new unit of work
    pub fn session(&self) -> Session {
        self.database.session()
    }

    /// Start a unit of work that only reads and never waits on writers
    pub fn read_session(&self) -> Session {
        self.database.read_session()
    }

    /// See [`registry::register_service`]
    pub async fn register_service(&self, session: &mut Session, name: &str) -> Result<Service> {
        registry::register_service(session, name).await
    }

    /// See [`StorageManager::import_file`]
    pub async fn import_file(
        &self,
        file: &mut File,
        original: Option<&Path>,
        thumbnail: Option<&Path>,
        transfer: Transfer,
    ) -> Result<()> {
        self.storage
            .import_file(file, original, thumbnail, transfer)
            .await
    }

    /// Register (or look up) `name` and hand back the services an adapter
    /// for it works with
    pub async fn plugin_core(&self, session: &mut Session, name: &str) -> Result<PluginCore> {
        let source = self.register_service(session, name).await?;
        Ok(PluginCore::new(self.clone(), source))
    }
}
