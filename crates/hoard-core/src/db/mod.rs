//! SQLite persistence
//!
//! [`Database`] owns the pool and the schema. All reads and writes made on
//! behalf of an operation go through a [`Session`], a lazily opened
//! transaction that the caller commits or discards as a whole.
//!
//! File databases run in WAL mode. A write session takes the write lock when
//! its transaction begins (`BEGIN IMMEDIATE`) and keeps it until commit, so
//! concurrent write sessions queue for up to `busy_timeout` instead of
//! failing on a lock upgrade. Read sessions never block writers.
//!
//! The repository modules are plain functions over a `&mut SqliteConnection`
//! so they run unchanged inside a session or on a bare pooled connection.

pub mod files;
pub mod meta;
pub mod posts;
pub mod services;
pub mod subscriptions;

use crate::config::Config;
use hoard_common::Result;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqlitePool, SqlitePoolOptions,
    SqliteSynchronous,
};
use sqlx::{ConnectOptions, Sqlite, Transaction};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

const BEGIN_WRITE: &str = "BEGIN IMMEDIATE";

/// Connection pool plus schema management
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if needed) the database named by `config.database_url`
    pub async fn connect(config: &Config) -> Result<Self> {
        let options = connect_options(config)?;

        if let Some(parent) = options.get_filename().parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await?;

        info!(
            url = %config.database_url,
            busy_timeout_secs = config.busy_timeout_secs,
            "Connected to archive database"
        );

        Ok(Self { pool })
    }

    /// A private in-memory database
    ///
    /// Limited to one connection: every connection to `sqlite::memory:` is a
    /// separate database.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        Ok(Self { pool })
    }

    /// Create all tables that do not exist yet
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        debug!("Schema up to date");
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Start a new unit of work
    pub fn session(&self) -> Session {
        Session::new(self.pool.clone())
    }

    /// Start a unit of work that only reads
    pub fn read_session(&self) -> Session {
        Session::read_only(self.pool.clone())
    }
}

fn connect_options(config: &Config) -> Result<SqliteConnectOptions> {
    let options = SqliteConnectOptions::from_str(&config.database_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_secs(config.busy_timeout_secs))
        .log_statements(config.statement_log_level());

    Ok(options)
}

/// A unit of work
///
/// The underlying transaction is opened on first use. Inserts made through a
/// session are visible to later reads in the same session, so their ids are
/// available immediately. Nothing is visible to other sessions until
/// [`Session::commit`]; dropping an uncommitted session discards its work.
pub struct Session {
    pool: SqlitePool,
    tx: Option<Transaction<'static, Sqlite>>,
    read_only: bool,
}

impl Session {
    /// A session that may write; its transaction holds the write lock
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            tx: None,
            read_only: false,
        }
    }

    /// A session whose transaction is a plain deferred read snapshot
    pub fn read_only(pool: SqlitePool) -> Self {
        Self {
            pool,
            tx: None,
            read_only: true,
        }
    }

    /// The session's connection, opening the transaction if needed
    pub async fn conn(&mut self) -> Result<&mut SqliteConnection> {
        let tx = match self.tx.take() {
            Some(tx) => tx,
            None if self.read_only => self.pool.begin().await?,
            None => self.pool.begin_with(BEGIN_WRITE).await?,
        };
        let tx = self.tx.insert(tx);
        Ok(&mut **tx)
    }

    /// Whether there is uncommitted work
    pub fn in_transaction(&self) -> bool {
        self.tx.is_some()
    }

    /// Make the session's work durable
    ///
    /// The session stays usable; the next access opens a fresh transaction.
    pub async fn commit(&mut self) -> Result<()> {
        if let Some(tx) = self.tx.take() {
            tx.commit().await?;
        }
        Ok(())
    }

    /// Discard everything since the last commit
    pub async fn rollback(&mut self) -> Result<()> {
        if let Some(tx) = self.tx.take() {
            tx.rollback().await?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("in_transaction", &self.tx.is_some())
            .field("read_only", &self.read_only)
            .finish()
    }
}
