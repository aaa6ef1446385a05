//! Hoard Core Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Storage, source registry and subscription protocol for the hoard media
//! archive.
//!
//! # Overview
//!
//! - **Storage Manager** ([`storage`]): maps file ids onto a sharded on-disk
//!   layout and imports originals and thumbnails into it
//! - **Service Registry** ([`registry`]): get-or-create of the versioned
//!   identity every source adapter hangs off
//! - **Subscriptions** ([`subscription`]): resumable, ordered fetching of new
//!   or old posts with an adapter-owned checkpoint
//! - **Plugin contract** ([`plugin`]): the capability set a source adapter
//!   implements, with reverse-search adapters as a narrower variant
//!
//! Persistence goes through a SQLite unit of work ([`db::Session`]).
//!
//! # Example
//!
//! ```no_run
//! use hoard_core::{config::Config, Hoard};
//!
//! #[tokio::main]
//! async fn main() -> hoard_common::Result<()> {
//!     let hoard = Hoard::open(Config::from_env()?).await?;
//!     let mut session = hoard.session();
//!     let service = hoard.register_service(&mut session, "pixiv").await?;
//!     session.commit().await?;
//!     tracing::info!(service = %service.name, version = service.version, "Ready");
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod db;
pub mod hoard;
pub mod models;
pub mod net;
pub mod plugin;
pub mod registry;
pub mod storage;
pub mod subscription;

// Re-export commonly used types
pub use hoard::Hoard;
pub use hoard_common::{Dynamic, HoardError, Result};
pub use models::{File, NewPost, RemotePost, Service, Subscription};
pub use storage::{StorageManager, Transfer};
pub use subscription::{FetchDirection, PostIterator, SearchIterator};
