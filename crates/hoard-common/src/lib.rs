//! Hoard Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, utilities, and error handling for the hoard archive.
//!
//! # Overview
//!
//! This crate provides the leaf functionality used by `hoard-core`:
//!
//! - **Error Handling**: [`HoardError`] and the [`Result`] alias
//! - **Checksums**: content hashes recorded for imported originals
//! - **MIME**: content classification and extension derivation
//! - **Dynamic**: order-preserving documents for adapter options and state
//! - **Logging**: tracing subscriber setup
//!
//! # Example
//!
//! ```no_run
//! use hoard_common::checksum::{compute_file_checksum, ChecksumAlgorithm};
//! use hoard_common::mime::{ext_from_path, mime_from_file};
//!
//! fn describe(path: &str) -> hoard_common::Result<()> {
//!     let hash = compute_file_checksum(path, ChecksumAlgorithm::Md5)?;
//!     let mime = mime_from_file(path)?;
//!     tracing::info!(%hash, %mime, ext = %ext_from_path(path), "Classified file");
//!     Ok(())
//! }
//! ```

pub mod checksum;
pub mod dynamic;
pub mod error;
pub mod logging;
pub mod mime;

// Re-export commonly used types
pub use dynamic::Dynamic;
pub use error::{Artifact, HoardError, ImportFailure, Result};
