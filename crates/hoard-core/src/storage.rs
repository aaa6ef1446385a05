//! On-disk file layout and import
//!
//! Originals live at `files/<shard>/<id>` and thumbnails at
//! `thumbs/<shard>/<id>.jpg`, where `shard = id / slot_size`. The layout is a
//! pure function of the file id, so paths can be recomputed at any time
//! without touching the database.

use crate::config::Config;
use crate::models::File;
use hoard_common::checksum::{compute_file_checksum, ChecksumAlgorithm};
use hoard_common::mime::{ext_from_path, mime_from_file};
use hoard_common::{Artifact, HoardError, ImportFailure, Result};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

/// Extension of every stored thumbnail
pub const THUMBNAIL_EXTENSION: &str = "jpg";

/// Whether an import leaves the source files in place
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transfer {
    #[default]
    Copy,
    Move,
}

/// Destination paths of a file's two artifacts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePaths {
    pub original: PathBuf,
    pub thumbnail: PathBuf,
}

/// Content classification of an original, computed before it is transferred
struct Classification {
    hash: String,
    mime: String,
    ext: String,
}

/// Maps file ids onto the archive tree and moves content into it
#[derive(Debug, Clone)]
pub struct StorageManager {
    files_root: PathBuf,
    thumbs_root: PathBuf,
    slot_size: i64,
    hash_algorithm: ChecksumAlgorithm,
}

impl StorageManager {
    pub fn new(
        files_root: impl Into<PathBuf>,
        thumbs_root: impl Into<PathBuf>,
        slot_size: i64,
        hash_algorithm: ChecksumAlgorithm,
    ) -> Result<Self> {
        if slot_size <= 0 {
            return Err(HoardError::config(format!(
                "files_slot_size must be greater than 0, got {}",
                slot_size
            )));
        }

        Ok(Self {
            files_root: files_root.into(),
            thumbs_root: thumbs_root.into(),
            slot_size,
            hash_algorithm,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.files_path(),
            config.thumbs_path(),
            config.files_slot_size,
            config.hash_algorithm,
        )
    }

    pub fn slot_size(&self) -> i64 {
        self.slot_size
    }

    pub fn files_root(&self) -> &Path {
        &self.files_root
    }

    pub fn thumbs_root(&self) -> &Path {
        &self.thumbs_root
    }

    /// Shard directory index for a file id
    pub fn shard(&self, id: i64) -> i64 {
        id.div_euclid(self.slot_size)
    }

    /// Where the artifacts of file `id` are stored
    pub fn file_paths(&self, id: i64) -> FilePaths {
        let shard = self.shard(id).to_string();
        FilePaths {
            original: self.files_root.join(&shard).join(id.to_string()),
            thumbnail: self
                .thumbs_root
                .join(&shard)
                .join(format!("{}.{}", id, THUMBNAIL_EXTENSION)),
        }
    }

    /// [`StorageManager::file_paths`] for a record, which must have an id
    pub fn paths_for(&self, file: &File) -> Result<FilePaths> {
        file.id
            .map(|id| self.file_paths(id))
            .ok_or(HoardError::UnassignedId)
    }

    /// Place an original and/or a thumbnail for `file` into the archive
    ///
    /// When an original is given its hash, MIME type and extension are
    /// recorded on `file`, replacing earlier values. The two artifacts are
    /// transferred independently: each presence flag is set only when its
    /// own transfer succeeds, and a flag that is already set stays set.
    /// Failed artifacts are reported together as [`HoardError::Import`]
    /// after both have been attempted. The caller persists `file` either way.
    #[instrument(skip(self, file), fields(file_id = ?file.id))]
    pub async fn import_file(
        &self,
        file: &mut File,
        original: Option<&Path>,
        thumbnail: Option<&Path>,
        transfer: Transfer,
    ) -> Result<()> {
        let file_id = file.id.ok_or(HoardError::UnassignedId)?;
        let paths = self.file_paths(file_id);
        let mut failures = Vec::new();

        if let Some(source) = original {
            let outcome = match self.classify(source).await {
                Ok(classification) => transfer_file(source, &paths.original, transfer)
                    .await
                    .map(|_| classification),
                Err(e) => Err(e),
            };

            match outcome {
                Ok(classification) => {
                    file.hash = Some(classification.hash);
                    file.mime = Some(classification.mime);
                    file.ext = Some(classification.ext);
                    file.file_present = true;
                    info!(
                        file_id,
                        dst = %paths.original.display(),
                        mime = file.mime.as_deref().unwrap_or_default(),
                        "Imported original"
                    );
                },
                Err(source_err) => {
                    warn!(file_id, src = %source.display(), error = %source_err, "Original import failed");
                    failures.push(ImportFailure {
                        artifact: Artifact::Original,
                        path: source.to_path_buf(),
                        source: source_err,
                    });
                },
            }
        }

        if let Some(source) = thumbnail {
            match transfer_file(source, &paths.thumbnail, transfer).await {
                Ok(()) => {
                    file.thumb_present = true;
                    info!(file_id, dst = %paths.thumbnail.display(), "Imported thumbnail");
                },
                Err(source_err) => {
                    warn!(file_id, src = %source.display(), error = %source_err, "Thumbnail import failed");
                    failures.push(ImportFailure {
                        artifact: Artifact::Thumbnail,
                        path: source.to_path_buf(),
                        source: source_err,
                    });
                },
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(HoardError::Import { file_id, failures })
        }
    }

    /// Hash and sniff an original before it is moved away
    async fn classify(&self, source: &Path) -> io::Result<Classification> {
        let source = source.to_path_buf();
        let algorithm = self.hash_algorithm;

        tokio::task::spawn_blocking(move || {
            let hash = compute_file_checksum(&source, algorithm).map_err(into_io)?;
            let mime = mime_from_file(&source).map_err(into_io)?;
            let ext = ext_from_path(&source);
            Ok::<_, io::Error>(Classification { hash, mime, ext })
        })
        .await
        .map_err(io::Error::other)?
    }
}

fn into_io(err: HoardError) -> io::Error {
    match err {
        HoardError::Io(e) => e,
        other => io::Error::other(other.to_string()),
    }
}

/// Copy or move `src` to `dst`, creating parent directories and replacing
/// any existing file at `dst`
async fn transfer_file(src: &Path, dst: &Path, transfer: Transfer) -> io::Result<()> {
    if let Some(parent) = dst.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    match transfer {
        Transfer::Copy => {
            tokio::fs::copy(src, dst).await?;
        },
        Transfer::Move => {
            if let Err(rename_err) = tokio::fs::rename(src, dst).await {
                // rename cannot cross filesystems
                if !tokio::fs::try_exists(src).await.unwrap_or(false) {
                    return Err(rename_err);
                }
                debug!(src = %src.display(), error = %rename_err, "Rename failed, copying instead");
                tokio::fs::copy(src, dst).await?;
                tokio::fs::remove_file(src).await?;
            }
        },
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PNG_HEADER: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

    fn create_test_storage(slot_size: i64) -> (StorageManager, TempDir) {
        let dir = TempDir::new().unwrap();
        let storage = StorageManager::new(
            dir.path().join("files"),
            dir.path().join("thumbs"),
            slot_size,
            ChecksumAlgorithm::Md5,
        )
        .unwrap();
        (storage, dir)
    }

    fn write_source(dir: &TempDir, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.path().join("incoming").join(name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, content).unwrap();
        path
    }

    fn assigned(id: i64) -> File {
        File {
            id: Some(id),
            ..File::default()
        }
    }

    #[test]
    fn test_file_paths_are_sharded() {
        let (storage, dir) = create_test_storage(1000);

        let paths = storage.file_paths(2500);
        assert_eq!(paths.original, dir.path().join("files/2/2500"));
        assert_eq!(paths.thumbnail, dir.path().join("thumbs/2/2500.jpg"));

        assert_eq!(storage.shard(999), 0);
        assert_eq!(storage.shard(1000), 1);
        assert_eq!(storage.file_paths(7).original, dir.path().join("files/0/7"));
    }

    #[test]
    fn test_file_paths_are_deterministic() {
        let (storage, _dir) = create_test_storage(250);
        assert_eq!(storage.file_paths(12345), storage.file_paths(12345));
        assert_eq!(storage.shard(12345), 49);
    }

    #[test]
    fn test_zero_slot_size_rejected() {
        let result = StorageManager::new("/f", "/t", 0, ChecksumAlgorithm::Md5);
        assert!(matches!(result, Err(HoardError::Config(_))));
    }

    #[test]
    fn test_paths_for_requires_id() {
        let (storage, _dir) = create_test_storage(1000);
        assert!(matches!(
            storage.paths_for(&File::default()),
            Err(HoardError::UnassignedId)
        ));
    }

    #[tokio::test]
    async fn test_import_original_records_classification() {
        let (storage, dir) = create_test_storage(1000);
        let source = write_source(&dir, "photo.tar.gz", PNG_HEADER);
        let mut file = assigned(2500);

        storage
            .import_file(&mut file, Some(&source), None, Transfer::Copy)
            .await
            .unwrap();

        assert!(file.file_present);
        assert!(!file.thumb_present);
        assert_eq!(file.mime.as_deref(), Some("image/png"));
        assert_eq!(file.ext.as_deref(), Some("tar.gz"));
        let expected = hoard_common::checksum::compute_checksum(
            &mut std::io::Cursor::new(PNG_HEADER),
            ChecksumAlgorithm::Md5,
        )
        .unwrap();
        assert_eq!(file.hash.as_deref(), Some(expected.as_str()));
        assert!(source.exists(), "copy must leave the source in place");
        assert_eq!(
            std::fs::read(dir.path().join("files/2/2500")).unwrap(),
            PNG_HEADER
        );
    }

    #[tokio::test]
    async fn test_import_move_removes_source() {
        let (storage, dir) = create_test_storage(1000);
        let thumb = write_source(&dir, "thumb.jpg", b"thumbnail");
        let mut file = assigned(42);

        storage
            .import_file(&mut file, None, Some(&thumb), Transfer::Move)
            .await
            .unwrap();

        assert!(file.thumb_present);
        assert!(!file.file_present);
        assert!(file.hash.is_none());
        assert!(!thumb.exists());
        assert!(dir.path().join("thumbs/0/42.jpg").exists());
    }

    #[tokio::test]
    async fn test_import_without_id_fails() {
        let (storage, dir) = create_test_storage(1000);
        let source = write_source(&dir, "a.txt", b"a");
        let mut file = File::default();

        let result = storage
            .import_file(&mut file, Some(&source), None, Transfer::Copy)
            .await;

        assert!(matches!(result, Err(HoardError::UnassignedId)));
        assert!(!file.file_present);
    }

    #[tokio::test]
    async fn test_failed_artifact_does_not_block_the_other() {
        let (storage, dir) = create_test_storage(1000);
        let thumb = write_source(&dir, "t.jpg", b"thumb");
        let missing = dir.path().join("incoming/missing.png");
        let mut file = assigned(3);

        let err = storage
            .import_file(&mut file, Some(&missing), Some(&thumb), Transfer::Copy)
            .await
            .unwrap_err();

        match err {
            HoardError::Import { file_id, failures } => {
                assert_eq!(file_id, 3);
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].artifact, Artifact::Original);
                assert_eq!(failures[0].source.kind(), io::ErrorKind::NotFound);
            },
            other => panic!("unexpected error: {other}"),
        }
        assert!(!file.file_present);
        assert!(file.hash.is_none());
        assert!(file.thumb_present);
    }

    #[tokio::test]
    async fn test_flags_are_additive() {
        let (storage, dir) = create_test_storage(1000);
        let original = write_source(&dir, "song.mp3", b"ID3\x04rest");
        let thumb = write_source(&dir, "cover.jpg", b"cover");
        let mut file = assigned(1001);

        storage
            .import_file(&mut file, None, Some(&thumb), Transfer::Copy)
            .await
            .unwrap();
        storage
            .import_file(&mut file, Some(&original), None, Transfer::Copy)
            .await
            .unwrap();

        assert!(file.thumb_present, "earlier thumbnail flag must survive");
        assert!(file.file_present);
        assert_eq!(file.ext.as_deref(), Some("mp3"));
        assert!(dir.path().join("files/1/1001").exists());
        assert!(dir.path().join("thumbs/1/1001.jpg").exists());
    }

    #[tokio::test]
    async fn test_reimport_overwrites_classification() {
        let (storage, dir) = create_test_storage(1000);
        let first = write_source(&dir, "first.png", PNG_HEADER);
        let second = write_source(&dir, "second.txt", b"plain text");
        let mut file = assigned(5);

        storage
            .import_file(&mut file, Some(&first), None, Transfer::Copy)
            .await
            .unwrap();
        storage
            .import_file(&mut file, Some(&second), None, Transfer::Copy)
            .await
            .unwrap();

        assert_eq!(file.ext.as_deref(), Some("txt"));
        assert_eq!(
            std::fs::read(dir.path().join("files/0/5")).unwrap(),
            b"plain text"
        );
    }
}
