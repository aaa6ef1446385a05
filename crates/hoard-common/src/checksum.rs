//! Content hashes for imported originals

use crate::error::{HoardError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::Path;

/// Checksum algorithm used for `File.hash`
///
/// Existing archives are hashed with MD5, so that stays the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumAlgorithm {
    #[default]
    Md5,
    Sha256,
}

impl std::fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChecksumAlgorithm::Md5 => write!(f, "md5"),
            ChecksumAlgorithm::Sha256 => write!(f, "sha256"),
        }
    }
}

impl std::str::FromStr for ChecksumAlgorithm {
    type Err = HoardError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "md5" => Ok(ChecksumAlgorithm::Md5),
            "sha256" | "sha-256" => Ok(ChecksumAlgorithm::Sha256),
            _ => Err(HoardError::config(format!("Invalid hash algorithm: {}", s))),
        }
    }
}

/// Compute checksum for a file
pub fn compute_file_checksum(
    path: impl AsRef<Path>,
    algorithm: ChecksumAlgorithm,
) -> Result<String> {
    let mut file = std::fs::File::open(path)?;
    compute_checksum(&mut file, algorithm)
}

/// Compute checksum for any readable source
pub fn compute_checksum<R: Read>(reader: &mut R, algorithm: ChecksumAlgorithm) -> Result<String> {
    let mut buffer = [0u8; 8192];

    match algorithm {
        ChecksumAlgorithm::Md5 => {
            let mut context = md5::Context::new();

            loop {
                let bytes_read = reader.read(&mut buffer)?;
                if bytes_read == 0 {
                    break;
                }
                context.consume(&buffer[..bytes_read]);
            }

            Ok(format!("{:x}", context.compute()))
        },
        ChecksumAlgorithm::Sha256 => {
            let mut hasher = Sha256::new();

            loop {
                let bytes_read = reader.read(&mut buffer)?;
                if bytes_read == 0 {
                    break;
                }
                hasher.update(&buffer[..bytes_read]);
            }

            Ok(hex::encode(hasher.finalize()))
        },
    }
}
