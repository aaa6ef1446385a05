//! Content classification for imported files
//!
//! Sniffs the leading bytes of a file against a table of well-known
//! signatures and falls back to guessing from the file name.

use crate::error::Result;
use std::io::Read;
use std::path::Path;

/// Longest signature offset + length we ever need to look at.
const SNIFF_LEN: usize = 16;

/// (offset, signature, mime)
const SIGNATURES: &[(usize, &[u8], &str)] = &[
    (0, &[0xFF, 0xD8, 0xFF], "image/jpeg"),
    (0, &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A], "image/png"),
    (0, b"GIF87a", "image/gif"),
    (0, b"GIF89a", "image/gif"),
    (0, b"BM", "image/bmp"),
    (0, &[0x49, 0x49, 0x2A, 0x00], "image/tiff"),
    (0, &[0x4D, 0x4D, 0x00, 0x2A], "image/tiff"),
    (8, b"WEBP", "image/webp"),
    (8, b"AVI ", "video/x-msvideo"),
    (8, b"WAVE", "audio/wav"),
    (4, b"ftypavif", "image/avif"),
    (4, b"ftypheic", "image/heic"),
    (4, b"ftypqt", "video/quicktime"),
    (4, b"ftyp", "video/mp4"),
    (0, &[0x1A, 0x45, 0xDF, 0xA3], "video/webm"),
    (0, b"OggS", "audio/ogg"),
    (0, b"fLaC", "audio/flac"),
    (0, b"ID3", "audio/mpeg"),
    (0, b"%PDF", "application/pdf"),
    (0, &[b'P', b'K', 0x03, 0x04], "application/zip"),
    (0, &[0x1F, 0x8B], "application/gzip"),
    (0, &[b'7', b'z', 0xBC, 0xAF, 0x27, 0x1C], "application/x-7z-compressed"),
    (0, b"Rar!", "application/vnd.rar"),
];

/// Fallback when neither the content nor the name is recognised.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Classify the file at `path`.
pub fn mime_from_file(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let mut header = Vec::with_capacity(SNIFF_LEN);
    std::fs::File::open(path)?
        .take(SNIFF_LEN as u64)
        .read_to_end(&mut header)?;

    if let Some(mime) = sniff(&header) {
        return Ok(mime.to_string());
    }

    Ok(mime_guess::from_path(path)
        .first()
        .map(|m| m.essence_str().to_string())
        .unwrap_or_else(|| OCTET_STREAM.to_string()))
}

/// Match a header against the signature table.
pub fn sniff(header: &[u8]) -> Option<&'static str> {
    SIGNATURES.iter().find_map(|(offset, signature, mime)| {
        header
            .get(*offset..offset + signature.len())
            .filter(|window| window == signature)
            .map(|_| *mime)
    })
}

/// Extension metadata for a file name: every dot-suffix, joined, without the
/// leading dot.
///
/// `photo.jpeg` gives `jpeg`, `archive.tar.gz` gives `tar.gz`, and a name
/// without a dot gives an empty string. Leading dots belong to the stem, so
/// `.profile` has no extension either.
pub fn ext_from_path(path: impl AsRef<Path>) -> String {
    let name = match path.as_ref().file_name() {
        Some(name) => name.to_string_lossy(),
        None => return String::new(),
    };

    if name.ends_with('.') {
        return String::new();
    }

    let parts: Vec<&str> = name.trim_start_matches('.').split('.').collect();
    parts[1..].join(".")
}
