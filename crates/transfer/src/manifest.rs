use std::path::{Path, PathBuf};

use crate::MAX_FILE_NAME_BYTES;

/// Fixed checksum algorithm identifier recorded in manifests.
pub const CHECKSUM_ALGORITHM: &str = "sha256";

/// One persisted part of a split file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartRecord {
    /// Position in the original stream; contiguous, starting at 0.
    pub index: u64,
    /// Size of this part in bytes.
    pub byte_size: u64,
    /// Where the part was written.
    pub path: PathBuf,
}

/// The persisted digest of the original (unchunked) file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumRecord {
    /// Always [`CHECKSUM_ALGORITHM`].
    pub algorithm: &'static str,
    /// Hex-encoded digest of the original byte stream.
    pub digest: String,
    /// Where the checksum artifact was written.
    pub path: PathBuf,
}

/// Result of splitting a file: the parts, their checksum, and totals.
///
/// Immutable once returned; re-splitting the same file overwrites the
/// artifacts and yields a fresh manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkManifest {
    /// Platform-safe source file name the artifact names derive from.
    pub source_file_name: String,
    /// Parts in ascending index order.
    pub parts: Vec<PartRecord>,
    pub checksum: ChecksumRecord,
    /// Sum of all part sizes; equals the original file size.
    pub total_size: u64,
}

/// Truncates a file name to the platform-safe byte budget, respecting
/// UTF-8 boundaries.
pub fn safe_file_name(name: &str) -> &str {
    if name.len() <= MAX_FILE_NAME_BYTES {
        return name;
    }
    let mut end = MAX_FILE_NAME_BYTES;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    &name[..end]
}

/// Name of part `index` for a source file name.
pub fn part_file_name(file_name: &str, index: u64) -> String {
    format!("{file_name}.part_{index}")
}

/// Name of the checksum artifact for a source file name.
pub fn checksum_artifact_name(file_name: &str) -> String {
    format!("{file_name}.sha256")
}

/// Extracts the numeric part index from a directory entry, if the entry is
/// a part of `file_name`.
///
/// Indices must be compared numerically: `part_10` sorts after `part_2`.
pub fn part_index_of(entry_name: &str, file_name: &str) -> Option<u64> {
    let marker = format!("{file_name}.part_");
    let suffix = entry_name.strip_prefix(marker.as_str())?;
    suffix.parse::<u64>().ok()
}

/// Platform-safe base name of a source path.
pub(crate) fn source_file_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|n| n.to_str()).map(safe_file_name)
}
