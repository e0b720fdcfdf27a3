//! Chunked file split/merge with streaming SHA-256 verification.
//!
//! The host app caps the size of a single upload, so large files are split
//! into size-bounded parts (`<name>.part_<n>`) plus a checksum artifact
//! (`<name>.sha256`) covering the original byte stream. Merging streams the
//! parts back in numeric index order and verifies the digest.

mod chunked;
mod manifest;

pub use chunked::{MergeOptions, checksum_bytes, file_checksum, merge, split};
pub use manifest::{
    CHECKSUM_ALGORITHM, ChecksumRecord, ChunkManifest, PartRecord, checksum_artifact_name,
    part_file_name, part_index_of, safe_file_name,
};

/// Hard ceiling on a single part: 500 MB, the host app's upload limit.
pub const MAX_CHUNK_SIZE: usize = 524_288_000;

/// Default part size when the caller does not care.
pub const DEFAULT_CHUNK_SIZE: usize = MAX_CHUNK_SIZE;

/// Maximum length (in bytes) of a source file name used in artifact names.
pub const MAX_FILE_NAME_BYTES: usize = 246;

/// Errors produced by the transfer crate.
///
/// A checksum mismatch during merge is a `false` result, not an error: a
/// partially valid output file may already exist on disk.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid chunk size {given}: must be 1..={max}")]
    Config { given: usize, max: usize },

    #[error("invalid source path: {0}")]
    InvalidPath(String),
}
