use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tracing::{debug, info, warn};

use crate::manifest::{
    ChecksumRecord, ChunkManifest, PartRecord, checksum_artifact_name, part_file_name,
    part_index_of, source_file_name,
};
use crate::{CHECKSUM_ALGORITHM, MAX_CHUNK_SIZE, TransferError};

/// Read/copy buffer for streaming IO.
const IO_BUF_SIZE: usize = 64 * 1024;

// ---------------------------------------------------------------------------
// Checksum helpers
// ---------------------------------------------------------------------------

/// Computes SHA-256 of `data` and returns the hex-encoded digest.
pub fn checksum_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Computes SHA-256 of an entire file and returns the hex-encoded digest.
pub async fn file_checksum(path: &Path) -> Result<String, TransferError> {
    let mut file = fs::File::open(path).await?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; IO_BUF_SIZE];
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

// ---------------------------------------------------------------------------
// Split
// ---------------------------------------------------------------------------

/// Splits `source` into parts of at most `chunk_size` bytes under
/// `output_dir`, plus a checksum artifact over the original stream.
///
/// Parts are named `<name>.part_<n>` with `n` starting at 0 and the
/// checksum artifact `<name>.sha256`, where `<name>` is the source base
/// name truncated to a platform-safe length. The digest covers the
/// concatenated original file, not per-part slices, and the artifact is
/// written strictly after every part has been flushed and synced, so a
/// checksum on disk never refers to an incomplete part set.
pub async fn split(
    source: &Path,
    output_dir: &Path,
    chunk_size: usize,
) -> Result<ChunkManifest, TransferError> {
    if chunk_size == 0 || chunk_size > MAX_CHUNK_SIZE {
        return Err(TransferError::Config {
            given: chunk_size,
            max: MAX_CHUNK_SIZE,
        });
    }
    let file_name = source_file_name(source)
        .ok_or_else(|| TransferError::InvalidPath(source.display().to_string()))?
        .to_string();

    let mut reader = fs::File::open(source).await?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; IO_BUF_SIZE.min(chunk_size)];

    let mut parts: Vec<PartRecord> = Vec::new();
    let mut current: Option<(BufWriter<fs::File>, PathBuf, u64)> = None;
    let mut total_size: u64 = 0;

    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        total_size += n as u64;

        let mut offset = 0;
        while offset < n {
            if current.is_none() {
                let index = parts.len() as u64;
                let path = output_dir.join(part_file_name(&file_name, index));
                let file = fs::File::create(&path).await?;
                current = Some((BufWriter::new(file), path, 0));
            }
            let (writer, _, written) = current.as_mut().unwrap();
            let room = chunk_size - *written as usize;
            let take = room.min(n - offset);
            writer.write_all(&buf[offset..offset + take]).await?;
            *written += take as u64;
            offset += take;

            if *written as usize == chunk_size {
                let (writer, path, written) = current.take().unwrap();
                flush_part(writer, &path, written, &mut parts).await?;
            }
        }
    }

    // Trailing partial part, if any.
    if let Some((writer, path, written)) = current.take() {
        flush_part(writer, &path, written, &mut parts).await?;
    }

    // Write barrier: every part is durable before the checksum exists.
    let digest = hex::encode(hasher.finalize());
    let checksum_path = output_dir.join(checksum_artifact_name(&file_name));
    let mut checksum_file = fs::File::create(&checksum_path).await?;
    checksum_file.write_all(digest.as_bytes()).await?;
    checksum_file.sync_all().await?;

    info!(
        file = %file_name,
        parts = parts.len(),
        total_size,
        "split complete"
    );

    Ok(ChunkManifest {
        source_file_name: file_name,
        parts,
        checksum: ChecksumRecord {
            algorithm: CHECKSUM_ALGORITHM,
            digest,
            path: checksum_path,
        },
        total_size,
    })
}

async fn flush_part(
    mut writer: BufWriter<fs::File>,
    path: &Path,
    written: u64,
    parts: &mut Vec<PartRecord>,
) -> Result<(), TransferError> {
    writer.flush().await?;
    writer.into_inner().sync_all().await?;
    debug!(part = %path.display(), bytes = written, "part flushed");
    parts.push(PartRecord {
        index: parts.len() as u64,
        byte_size: written,
        path: path.to_path_buf(),
    });
    Ok(())
}

// ---------------------------------------------------------------------------
// Merge
// ---------------------------------------------------------------------------

/// Options for [`merge`].
#[derive(Debug, Clone, Copy, Default)]
pub struct MergeOptions {
    /// Remove part files and the checksum artifact after a verified merge.
    /// Defaults to retaining them.
    pub delete_parts: bool,
}

/// Reassembles the parts of `original_file_name` from `input_dir` into
/// `output_path` and verifies the result against the checksum artifact.
///
/// Returns `Ok(true)` only if a checksum artifact existed and matched the
/// merged stream. A missing artifact or a digest mismatch is `Ok(false)`,
/// not an error — the merged output may still exist on disk and the caller
/// must verify before trusting it. `Ok(false)` with no parts found means
/// there was nothing to merge.
pub async fn merge(
    original_file_name: &str,
    input_dir: &Path,
    output_path: &Path,
    options: MergeOptions,
) -> Result<bool, TransferError> {
    let file_name = crate::safe_file_name(original_file_name);
    let checksum_path = input_dir.join(checksum_artifact_name(file_name));

    // Collect (index, path) pairs; sort numerically, never lexically.
    let mut parts: Vec<(u64, PathBuf)> = Vec::new();
    let mut entries = fs::read_dir(input_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if let Some(index) = part_index_of(name, file_name) {
            parts.push((index, entry.path()));
        }
    }
    parts.sort_by_key(|(index, _)| *index);

    if parts.is_empty() && !fs::try_exists(&checksum_path).await? {
        debug!(file = %file_name, "no parts to merge");
        return Ok(false);
    }

    let mut writer = BufWriter::new(fs::File::create(output_path).await?);
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; IO_BUF_SIZE];

    for (index, path) in &parts {
        debug!(part = *index, path = %path.display(), "merging part");
        let mut reader = fs::File::open(path).await?;
        loop {
            let n = reader.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
            writer.write_all(&buf[..n]).await?;
        }
    }
    writer.flush().await?;
    writer.into_inner().sync_all().await?;

    let recorded = match fs::read_to_string(&checksum_path).await {
        Ok(text) => text.trim().to_ascii_lowercase(),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            warn!(file = %file_name, "no checksum artifact; merge unverified");
            return Ok(false);
        }
        Err(err) => return Err(err.into()),
    };
    let merged = hex::encode(hasher.finalize());

    if merged != recorded {
        warn!(file = %file_name, "checksum mismatch; merged output may be corrupt");
        return Ok(false);
    }

    if options.delete_parts {
        for (_, path) in &parts {
            fs::remove_file(path).await?;
        }
        fs::remove_file(&checksum_path).await?;
        debug!(file = %file_name, removed = parts.len(), "parts removed after verification");
    }

    info!(file = %file_name, parts = parts.len(), "merge verified");
    Ok(true)
}
