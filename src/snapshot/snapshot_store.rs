use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use bincode::{Decode, Encode};
use compio::fs;
use snafu::{ResultExt, Snafu, ensure};
use tracing::{debug, info, warn};

use crate::ext::{AccessExt, BestEffortPathExt, OsStrBytesExt, os_str_from_raw_bytes};
use crate::fingerprint::ContentDigest;
use crate::snapshot::{RelativePath, Snapshot};

/// Leading bytes of every snapshot file.
const SNAPSHOT_MAGIC: &[u8; 4] = b"TSNP";
const COMPRESSION_LEVEL: i32 = 3;

/// On-disk form of a [`Snapshot`]. The variant index is the schema version;
/// new layouts get a new variant so older files are still recognised.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
enum SnapshotRecord {
    V1 {
        source_root: String,
        files: Vec<String>,
        directories: Vec<String>,
    },
    /// Paths as raw bytes, so roots and names that are not UTF-8 survive.
    V2 {
        source_root: Vec<u8>,
        files: Vec<Vec<u8>>,
        directories: Vec<Vec<u8>>,
    },
}

impl From<&Snapshot> for SnapshotRecord {
    fn from(snapshot: &Snapshot) -> Self {
        let to_bytes = |paths: &BTreeSet<RelativePath>| {
            paths
                .iter()
                .map(|path| path.as_bytes().to_vec())
                .collect::<Vec<_>>()
        };

        SnapshotRecord::V2 {
            source_root: snapshot.source_root().as_os_str().raw_bytes().to_vec(),
            files: to_bytes(snapshot.files()),
            directories: to_bytes(snapshot.directories()),
        }
    }
}

impl From<SnapshotRecord> for Snapshot {
    fn from(record: SnapshotRecord) -> Self {
        let parse = |paths: Vec<Vec<u8>>| {
            paths
                .iter()
                .filter_map(|path| RelativePath::from_bytes(path))
                .collect::<Vec<_>>()
        };

        let (source_root, files, directories): (Vec<u8>, Vec<Vec<u8>>, Vec<Vec<u8>>) = match record {
            SnapshotRecord::V1 {
                source_root,
                files,
                directories,
            } => (
                source_root.into_bytes(),
                files.into_iter().map(String::into_bytes).collect(),
                directories.into_iter().map(String::into_bytes).collect(),
            ),
            SnapshotRecord::V2 {
                source_root,
                files,
                directories,
            } => (source_root, files, directories),
        };
        let source_root = PathBuf::from(os_str_from_raw_bytes(&source_root).into_owned());

        Snapshot::new(source_root, parse(files), parse(directories))
    }
}

pub fn encode_snapshot(snapshot: &Snapshot) -> Result<Vec<u8>, SnapshotStoreError> {
    let record = SnapshotRecord::from(snapshot);
    let encoded =
        bincode::encode_to_vec(&record, bincode::config::standard()).context(EncodeSnafu)?;
    let compressed = zstd::encode_all(encoded.as_slice(), COMPRESSION_LEVEL).context(CompressSnafu)?;

    let mut bytes = Vec::with_capacity(SNAPSHOT_MAGIC.len() + compressed.len());
    bytes.extend_from_slice(SNAPSHOT_MAGIC);
    bytes.extend_from_slice(&compressed);
    Ok(bytes)
}

pub fn decode_snapshot(bytes: &[u8]) -> Result<Snapshot, SnapshotDecodeError> {
    let payload = bytes
        .strip_prefix(SNAPSHOT_MAGIC.as_slice())
        .ok_or(SnapshotDecodeError::UnknownFormat)?;
    let decompressed = zstd::decode_all(payload).context(DecompressSnafu)?;
    let (record, _): (SnapshotRecord, usize) =
        bincode::decode_from_slice(&decompressed, bincode::config::standard())
            .context(DecodeSnafu)?;

    Ok(record.into())
}

/// Keeps one snapshot per source root inside a cache directory.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    cache_dir: PathBuf,
}

impl SnapshotStore {
    /// Opens the store, creating the cache directory when it is missing.
    pub async fn open(cache_dir: &Path) -> Result<Self, SnapshotStoreError> {
        if !cache_dir.is_dir() {
            debug!(
                "Creating cache directory {}",
                cache_dir.best_effort_path_display()
            );
            fs::create_dir_all(cache_dir).await.context(CreateCacheDirSnafu {
                path: cache_dir.to_path_buf(),
            })?;
        }

        ensure!(
            cache_dir.is_readable_dir(),
            CacheDirNotReadableSnafu {
                path: cache_dir.to_path_buf(),
            }
        );
        ensure!(
            cache_dir.is_writable(),
            CacheDirNotWritableSnafu {
                path: cache_dir.to_path_buf(),
            }
        );

        let cache_dir = cache_dir.canonicalize().context(CreateCacheDirSnafu {
            path: cache_dir.to_path_buf(),
        })?;
        Ok(Self { cache_dir })
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Location of the snapshot for `source_root`.
    pub fn entry_path(&self, source_root: &Path) -> PathBuf {
        let key = ContentDigest::of_bytes(source_root.as_os_str().raw_bytes());
        self.cache_dir.join(key.to_string())
    }

    /// Loads the previous snapshot. Anything unusable counts as no snapshot.
    pub async fn load(&self, source_root: &Path) -> Option<Snapshot> {
        let path = self.entry_path(source_root);
        debug!("Reading snapshot from {}", path.best_effort_path_display());

        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                info!("No previous snapshot found ({e}), starting fresh");
                return None;
            }
        };

        let snapshot = match decode_snapshot(&bytes) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(
                    "Ignoring unreadable snapshot {}: {e}",
                    path.best_effort_path_display()
                );
                return None;
            }
        };

        if snapshot.source_root() != source_root {
            warn!(
                "Ignoring snapshot {}, it belongs to {}",
                path.best_effort_path_display(),
                snapshot.source_root().display()
            );
            return None;
        }

        debug!(
            "Loaded snapshot: {} files, {} directories",
            snapshot.files().len(),
            snapshot.directories().len()
        );
        Some(snapshot)
    }

    /// Replaces the stored snapshot for the snapshot's source root.
    pub async fn save(&self, snapshot: &Snapshot) -> Result<(), SnapshotStoreError> {
        let path = self.entry_path(snapshot.source_root());
        let temp_path = path.with_extension(format!("{}.tmp", std::process::id()));
        let bytes = encode_snapshot(snapshot)?;

        debug!(
            "Writing {} byte snapshot to {}",
            bytes.len(),
            path.best_effort_path_display()
        );
        if let Err(source) = fs::write(&temp_path, bytes).await.0 {
            let _ = fs::remove_file(&temp_path).await;
            return Err(SnapshotStoreError::WriteError { path, source });
        }

        fs::rename(&temp_path, &path)
            .await
            .context(WriteSnafu { path })?;
        Ok(())
    }
}

#[derive(Debug, Snafu)]
pub enum SnapshotStoreError {
    #[snafu(display("Failed to create cache directory {}", path.best_effort_path_display()))]
    CreateCacheDirError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Cache directory {} is not readable", path.best_effort_path_display()))]
    CacheDirNotReadable { path: PathBuf },
    #[snafu(display("Cache directory {} is not writable", path.best_effort_path_display()))]
    CacheDirNotWritable { path: PathBuf },
    #[snafu(display("Failed to encode snapshot"))]
    EncodeError { source: bincode::error::EncodeError },
    #[snafu(display("Failed to compress snapshot"))]
    CompressError { source: std::io::Error },
    #[snafu(display("Failed to write snapshot to {}", path.best_effort_path_display()))]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Snafu)]
pub enum SnapshotDecodeError {
    #[snafu(display("not a snapshot file"))]
    UnknownFormat,
    #[snafu(display("corrupt compressed data"))]
    DecompressError { source: std::io::Error },
    #[snafu(display("unsupported or corrupt snapshot record"))]
    DecodeError { source: bincode::error::DecodeError },
}
