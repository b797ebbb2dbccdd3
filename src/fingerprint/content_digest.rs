use std::hash::Hasher;
use std::path::{Path, PathBuf};

use compio::fs;
use derive_more::Display;
use metrohash::MetroHash128;
use snafu::{ResultExt, Snafu};

use crate::ext::{AsyncTryFrom, BestEffortPathExt};

/// 128-bit MetroHash of a byte sequence.
///
/// Two files are considered identical when their digests match. Displayed as
/// 32 lowercase hex digits, which is also the form used for cache file names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[display("{_0:016x}{_1:016x}")]
pub struct ContentDigest(u64, u64);

impl ContentDigest {
    pub fn of_bytes(bytes: &[u8]) -> Self {
        let mut hasher = MetroHash128::default();
        hasher.write(bytes);
        let (high, low) = hasher.finish128();
        ContentDigest(high, low)
    }
}

impl AsyncTryFrom<&Path> for ContentDigest {
    type Error = DigestError;

    async fn async_try_from(path: &Path) -> Result<Self, Self::Error> {
        let metadata = path.metadata().context(PathSnafu {
            path: path.to_path_buf(),
        })?;

        if metadata.is_dir() {
            return Err(DigestError::DirectoryError {
                path: path.to_path_buf(),
            });
        }

        let bytes = fs::read(path).await.context(PathSnafu {
            path: path.to_path_buf(),
        })?;

        Ok(ContentDigest::of_bytes(&bytes))
    }
}

#[derive(Debug, Snafu)]
pub enum DigestError {
    #[snafu(display("Failed to read {} for hashing", path.best_effort_path_display()))]
    PathError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Cannot hash {}, it is a directory", path.best_effort_path_display()))]
    DirectoryError { path: PathBuf },
}
