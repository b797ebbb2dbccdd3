use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::snapshot::RelativePath;

/// The shape of a directory tree at one point in time.
///
/// Built once per run and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    source_root: PathBuf,
    files: BTreeSet<RelativePath>,
    directories: BTreeSet<RelativePath>,
}

impl Snapshot {
    /// Paths listed as both file and directory are kept as directories only.
    pub fn new(
        source_root: impl Into<PathBuf>,
        files: impl IntoIterator<Item = RelativePath>,
        directories: impl IntoIterator<Item = RelativePath>,
    ) -> Self {
        let directories: BTreeSet<RelativePath> = directories.into_iter().collect();
        let files = files
            .into_iter()
            .filter(|file| {
                let clashes = directories.contains(file);
                if clashes {
                    warn!("Path '{}' is listed as both file and directory", file);
                }
                !clashes
            })
            .collect();

        Snapshot {
            source_root: source_root.into(),
            files,
            directories,
        }
    }

    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    pub fn files(&self) -> &BTreeSet<RelativePath> {
        &self.files
    }

    pub fn directories(&self) -> &BTreeSet<RelativePath> {
        &self.directories
    }

    pub fn contains_file(&self, path: &RelativePath) -> bool {
        self.files.contains(path)
    }

    pub fn contains_directory(&self, path: &RelativePath) -> bool {
        self.directories.contains(path)
    }
}

#[cfg(test)]
pub(crate) fn rel(path: &str) -> RelativePath {
    RelativePath::from_relative(Path::new(path)).expect("test paths are relative")
}
