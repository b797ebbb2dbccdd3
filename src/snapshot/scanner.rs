use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use snafu::Snafu;
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

use crate::ext::BestEffortPathExt;
use crate::snapshot::{RelativePath, Snapshot};

/// Directory names skipped when `ignore_vcs` is set.
const VCS_DIRECTORIES: &[&str] = &[
    ".git",
    ".svn",
    "_svn",
    "CVS",
    "_darcs",
    ".arch-params",
    ".monotone",
    ".bzr",
    ".hg",
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanOptions {
    /// Absolute paths skipped together with everything below them
    pub excluded: Vec<PathBuf>,
    pub ignore_dot_files: bool,
    pub ignore_vcs: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryKind {
    File,
    Directory,
}

/// Enumerates a directory tree into a [`Snapshot`].
pub struct TreeScanner {
    options: ScanOptions,
}

impl TreeScanner {
    pub fn new(options: ScanOptions) -> Self {
        Self { options }
    }

    pub fn scan(&self, root: &Path) -> Result<Snapshot, ScanError> {
        let metadata = fs::metadata(root).map_err(|source| match source.kind() {
            ErrorKind::NotFound => ScanError::NotFound {
                path: root.to_path_buf(),
            },
            _ => ScanError::NotReadable {
                path: root.to_path_buf(),
                source,
            },
        })?;
        if !metadata.is_dir() {
            return Err(ScanError::NotADirectory {
                path: root.to_path_buf(),
            });
        }

        let mut files = Vec::new();
        let mut directories = Vec::new();

        let walker = WalkDir::new(root)
            .min_depth(1)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| self.is_included(entry));

        for entry in walker {
            let entry = entry.map_err(|error| ScanError::NotReadable {
                path: error
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| root.to_path_buf()),
                source: error.into(),
            })?;

            let Some(kind) = Self::classify(&entry) else {
                continue;
            };
            let Some(relative) = RelativePath::from_root(root, entry.path()) else {
                warn!(
                    "Skipping {}, it is not below the scanned root",
                    entry.path().best_effort_path_display()
                );
                continue;
            };

            match kind {
                EntryKind::File => files.push(relative),
                EntryKind::Directory => directories.push(relative),
            }
        }

        info!(
            "Scanned {}: {} files, {} directories",
            root.best_effort_path_display(),
            files.len(),
            directories.len()
        );
        Ok(Snapshot::new(root, files, directories))
    }

    fn is_included(&self, entry: &DirEntry) -> bool {
        if self.options.excluded.iter().any(|excluded| excluded == entry.path()) {
            debug!("Excluding {}", entry.path().display());
            return false;
        }

        let name = entry.file_name().to_string_lossy();
        if self.options.ignore_dot_files && name.starts_with('.') {
            return false;
        }
        if self.options.ignore_vcs
            && entry.file_type().is_dir()
            && VCS_DIRECTORIES.contains(&name.as_ref())
        {
            return false;
        }

        true
    }

    /// Symlinks are classified by what they point at and never descended into.
    fn classify(entry: &DirEntry) -> Option<EntryKind> {
        let file_type = entry.file_type();

        if file_type.is_dir() {
            return Some(EntryKind::Directory);
        }
        if file_type.is_file() {
            return Some(EntryKind::File);
        }
        if file_type.is_symlink() {
            return match fs::metadata(entry.path()) {
                Ok(metadata) if metadata.is_dir() => Some(EntryKind::Directory),
                Ok(metadata) if metadata.is_file() => Some(EntryKind::File),
                Ok(_) => None,
                Err(_) => {
                    warn!(
                        "Skipping dangling symlink {}",
                        entry.path().best_effort_path_display()
                    );
                    None
                }
            };
        }

        debug!("Skipping special file {}", entry.path().display());
        None
    }
}

#[derive(Debug, Snafu)]
pub enum ScanError {
    #[snafu(display("Directory {} does not exist", path.best_effort_path_display()))]
    NotFound { path: PathBuf },
    #[snafu(display("{} is not a directory", path.best_effort_path_display()))]
    NotADirectory { path: PathBuf },
    #[snafu(display("Cannot read {}", path.best_effort_path_display()))]
    NotReadable {
        path: PathBuf,
        source: std::io::Error,
    },
}
