use tracing::debug;

use crate::snapshot::{RelativePath, Snapshot};

/// Target paths that disappeared from the source since the previous run.
///
/// Stale files come first and in no particular order. Stale directories are
/// ordered by descending path, so a directory always precedes its parent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletionPlan {
    stale_files: Vec<RelativePath>,
    stale_directories: Vec<RelativePath>,
}

impl DeletionPlan {
    pub fn plan(previous: Option<&Snapshot>, current: &Snapshot) -> Self {
        let Some(previous) = previous else {
            debug!("No previous snapshot, nothing to delete");
            return Self::default();
        };

        let stale_files = previous
            .files()
            .iter()
            .filter(|file| !current.contains_file(file))
            .cloned()
            .collect::<Vec<_>>();

        let stale_directories = previous
            .directories()
            .iter()
            .rev()
            .filter(|directory| !current.contains_directory(directory))
            .cloned()
            .collect::<Vec<_>>();

        debug!(
            "Planned deletion of {} stale files and {} stale directories",
            stale_files.len(),
            stale_directories.len()
        );
        DeletionPlan {
            stale_files,
            stale_directories,
        }
    }

    pub fn stale_files(&self) -> &[RelativePath] {
        &self.stale_files
    }

    pub fn stale_directories(&self) -> &[RelativePath] {
        &self.stale_directories
    }

    pub fn is_empty(&self) -> bool {
        self.stale_files.is_empty() && self.stale_directories.is_empty()
    }
}
