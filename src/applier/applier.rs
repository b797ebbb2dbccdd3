use std::path::{Path, PathBuf};

use compio::fs;
use snafu::{ResultExt, Snafu};
use tracing::{debug, info};

use crate::applier::{ApplyReport, GroupOwnership, MaterializeMode, PathState};
use crate::ext::{AsyncTryInto, BestEffortPathExt};
use crate::fingerprint::{ContentDigest, DigestError};
use crate::reconciler::DeletionPlan;
use crate::snapshot::{RelativePath, Snapshot};

/// Permissions for directories created in the target, before the umask.
#[cfg(unix)]
const DIRECTORY_MODE: u32 = 0o770;

/// Brings a target directory in line with a source snapshot.
pub struct Applier<'a> {
    target_root: &'a Path,
    mode: MaterializeMode,
    group: &'a dyn GroupOwnership,
}

impl<'a> Applier<'a> {
    pub fn new(target_root: &'a Path, mode: MaterializeMode, group: &'a dyn GroupOwnership) -> Self {
        Self {
            target_root,
            mode,
            group,
        }
    }

    /// Deletes what the plan marks stale, then creates directories, files and
    /// group ownership for everything in `current`. Stops at the first I/O error.
    pub async fn apply(
        &self,
        plan: &DeletionPlan,
        current: &Snapshot,
    ) -> Result<ApplyReport, ApplyError> {
        let mut report = ApplyReport::default();

        info!(
            "Removing up to {} stale files and {} stale directories",
            plan.stale_files().len(),
            plan.stale_directories().len()
        );
        if plan.is_empty() {
            debug!("Nothing to delete from the target");
        } else {
            self.remove_stale_files(plan, &mut report).await?;
            self.remove_stale_directories(plan, &mut report).await?;
        }

        info!(
            "Materializing {} directories and {} files in {} mode",
            current.directories().len(),
            current.files().len(),
            self.mode
        );
        self.materialize_directories(current, &mut report).await?;
        for file in current.files() {
            self.materialize_file(current.source_root(), file, &mut report)
                .await?;
        }

        self.enforce_group(current, &mut report);
        Ok(report)
    }

    async fn remove_stale_files(
        &self,
        plan: &DeletionPlan,
        report: &mut ApplyReport,
    ) -> Result<(), ApplyError> {
        for file in plan.stale_files() {
            let path = file.to_native(self.target_root);

            match probe(&path)? {
                PathState::File | PathState::Symlink => {
                    fs::remove_file(&path)
                        .await
                        .context(RemoveFileSnafu { path: path.clone() })?;
                    debug!("Removed stale file {}", file);
                    report.removed_files += 1;
                }
                PathState::Directory => {
                    debug!("Stale file {} is a directory in the target, leaving it", file);
                }
                PathState::Absent => {}
            }
        }

        Ok(())
    }

    /// Relies on the plan listing children before parents.
    async fn remove_stale_directories(
        &self,
        plan: &DeletionPlan,
        report: &mut ApplyReport,
    ) -> Result<(), ApplyError> {
        for directory in plan.stale_directories() {
            let path = directory.to_native(self.target_root);

            if probe(&path)? != PathState::Directory {
                continue;
            }
            if !is_empty_directory(&path)? {
                debug!("Keeping stale directory {}, it is not empty", directory);
                report.kept_directories += 1;
                continue;
            }

            fs::remove_dir(&path)
                .await
                .context(RemoveDirectorySnafu { path: path.clone() })?;
            debug!("Removed stale directory {}", directory);
            report.removed_directories += 1;
        }

        Ok(())
    }

    /// Walks directories in ascending order, so parents exist before children.
    async fn materialize_directories(
        &self,
        current: &Snapshot,
        report: &mut ApplyReport,
    ) -> Result<(), ApplyError> {
        for directory in current.directories() {
            let path = directory.to_native(self.target_root);

            match probe(&path)? {
                PathState::Directory => continue,
                state @ (PathState::File | PathState::Symlink) => {
                    debug!("Replacing {} at {} with a directory", state, directory);
                    fs::remove_file(&path)
                        .await
                        .context(RemoveFileSnafu { path: path.clone() })?;
                }
                PathState::Absent => {}
            }

            create_directory(&path).context(CreateDirectorySnafu { path: path.clone() })?;
            debug!("Created directory {}", directory);
            report.created_directories += 1;
        }

        Ok(())
    }

    async fn materialize_file(
        &self,
        source_root: &Path,
        file: &RelativePath,
        report: &mut ApplyReport,
    ) -> Result<(), ApplyError> {
        let source = file.to_native(source_root);
        let target = file.to_native(self.target_root);
        let state = probe(&target)?;

        match self.mode {
            MaterializeMode::Copy => self.copy_file(&source, &target, state, report).await,
            MaterializeMode::Link => self.link_file(&source, &target, state, report).await,
        }
    }

    async fn copy_file(
        &self,
        source: &Path,
        target: &Path,
        state: PathState,
        report: &mut ApplyReport,
    ) -> Result<(), ApplyError> {
        let bytes = fs::read(source).await.context(ReadSourceSnafu {
            path: source.to_path_buf(),
        })?;

        match state {
            PathState::File => {
                let target_digest: ContentDigest =
                    target.async_try_into().await.context(CompareSnafu)?;
                if target_digest == ContentDigest::of_bytes(&bytes) {
                    report.unchanged_files += 1;
                    return Ok(());
                }
                // The old copy may be read-only, so write a fresh file
                remove_file(target).await?;
            }
            PathState::Symlink => remove_file(target).await?,
            PathState::Directory => remove_directory_tree(target)?,
            PathState::Absent => {}
        }

        let permissions = source
            .metadata()
            .context(ReadSourceSnafu {
                path: source.to_path_buf(),
            })?
            .permissions();
        fs::write(target, bytes).await.0.context(WriteFileSnafu {
            path: target.to_path_buf(),
        })?;
        std::fs::set_permissions(target, permissions).context(WriteFileSnafu {
            path: target.to_path_buf(),
        })?;

        debug!("Copied {}", target.display());
        report.copied_files += 1;
        Ok(())
    }

    async fn link_file(
        &self,
        source: &Path,
        target: &Path,
        state: PathState,
        report: &mut ApplyReport,
    ) -> Result<(), ApplyError> {
        match state {
            PathState::Symlink => {
                if std::fs::read_link(target).is_ok_and(|link| link == source) {
                    report.unchanged_files += 1;
                    return Ok(());
                }
                remove_file(target).await?;
            }
            PathState::File => remove_file(target).await?,
            PathState::Directory => remove_directory_tree(target)?,
            PathState::Absent => {}
        }

        create_symlink(source, target).context(CreateLinkSnafu {
            path: target.to_path_buf(),
        })?;
        debug!("Linked {} -> {}", target.display(), source.display());
        report.linked_files += 1;
        Ok(())
    }

    fn enforce_group(&self, current: &Snapshot, report: &mut ApplyReport) {
        for entry in current.directories().iter().chain(current.files()) {
            if self.group.enforce(&entry.to_native(self.target_root)) {
                report.regrouped_entries += 1;
            }
        }
    }
}

fn probe(path: &Path) -> Result<PathState, ApplyError> {
    PathState::probe(path).context(ProbeSnafu {
        path: path.to_path_buf(),
    })
}

fn is_empty_directory(path: &Path) -> Result<bool, ApplyError> {
    let mut entries = std::fs::read_dir(path).context(ReadDirectorySnafu {
        path: path.to_path_buf(),
    })?;
    Ok(entries.next().is_none())
}

async fn remove_file(path: &Path) -> Result<(), ApplyError> {
    fs::remove_file(path).await.context(RemoveFileSnafu {
        path: path.to_path_buf(),
    })
}

fn remove_directory_tree(path: &Path) -> Result<(), ApplyError> {
    debug!("Removing directory {} to make room for a file", path.display());
    std::fs::remove_dir_all(path).context(RemoveDirectorySnafu {
        path: path.to_path_buf(),
    })
}

fn create_directory(path: &Path) -> std::io::Result<()> {
    let mut builder = std::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(DIRECTORY_MODE);
    }
    builder.create(path)
}

#[cfg(unix)]
fn create_symlink(source: &Path, target: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(source, target)
}

#[cfg(windows)]
fn create_symlink(source: &Path, target: &Path) -> std::io::Result<()> {
    std::os::windows::fs::symlink_file(source, target)
}

#[derive(Debug, Snafu)]
pub enum ApplyError {
    #[snafu(display("Failed to inspect {}", path.best_effort_path_display()))]
    ProbeError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Failed to remove file {}", path.best_effort_path_display()))]
    RemoveFileError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Failed to remove directory {}", path.best_effort_path_display()))]
    RemoveDirectoryError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Failed to list directory {}", path.best_effort_path_display()))]
    ReadDirectoryError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Failed to create directory {}", path.best_effort_path_display()))]
    CreateDirectoryError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Failed to read source file {}", path.best_effort_path_display()))]
    ReadSourceError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Failed to compare target file with its source"))]
    CompareError { source: DigestError },
    #[snafu(display("Failed to write {}", path.best_effort_path_display()))]
    WriteFileError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Failed to create symlink {}", path.best_effort_path_display()))]
    CreateLinkError {
        path: PathBuf,
        source: std::io::Error,
    },
}
