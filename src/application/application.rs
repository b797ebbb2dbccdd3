use std::path::Path;

use colored::Colorize;
use snafu::Snafu;
use snafu::prelude::*;
use supports_color::Stream;
use tracing::{debug, info};

use crate::applier::{Applier, ApplyError, ApplyReport, group_ownership_for};
use crate::application::{RuntimeConfig, RuntimeConfigError};
use crate::cli::Cli;
use crate::ext::AsyncTryInto;
use crate::reconciler::DeletionPlan;
use crate::snapshot::{ScanError, SnapshotStore, SnapshotStoreError, TreeScanner};

pub struct Application;

impl Application {
    pub async fn run(cli: Cli) -> Result<ApplyReport, ApplicationError> {
        let config: RuntimeConfig = cli.async_try_into().await.context(ValidationSnafu)?;
        debug!("Resolved runtime config: {:?}", config);

        let report = Self::sync(&config).await?;
        print_success(&config.target);

        Ok(report)
    }

    /// One full pass: scan, reconcile against the stored snapshot, apply, and
    /// persist the new snapshot. The snapshot is only written once the target
    /// has been fully updated.
    pub async fn sync(config: &RuntimeConfig) -> Result<ApplyReport, ApplicationError> {
        let store = SnapshotStore::open(&config.cache_dir)
            .await
            .context(CacheDirSnafu)?;

        let snapshot_path = store.entry_path(&config.source);
        let scanner = TreeScanner::new(config.scan_options(store.cache_dir(), &snapshot_path));
        let current = scanner.scan(&config.source).context(SourceScanSnafu)?;

        let previous = store.load(&config.source).await;
        let plan = DeletionPlan::plan(previous.as_ref(), &current);

        let group = group_ownership_for(config.group.as_deref());
        let report = Applier::new(&config.target, config.mode, group.as_ref())
            .apply(&plan, &current)
            .await
            .context(TargetUpdateSnafu)?;
        info!("Target updated with {} changes: {}", report.writes(), report);

        store.save(&current).await.context(SnapshotSaveSnafu)?;

        Ok(report)
    }
}

fn print_success(target: &Path) {
    let message = format!("Target directory \"{}\" has been updated", target.display());
    if supports_color::on(Stream::Stdout).is_some() {
        println!("{}", message.green());
    } else {
        println!("{message}");
    }
}

#[derive(Debug, Snafu)]
pub enum ApplicationError {
    #[snafu(display("Critical failure encountered while validating arguments"))]
    ValidationError { source: RuntimeConfigError },
    #[snafu(display("Critical failure encountered while preparing the cache directory"))]
    CacheDirError { source: SnapshotStoreError },
    #[snafu(display("Critical failure encountered while scanning the source directory"))]
    SourceScanError { source: ScanError },
    #[snafu(display("Critical failure encountered while updating the target directory"))]
    TargetUpdateError { source: ApplyError },
    #[snafu(display("Critical failure encountered while saving the snapshot"))]
    SnapshotSaveError { source: SnapshotStoreError },
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use super::*;
    use crate::applier::MaterializeMode;
    use crate::application::data::LogLevel;
    use tempfile::TempDir;

    struct Fixture {
        source: TempDir,
        target: TempDir,
        cache: TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                source: TempDir::new().unwrap(),
                target: TempDir::new().unwrap(),
                cache: TempDir::new().unwrap(),
            }
        }

        fn config(&self, mode: MaterializeMode) -> RuntimeConfig {
            RuntimeConfig {
                source: self.source.path().canonicalize().unwrap(),
                target: self.target.path().canonicalize().unwrap(),
                cache_dir: self.cache.path().to_path_buf(),
                config_file: None,
                group: None,
                mode,
                ignore_dot_files: false,
                ignore_vcs: false,
            }
        }

        fn write_source(&self, relative: &str, contents: &str) {
            let path = self.source.path().join(relative);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, contents).unwrap();
        }

        fn target(&self, relative: &str) -> PathBuf {
            self.target.path().join(relative)
        }

        async fn snapshot_path(&self, config: &RuntimeConfig) -> PathBuf {
            let store = SnapshotStore::open(self.cache.path()).await.unwrap();
            store.entry_path(&config.source)
        }

        async fn stored_snapshot_bytes(&self, config: &RuntimeConfig) -> Vec<u8> {
            fs::read(self.snapshot_path(config).await).unwrap()
        }
    }

    #[compio::test]
    async fn test_first_run_copies_everything_and_stores_snapshot() {
        let fixture = Fixture::new();
        fixture.write_source("a.txt", "alpha");
        fixture.write_source("dir/b.txt", "beta");
        let config = fixture.config(MaterializeMode::Copy);

        let report = Application::sync(&config).await.unwrap();

        assert_eq!(report.copied_files, 2);
        assert_eq!(fs::read_to_string(fixture.target("a.txt")).unwrap(), "alpha");
        assert_eq!(fs::read_to_string(fixture.target("dir/b.txt")).unwrap(), "beta");

        let store = SnapshotStore::open(fixture.cache.path()).await.unwrap();
        let stored = store.load(&config.source).await.unwrap();
        let files: Vec<_> = stored.files().iter().map(|file| file.to_string()).collect();
        let directories: Vec<_> = stored.directories().iter().map(|dir| dir.to_string()).collect();
        assert_eq!(files, vec!["a.txt", "dir/b.txt"]);
        assert_eq!(directories, vec!["dir"]);
    }

    #[compio::test]
    async fn test_entries_removed_from_source_are_removed_from_target() {
        let fixture = Fixture::new();
        fixture.write_source("a.txt", "alpha");
        fixture.write_source("old.txt", "old");
        fixture.write_source("olddir/x.txt", "x");
        let config = fixture.config(MaterializeMode::Copy);
        Application::sync(&config).await.unwrap();

        fs::remove_file(fixture.source.path().join("old.txt")).unwrap();
        fs::remove_dir_all(fixture.source.path().join("olddir")).unwrap();
        let report = Application::sync(&config).await.unwrap();

        assert_eq!(report.removed_files, 2);
        assert_eq!(report.removed_directories, 1);
        assert!(!fixture.target("old.txt").exists());
        assert!(!fixture.target("olddir").exists());
        assert!(fixture.target("a.txt").exists());

        let store = SnapshotStore::open(fixture.cache.path()).await.unwrap();
        let stored = store.load(&config.source).await.unwrap();
        assert_eq!(stored.files().len(), 1);
        assert!(stored.directories().is_empty());
    }

    #[compio::test]
    async fn test_second_run_without_changes_writes_nothing() {
        let fixture = Fixture::new();
        fixture.write_source("a.txt", "alpha");
        fixture.write_source("dir/nested/b.txt", "beta");
        let config = fixture.config(MaterializeMode::Copy);

        Application::sync(&config).await.unwrap();
        let first_snapshot = fixture.stored_snapshot_bytes(&config).await;
        let report = Application::sync(&config).await.unwrap();
        let second_snapshot = fixture.stored_snapshot_bytes(&config).await;

        assert_eq!(report.writes(), 0);
        assert_eq!(report.unchanged_files, 2);
        assert_eq!(first_snapshot, second_snapshot);
    }

    #[compio::test]
    async fn test_target_only_files_are_left_alone() {
        let fixture = Fixture::new();
        fixture.write_source("a.txt", "alpha");
        fs::write(fixture.target("local.txt"), "mine").unwrap();
        let config = fixture.config(MaterializeMode::Copy);

        Application::sync(&config).await.unwrap();
        Application::sync(&config).await.unwrap();

        assert_eq!(fs::read_to_string(fixture.target("local.txt")).unwrap(), "mine");
    }

    #[compio::test]
    async fn test_cache_inside_source_is_not_mirrored() {
        let fixture = Fixture::new();
        fixture.write_source("a.txt", "alpha");
        let mut config = fixture.config(MaterializeMode::Copy);
        config.cache_dir = config.source.join(".cache");

        Application::sync(&config).await.unwrap();
        Application::sync(&config).await.unwrap();

        assert!(config.cache_dir.is_dir());
        assert!(!fixture.target(".cache").exists());
        assert!(fixture.target("a.txt").exists());
    }

    #[compio::test]
    async fn test_corrupt_snapshot_counts_as_first_run() {
        let fixture = Fixture::new();
        fixture.write_source("a.txt", "alpha");
        let config = fixture.config(MaterializeMode::Copy);
        Application::sync(&config).await.unwrap();
        fs::write(fixture.snapshot_path(&config).await, b"garbage").unwrap();

        let report = Application::sync(&config).await.unwrap();

        assert_eq!(report.removed_files, 0);
        assert!(fixture.target("a.txt").exists());
    }

    #[cfg(unix)]
    #[compio::test]
    async fn test_switching_to_link_mode_replaces_copies() {
        let fixture = Fixture::new();
        fixture.write_source("a.txt", "alpha");
        Application::sync(&fixture.config(MaterializeMode::Copy))
            .await
            .unwrap();

        let config = fixture.config(MaterializeMode::Link);
        let report = Application::sync(&config).await.unwrap();

        assert_eq!(report.linked_files, 1);
        assert_eq!(
            fs::read_link(fixture.target("a.txt")).unwrap(),
            config.source.join("a.txt")
        );
    }

    #[compio::test]
    async fn test_run_rejects_missing_target_before_touching_the_cache() {
        let fixture = Fixture::new();
        let cache_dir = fixture.cache.path().join("never-created");
        let cli = Cli {
            source: fixture.source.path().to_path_buf(),
            target: fixture.target.path().join("missing"),
            group: None,
            links: false,
            cache_dir: Some(cache_dir.clone()),
            config: None,
            log_level: LogLevel::Silent,
        };

        let result = Application::run(cli).await;

        assert!(matches!(result, Err(ApplicationError::ValidationError { .. })));
        assert!(!cache_dir.exists());
    }

    #[compio::test]
    async fn test_cache_dir_equal_to_source_is_not_mirrored() {
        let fixture = Fixture::new();
        fixture.write_source("a.txt", "alpha");
        let mut config = fixture.config(MaterializeMode::Copy);
        config.cache_dir = config.source.clone();

        Application::sync(&config).await.unwrap();
        Application::sync(&config).await.unwrap();

        let mirrored: Vec<_> = fs::read_dir(&config.target)
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(mirrored, vec![std::ffi::OsString::from("a.txt")]);
    }

    #[compio::test]
    async fn test_failed_snapshot_save_comes_after_target_update() {
        let fixture = Fixture::new();
        fixture.write_source("a.txt", "alpha");
        let config = fixture.config(MaterializeMode::Copy);
        let snapshot_path = fixture.snapshot_path(&config).await;
        fs::create_dir_all(snapshot_path.join("occupied")).unwrap();

        let result = Application::sync(&config).await;

        assert!(matches!(result, Err(ApplicationError::SnapshotSaveError { .. })));
        assert_eq!(fs::read_to_string(fixture.target("a.txt")).unwrap(), "alpha");
    }

    #[compio::test]
    async fn test_failed_target_update_saves_no_snapshot() {
        let fixture = Fixture::new();
        fixture.write_source("a.txt", "alpha");
        let mut config = fixture.config(MaterializeMode::Copy);
        let not_a_directory = fixture.target("plain-file");
        fs::write(&not_a_directory, "x").unwrap();
        config.target = not_a_directory;

        let result = Application::sync(&config).await;

        assert!(matches!(result, Err(ApplicationError::TargetUpdateError { .. })));
        assert!(!fixture.snapshot_path(&config).await.exists());
    }

    #[cfg(unix)]
    #[compio::test]
    async fn test_names_that_are_not_utf8_are_mirrored() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let fixture = Fixture::new();
        let name = OsStr::from_bytes(b"caf\xe9.txt");
        fs::write(fixture.source.path().join(name), "menu").unwrap();
        let config = fixture.config(MaterializeMode::Copy);

        Application::sync(&config).await.unwrap();
        fs::remove_file(fixture.source.path().join(name)).unwrap();
        assert_eq!(fs::read_to_string(fixture.target.path().join(name)).unwrap(), "menu");

        let report = Application::sync(&config).await.unwrap();

        assert_eq!(report.removed_files, 1);
        assert!(!fixture.target.path().join(name).exists());
    }

    #[cfg(unix)]
    #[compio::test]
    async fn test_source_root_that_is_not_utf8_keeps_its_snapshot() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let fixture = Fixture::new();
        let source = fixture
            .source
            .path()
            .join(OsStr::from_bytes(b"src\xff"));
        fs::create_dir(&source).unwrap();
        fs::write(source.join("a.txt"), "alpha").unwrap();
        fs::write(source.join("old.txt"), "old").unwrap();
        let mut config = fixture.config(MaterializeMode::Copy);
        config.source = source.canonicalize().unwrap();

        Application::sync(&config).await.unwrap();
        fs::remove_file(source.join("old.txt")).unwrap();
        let report = Application::sync(&config).await.unwrap();

        assert_eq!(report.removed_files, 1);
        assert!(!fixture.target("old.txt").exists());
        assert!(fixture.target("a.txt").exists());
    }
}
