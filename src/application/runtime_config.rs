use std::path::{Path, PathBuf};

use snafu::prelude::*;

use crate::applier::MaterializeMode;
use crate::cli::Cli;
use crate::config::{ConfigFile, ConfigFileError};
use crate::ext::{AccessExt, AsyncTryFrom, BestEffortPathExt};
use crate::snapshot::ScanOptions;

const DEFAULT_CACHE_DIR_NAME: &str = ".cache";

/// Everything a run needs, validated and with paths made absolute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub source: PathBuf,
    pub target: PathBuf,
    pub cache_dir: PathBuf,
    /// Config file that was read, if any
    pub config_file: Option<PathBuf>,
    pub group: Option<String>,
    pub mode: MaterializeMode,
    pub ignore_dot_files: bool,
    pub ignore_vcs: bool,
}

impl RuntimeConfig {
    /// Scanner settings for the source. The tool's own cache directory,
    /// snapshot file and config file are never mirrored, even when the cache
    /// directory is the source itself.
    pub fn scan_options(&self, cache_dir: &Path, snapshot_path: &Path) -> ScanOptions {
        let excluded = [cache_dir.to_path_buf(), snapshot_path.to_path_buf()]
            .into_iter()
            .chain(self.config_file.clone())
            .collect();

        ScanOptions {
            excluded,
            ignore_dot_files: self.ignore_dot_files,
            ignore_vcs: self.ignore_vcs,
        }
    }
}

/// Resolves the run configuration from command-line arguments, merging in the
/// config file. Nothing is modified on disk.
impl AsyncTryFrom<Cli> for RuntimeConfig {
    type Error = RuntimeConfigError;

    async fn async_try_from(cli: Cli) -> Result<Self, Self::Error> {
        let source = validate_source(&cli.source)?;
        let target = validate_target(&cli.target)?;
        ensure!(
            !target.starts_with(&source),
            TargetInsideSourceSnafu {
                target: target.clone(),
                source_dir: source.clone(),
            }
        );

        let (file, config_file) = ConfigFile::discover(cli.config.as_deref(), &source)
            .await
            .context(ConfigSnafu)?;
        let config_file = config_file.map(|path| path.canonicalize().unwrap_or(path));

        let cache_dir = match (cli.cache_dir, file.cache_dir) {
            (Some(dir), _) => std::path::absolute(&dir).context(CanonicalizeSnafu { path: dir })?,
            (None, Some(dir)) => source.join(dir),
            (None, None) => source.join(DEFAULT_CACHE_DIR_NAME),
        };

        Ok(RuntimeConfig {
            cache_dir,
            config_file,
            group: cli.group.or(file.group),
            mode: MaterializeMode::from_links_flag(cli.links || file.links.unwrap_or(false)),
            ignore_dot_files: file.ignore_dot_files.unwrap_or(false),
            ignore_vcs: file.ignore_vcs.unwrap_or(false),
            source,
            target,
        })
    }
}

fn validate_source(path: &Path) -> Result<PathBuf, RuntimeConfigError> {
    ensure!(path.exists(), SourceMissingSnafu { path });
    ensure!(path.is_dir(), SourceNotDirectorySnafu { path });
    ensure!(path.is_readable_dir(), SourceNotReadableSnafu { path });
    path.canonicalize().context(CanonicalizeSnafu { path })
}

fn validate_target(path: &Path) -> Result<PathBuf, RuntimeConfigError> {
    ensure!(path.exists(), TargetMissingSnafu { path });
    ensure!(path.is_dir(), TargetNotDirectorySnafu { path });
    ensure!(path.is_writable(), TargetNotWritableSnafu { path });
    path.canonicalize().context(CanonicalizeSnafu { path })
}

#[derive(Debug, Snafu)]
pub enum RuntimeConfigError {
    #[snafu(display("Source directory \"{}\" does not exist", path.best_effort_path_display()))]
    SourceMissing { path: PathBuf },
    #[snafu(display("Source \"{}\" is not a directory", path.best_effort_path_display()))]
    SourceNotDirectory { path: PathBuf },
    #[snafu(display("Source directory \"{}\" is not readable", path.best_effort_path_display()))]
    SourceNotReadable { path: PathBuf },
    #[snafu(display("Target directory \"{}\" does not exist", path.best_effort_path_display()))]
    TargetMissing { path: PathBuf },
    #[snafu(display("Target \"{}\" is not a directory", path.best_effort_path_display()))]
    TargetNotDirectory { path: PathBuf },
    #[snafu(display("Target directory \"{}\" is not writable", path.best_effort_path_display()))]
    TargetNotWritable { path: PathBuf },
    #[snafu(display(
        "Target directory \"{}\" lies inside source directory \"{}\"",
        target.display(),
        source_dir.display()
    ))]
    TargetInsideSource { target: PathBuf, source_dir: PathBuf },
    #[snafu(display("Failed to resolve \"{}\"", path.best_effort_path_display()))]
    CanonicalizeError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Invalid config file"))]
    ConfigError { source: ConfigFileError },
}
