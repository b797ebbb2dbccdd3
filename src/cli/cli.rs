use std::path::PathBuf;

use clap::Parser;

use crate::application::data::LogLevel;

/// Mirror a source directory tree into a target directory
#[derive(Parser, Debug, Clone)]
#[command(version)]
pub struct Cli {
    /// The directory files will be read from
    pub source: PathBuf,
    /// The directory the source files will be placed in
    pub target: PathBuf,

    /// The group ownership of synced files and directories
    #[clap(long, short)]
    pub group: Option<String>,

    /// Symlink files to the source instead of copying them
    #[clap(long, short)]
    pub links: bool,

    /// Directory where the previous run's snapshot is kept [default: <SOURCE>/.cache]
    #[clap(long, short)]
    pub cache_dir: Option<PathBuf>,

    /// YAML config file [default: <SOURCE>/.treesync.yaml when present]
    #[clap(long)]
    pub config: Option<PathBuf>,

    #[clap(long, default_value = "warn", value_enum)]
    pub log_level: LogLevel,
}
