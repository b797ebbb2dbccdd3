use std::path::{Path, PathBuf};

use compio::fs;
use saphyr::{LoadableYamlNode, Scalar, Yaml};
use snafu::prelude::*;
use tracing::debug;

use crate::ext::BestEffortPathExt;

/// Looked up in the source root when no file is given explicitly.
pub const CONFIG_FILE_NAME: &str = ".treesync.yaml";

/// Settings read from a YAML file. Every field is optional; command-line
/// flags take precedence over whatever is set here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    pub group: Option<String>,
    pub links: Option<bool>,
    pub cache_dir: Option<PathBuf>,
    pub ignore_dot_files: Option<bool>,
    pub ignore_vcs: Option<bool>,
}

impl ConfigFile {
    /// Reads `explicit` when given, otherwise the default file in the source
    /// root if there is one. Returns the path that was read alongside.
    pub async fn discover(
        explicit: Option<&Path>,
        source_root: &Path,
    ) -> Result<(Self, Option<PathBuf>), ConfigFileError> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let default_path = source_root.join(CONFIG_FILE_NAME);
                if !default_path.is_file() {
                    debug!("No config file found, using defaults");
                    return Ok((Self::default(), None));
                }
                default_path
            }
        };

        let config = Self::from_path(&path).await?;
        Ok((config, Some(path)))
    }

    pub async fn from_path(path: &Path) -> Result<Self, ConfigFileError> {
        debug!("Reading config file: {}", path.best_effort_path_display());
        let bytes = fs::read(path).await.context(ReadSnafu {
            file_path: path.best_effort_path_display(),
        })?;
        let contents = String::from_utf8(bytes).context(EncodingSnafu {
            file_path: path.best_effort_path_display(),
        })?;

        contents.as_str().try_into()
    }

    fn string_value(key: &str, value: &Yaml) -> Result<String, ConfigFileError> {
        value
            .as_str()
            .map(str::to_string)
            .context(InvalidValueSnafu {
                key,
                expected: "a string",
            })
    }

    fn bool_value(key: &str, value: &Yaml) -> Result<bool, ConfigFileError> {
        match value {
            Yaml::Value(Scalar::Boolean(flag)) => Ok(*flag),
            _ => InvalidValueSnafu {
                key,
                expected: "a boolean",
            }
            .fail(),
        }
    }
}

impl TryFrom<&str> for ConfigFile {
    type Error = ConfigFileError;

    fn try_from(contents: &str) -> Result<Self, Self::Error> {
        let documents = Yaml::load_from_str(contents).context(ParseSnafu)?;
        let Some(document) = documents.first() else {
            return Ok(Self::default());
        };
        let top_level = document.as_mapping().context(TopLevelNotMapSnafu)?;

        let mut config = Self::default();
        for (key, value) in top_level.iter() {
            let Some(key) = key.as_str() else {
                debug!("Skipping non-string config key: {:?}", key);
                continue;
            };

            match key {
                "group" => config.group = Some(Self::string_value(key, value)?),
                "links" => config.links = Some(Self::bool_value(key, value)?),
                "cache_dir" => config.cache_dir = Some(Self::string_value(key, value)?.into()),
                "ignore_dot_files" => config.ignore_dot_files = Some(Self::bool_value(key, value)?),
                "ignore_vcs" => config.ignore_vcs = Some(Self::bool_value(key, value)?),
                other => debug!("Ignoring unknown config key '{}'", other),
            }
        }

        Ok(config)
    }
}

#[derive(Debug, Snafu)]
pub enum ConfigFileError {
    #[snafu(display("Failed to read the config file: {}", file_path))]
    ReadError {
        file_path: String,
        source: std::io::Error,
    },
    #[snafu(display("Config file {} is not valid UTF-8", file_path))]
    EncodingError {
        file_path: String,
        source: std::string::FromUtf8Error,
    },
    #[snafu(display("Failed to parse the config file"))]
    ParseError { source: saphyr::ScanError },
    #[snafu(display("Top level of config should be a map"))]
    TopLevelNotMap,
    #[snafu(display("Config key '{}' should be {}", key, expected))]
    InvalidValue { key: String, expected: String },
}
