use std::path::PathBuf;

use thiserror::Error;

/// Failures while locating, reading or writing `config.toml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot create config directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Writing the temp file or renaming it over the target failed.
    #[error("Cannot write config {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Config {path} is not valid TOML for this version: {source}")]
    ParseToml {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Cannot encode config for {path}: {source}")]
    SerializeToml {
        path: PathBuf,
        source: toml::ser::Error,
    },
    /// Neither `YACHTCRM_CONFIG_HOME` nor an OS config directory is available.
    #[error("No config directory available; set YACHTCRM_CONFIG_HOME")]
    NoConfigDir,
}
