use std::io::Write;
use std::path::{Path, PathBuf};

use crate::app_dirs;

use super::{ConfigError, PredictionConfig};

/// Default filename used to store the configuration.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Resolve the configuration file path, ensuring the parent directory exists.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    let dir = app_dirs::app_root_dir().map_err(map_app_dir_error)?;
    Ok(dir.join(CONFIG_FILE_NAME))
}

/// Load configuration from the app root, returning defaults if missing.
pub fn load_or_default() -> Result<PredictionConfig, ConfigError> {
    load_from(&config_path()?)
}

/// Load configuration from a specific file, returning defaults if it does not exist.
pub fn load_from(path: &Path) -> Result<PredictionConfig, ConfigError> {
    if !path.exists() {
        return Ok(PredictionConfig::default());
    }
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str::<PredictionConfig>(&text)
        .map_err(|source| ConfigError::ParseToml {
            path: path.to_path_buf(),
            source,
        })
        .map(PredictionConfig::normalized)
}

/// Save configuration to a specific path, creating parent directories as needed.
pub fn save_to_path(config: &PredictionConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let data = toml::to_string_pretty(config).map_err(|source| ConfigError::SerializeToml {
        path: path.to_path_buf(),
        source,
    })?;
    atomic_write(path, data.as_bytes())
}

/// Write through a sibling temp file and rename so readers never see a partial file.
fn atomic_write(path: &Path, data: &[u8]) -> Result<(), ConfigError> {
    let write_err = |at: &Path, source| ConfigError::Write {
        path: at.to_path_buf(),
        source,
    };
    let (tmp_path, mut file) = create_temp_sibling(path).map_err(|err| write_err(path, err))?;
    let written = file.write_all(data).and_then(|()| file.sync_all());
    drop(file);
    let outcome = written
        .map_err(|err| write_err(&tmp_path, err))
        .and_then(|()| std::fs::rename(&tmp_path, path).map_err(|err| write_err(path, err)));
    if outcome.is_err() {
        let _ = std::fs::remove_file(&tmp_path);
    }
    outcome
}

/// Create `<name>.tmp-<hex>` next to `path`, retrying on name collisions.
fn create_temp_sibling(path: &Path) -> std::io::Result<(PathBuf, std::fs::File)> {
    let (Some(dir), Some(name)) = (path.parent(), path.file_name()) else {
        return Err(std::io::Error::other("config path needs a parent and a file name"));
    };
    let name = name.to_string_lossy();
    let mut collision = None;
    for _attempt in 0..5 {
        let candidate = dir.join(format!("{name}.tmp-{:08x}", rand::random::<u32>()));
        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
        {
            Ok(file) => return Ok((candidate, file)),
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => collision = Some(err),
            Err(err) => return Err(err),
        }
    }
    Err(collision.unwrap_or_else(|| std::io::Error::other("no free temp file name")))
}

fn map_app_dir_error(error: app_dirs::AppDirError) -> ConfigError {
    match error {
        app_dirs::AppDirError::NoBaseDir => ConfigError::NoConfigDir,
        app_dirs::AppDirError::CreateDir { path, source } => {
            ConfigError::CreateDir { path, source }
        }
    }
}
