//! Application directory helpers anchored to a single `.yachtcrm` folder.
//!
//! Config, logs and the default project database all live below this root,
//! which defaults to the OS config directory and honours a
//! `YACHTCRM_CONFIG_HOME` override for tests or portable setups.

use std::{
    path::PathBuf,
    sync::{LazyLock, Mutex},
};

use directories::BaseDirs;
use thiserror::Error;

/// Folder created under the base config directory.
pub const APP_DIR_NAME: &str = ".yachtcrm";
/// Environment variable that replaces the OS config root.
pub const CONFIG_HOME_ENV: &str = "YACHTCRM_CONFIG_HOME";
/// File name of the default project database inside the app root.
pub const DEFAULT_DB_FILE_NAME: &str = "yachtcrm.db";

static CONFIG_BASE_OVERRIDE: LazyLock<Mutex<Option<PathBuf>>> = LazyLock::new(|| Mutex::new(None));

#[derive(Debug, Error)]
pub enum AppDirError {
    #[error("No base config directory; set YACHTCRM_CONFIG_HOME")]
    NoBaseDir,
    #[error("Cannot create {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Return the root `.yachtcrm` directory, creating it if needed.
pub fn app_root_dir() -> Result<PathBuf, AppDirError> {
    let base = config_base_dir().ok_or(AppDirError::NoBaseDir)?;
    create_dir(base.join(APP_DIR_NAME))
}

/// Return the logs directory inside the `.yachtcrm` root, creating it if needed.
pub fn logs_dir() -> Result<PathBuf, AppDirError> {
    create_dir(app_root_dir()?.join("logs"))
}

/// Default location of the project database when the config does not name one.
pub fn default_db_path() -> Result<PathBuf, AppDirError> {
    Ok(app_root_dir()?.join(DEFAULT_DB_FILE_NAME))
}

fn create_dir(path: PathBuf) -> Result<PathBuf, AppDirError> {
    std::fs::create_dir_all(&path).map_err(|source| AppDirError::CreateDir {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

fn config_base_dir() -> Option<PathBuf> {
    let overridden = CONFIG_BASE_OVERRIDE.lock().ok().and_then(|slot| slot.clone());
    overridden
        .or_else(|| std::env::var_os(CONFIG_HOME_ENV).map(PathBuf::from))
        .or_else(|| BaseDirs::new().map(|dirs| dirs.config_dir().to_path_buf()))
}

/// Scoped override of the config base directory for unit tests.
///
/// Holds a process-wide lock so tests touching the app root never interleave.
#[cfg(test)]
pub(crate) struct ConfigBaseGuard {
    _lock: std::sync::MutexGuard<'static, ()>,
}

#[cfg(test)]
static GUARD_LOCK: Mutex<()> = Mutex::new(());

#[cfg(test)]
impl ConfigBaseGuard {
    pub(crate) fn set(path: PathBuf) -> Self {
        let lock = GUARD_LOCK.lock().unwrap_or_else(|err| err.into_inner());
        let mut slot = CONFIG_BASE_OVERRIDE
            .lock()
            .unwrap_or_else(|err| err.into_inner());
        *slot = Some(path);
        Self { _lock: lock }
    }
}

#[cfg(test)]
impl Drop for ConfigBaseGuard {
    fn drop(&mut self) {
        let mut slot = CONFIG_BASE_OVERRIDE
            .lock()
            .unwrap_or_else(|err| err.into_inner());
        *slot = None;
    }
}
