//! Tracing setup for the command-line tools.
//!
//! Events go to stderr, since stdout carries JSON reports, and to one log file
//! per launch under `<app root>/logs`. File names embed the launch time so
//! they sort chronologically; only the newest [`MAX_LOG_FILES`] are kept.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::OnceLock,
};

use time::{OffsetDateTime, UtcOffset, format_description::FormatItem, macros::format_description};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::app_dirs::{self, AppDirError};

/// Log files retained after pruning.
pub const MAX_LOG_FILES: usize = 10;
const LOG_FILE_PREFIX: &str = "yachtcrm";
const DEFAULT_DIRECTIVE: &str = "info";

const FILE_STAMP: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]_[hour]-[minute]-[second]");
const LINE_STAMP: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

static FILE_WRITER_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Log directory unavailable: {0}")]
    AppDir(#[from] AppDirError),
    #[error("Failed to {action} {path}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to format log file timestamp: {0}")]
    FormatTime(#[from] time::error::Format),
    #[error("A global tracing subscriber is already installed: {0}")]
    SetGlobal(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// Install logging at `info` unless `RUST_LOG` says otherwise.
pub fn init() -> Result<(), LoggingError> {
    init_with_default(DEFAULT_DIRECTIVE)
}

/// Install logging, falling back to `default_directive` when `RUST_LOG` is unset.
///
/// Only the first successful call has an effect.
pub fn init_with_default(default_directive: &str) -> Result<(), LoggingError> {
    if FILE_WRITER_GUARD.get().is_some() {
        return Ok(());
    }
    let dir = app_dirs::logs_dir()?;
    let file_name = log_file_name(launch_time())?;
    prune_old_logs(&dir, MAX_LOG_FILES.saturating_sub(1))?;

    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(&dir, &file_name));
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    let timer = fmt::time::OffsetTime::new(offset, LINE_STAMP);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_timer(timer.clone())
                .with_writer(std::io::stderr),
        )
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_timer(timer)
                .with_writer(file_writer),
        );
    tracing::subscriber::set_global_default(subscriber)?;
    let _ = FILE_WRITER_GUARD.set(guard);

    tracing::debug!(path = %dir.join(&file_name).display(), "Logging to file");
    Ok(())
}

fn launch_time() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

fn log_file_name(at: OffsetDateTime) -> Result<String, LoggingError> {
    Ok(format!("{LOG_FILE_PREFIX}_{}.log", at.format(FILE_STAMP)?))
}

/// Delete the oldest `yachtcrm_*.log` files so at most `keep` remain.
///
/// Other files in the directory are left alone.
fn prune_old_logs(dir: &Path, keep: usize) -> Result<(), LoggingError> {
    let io_err = |action, path: &Path| {
        let path = path.to_path_buf();
        move |source| LoggingError::Io {
            action,
            path,
            source,
        }
    };
    let mut logs: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(io_err("read", dir))?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| is_own_log(path))
        .collect();
    if logs.len() <= keep {
        return Ok(());
    }
    logs.sort();
    let excess = logs.len() - keep;
    for path in logs.into_iter().take(excess) {
        fs::remove_file(&path).map_err(io_err("remove", &path))?;
    }
    Ok(())
}

fn is_own_log(path: &Path) -> bool {
    path.is_file()
        && path.extension().is_some_and(|ext| ext == "log")
        && path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with(LOG_FILE_PREFIX))
}
