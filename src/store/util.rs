use std::path::Path;

use time::{Date, format_description::FormatItem, macros::format_description};

use super::StoreError;

const DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Translate rusqlite errors into friendlier StoreError variants.
pub(super) fn map_sql_error(err: rusqlite::Error) -> StoreError {
    match err {
        rusqlite::Error::SqliteFailure(sql_err, _)
            if sql_err.extended_code == rusqlite::ffi::SQLITE_BUSY =>
        {
            StoreError::Busy
        }
        other => StoreError::Sql(other),
    }
}

/// Parse a stored date, ignoring any time-of-day suffix.
pub(super) fn parse_date(value: &str) -> Result<Date, StoreError> {
    let day = value.trim().get(..10).unwrap_or(value);
    Date::parse(day, DATE_FORMAT).map_err(|_| StoreError::InvalidDate(value.to_string()))
}

pub(super) fn format_date(date: Date) -> Result<String, StoreError> {
    date.format(DATE_FORMAT)
        .map_err(|_| StoreError::InvalidDate(date.to_string()))
}

pub(super) fn create_parent_if_needed(path: &Path) -> Result<(), StoreError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent).map_err(|source| StoreError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}
