//! SQLite-backed project store feeding the prediction subsystem.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, OpenFlags};
use thiserror::Error;

use crate::features::ProjectAggregate;

/// Read-only aggregate queries.
pub mod read;
/// SQLite schema management.
mod schema;
/// Insert helpers for fixtures and imports.
pub mod write;

mod util;

pub use write::{NewProject, NewYachtModel};

/// Errors returned when reading or writing the project store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLite query failed.
    #[error("Database query failed: {0}")]
    Sql(#[from] rusqlite::Error),
    /// Failed to create a parent directory.
    #[error("Could not write to {path}: {source}")]
    CreateDir {
        /// Path that could not be created.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
    /// A stored date column was not an ISO `YYYY-MM-DD` value.
    #[error("Invalid stored date: {0}")]
    InvalidDate(String),
    /// Database is locked or busy.
    #[error("Database is busy, please retry")]
    Busy,
    /// A previous holder of the connection panicked.
    #[error("Database connection lock poisoned")]
    LockPoisoned,
}

/// Read access to project aggregates and feedback, independent of storage.
pub trait ProjectFeed: Send + Sync {
    /// Every project with related-entity counts, ordered by id.
    fn project_aggregates(&self) -> Result<Vec<ProjectAggregate>, StoreError>;
    /// One project by id, or `None` when it does not exist.
    fn project_aggregate(&self, project_id: i64) -> Result<Option<ProjectAggregate>, StoreError>;
    /// Average feedback score per project; projects without feedback are absent.
    fn feedback_averages(&self) -> Result<HashMap<i64, f64>, StoreError>;
}

/// SQLite wrapper holding the CRM tables the predictor reads.
pub struct ProjectStore {
    connection: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl ProjectStore {
    /// Open (or create) the database at `path` and apply the schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        util::create_parent_if_needed(path)?;
        let connection = Connection::open(path)?;
        apply_pragmas(&connection)?;
        schema::apply_schema(&connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
            path: Some(path.to_path_buf()),
        })
    }

    /// Open an existing database without touching its schema.
    pub fn open_read_only(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let connection = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        connection
            .execute_batch("PRAGMA busy_timeout=5000;")
            .map_err(util::map_sql_error)?;
        Ok(Self {
            connection: Mutex::new(connection),
            path: Some(path.to_path_buf()),
        })
    }

    /// Private in-memory database, mostly for tests and benchmarks.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let connection = Connection::open_in_memory()?;
        connection
            .execute_batch("PRAGMA foreign_keys=ON;")
            .map_err(util::map_sql_error)?;
        schema::apply_schema(&connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
            path: None,
        })
    }

    /// File backing this store, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.connection.lock().map_err(|_| StoreError::LockPoisoned)
    }
}

impl std::fmt::Debug for ProjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl ProjectFeed for ProjectStore {
    fn project_aggregates(&self) -> Result<Vec<ProjectAggregate>, StoreError> {
        let conn = self.lock()?;
        read::project_aggregates(&conn)
    }

    fn project_aggregate(&self, project_id: i64) -> Result<Option<ProjectAggregate>, StoreError> {
        let conn = self.lock()?;
        read::project_aggregate(&conn, project_id)
    }

    fn feedback_averages(&self) -> Result<HashMap<i64, f64>, StoreError> {
        let conn = self.lock()?;
        read::feedback_averages(&conn)
    }
}

fn apply_pragmas(connection: &Connection) -> Result<(), StoreError> {
    connection
        .execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys=ON;
             PRAGMA busy_timeout=5000;
             PRAGMA temp_store=MEMORY;",
        )
        .map_err(util::map_sql_error)
}
