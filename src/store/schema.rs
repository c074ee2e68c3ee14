use rusqlite::Connection;

use super::StoreError;
use super::util::map_sql_error;

/// Create the tables read by the prediction feed.
///
/// Only the columns the feature extractor and risk reports need are modelled.
pub(super) fn apply_schema(connection: &Connection) -> Result<(), StoreError> {
    connection
        .execute_batch(
            "CREATE TABLE IF NOT EXISTS customers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL
             );
             CREATE TABLE IF NOT EXISTS yacht_models (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                length_m REAL NOT NULL,
                base_price REAL NOT NULL
             );
             CREATE TABLE IF NOT EXISTS projects (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                customer_id INTEGER NOT NULL REFERENCES customers(id),
                yacht_model_id INTEGER REFERENCES yacht_models(id),
                name TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'Planning',
                planned_start TEXT NOT NULL,
                planned_end TEXT NOT NULL,
                actual_start TEXT,
                actual_end TEXT
             );
             CREATE TABLE IF NOT EXISTS tasks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
                title TEXT NOT NULL
             );
             CREATE INDEX IF NOT EXISTS idx_tasks_project ON tasks (project_id);
             CREATE TABLE IF NOT EXISTS change_requests (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
                title TEXT NOT NULL
             );
             CREATE INDEX IF NOT EXISTS idx_change_requests_project
                ON change_requests (project_id);
             CREATE TABLE IF NOT EXISTS interactions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
                kind TEXT NOT NULL
             );
             CREATE INDEX IF NOT EXISTS idx_interactions_project ON interactions (project_id);
             CREATE TABLE IF NOT EXISTS customer_feedback (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                customer_id INTEGER NOT NULL REFERENCES customers(id),
                project_id INTEGER REFERENCES projects(id) ON DELETE SET NULL,
                score INTEGER NOT NULL
             );
             CREATE INDEX IF NOT EXISTS idx_customer_feedback_project
                ON customer_feedback (project_id);",
        )
        .map_err(map_sql_error)
}
