use rusqlite::{Connection, params};
use time::Date;

use super::util::{format_date, map_sql_error};
use super::{ProjectStore, StoreError};

/// Yacht model row to insert.
#[derive(Debug, Clone)]
pub struct NewYachtModel {
    pub name: String,
    pub length_m: f64,
    pub base_price: f64,
}

/// Project row to insert.
#[derive(Debug, Clone)]
pub struct NewProject {
    pub customer_id: i64,
    pub yacht_model_id: Option<i64>,
    pub name: String,
    pub status: String,
    pub planned_start: Date,
    pub planned_end: Date,
    pub actual_start: Option<Date>,
    pub actual_end: Option<Date>,
}

impl ProjectStore {
    /// Insert a customer and return its id.
    pub fn insert_customer(&self, name: &str) -> Result<i64, StoreError> {
        let conn = self.lock()?;
        conn.execute("INSERT INTO customers (name) VALUES (?1)", params![name])
            .map_err(map_sql_error)?;
        Ok(conn.last_insert_rowid())
    }

    /// Insert a yacht model and return its id.
    pub fn insert_yacht_model(&self, model: &NewYachtModel) -> Result<i64, StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO yacht_models (name, length_m, base_price) VALUES (?1, ?2, ?3)",
            params![model.name, model.length_m, model.base_price],
        )
        .map_err(map_sql_error)?;
        Ok(conn.last_insert_rowid())
    }

    /// Insert a project and return its id.
    pub fn insert_project(&self, project: &NewProject) -> Result<i64, StoreError> {
        let optional = |date: Option<Date>| date.map(format_date).transpose();
        let planned_start = format_date(project.planned_start)?;
        let planned_end = format_date(project.planned_end)?;
        let actual_start = optional(project.actual_start)?;
        let actual_end = optional(project.actual_end)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO projects
                (customer_id, yacht_model_id, name, status, planned_start, planned_end,
                 actual_start, actual_end)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                project.customer_id,
                project.yacht_model_id,
                project.name,
                project.status,
                planned_start,
                planned_end,
                actual_start,
                actual_end,
            ],
        )
        .map_err(map_sql_error)?;
        Ok(conn.last_insert_rowid())
    }

    /// Record a completion date for an existing project.
    pub fn set_actual_end(&self, project_id: i64, actual_end: Date) -> Result<(), StoreError> {
        let formatted = format_date(actual_end)?;
        self.lock()?
            .execute(
                "UPDATE projects SET actual_end = ?1, status = 'Completed' WHERE id = ?2",
                params![formatted, project_id],
            )
            .map_err(map_sql_error)?;
        Ok(())
    }

    /// Attach `count` placeholder tasks to a project.
    pub fn add_tasks(&self, project_id: i64, count: u32) -> Result<(), StoreError> {
        insert_children(&mut *self.lock()?, "tasks", "title", project_id, count, "Task")
    }

    /// Attach `count` change requests to a project.
    pub fn add_change_requests(&self, project_id: i64, count: u32) -> Result<(), StoreError> {
        insert_children(
            &mut *self.lock()?,
            "change_requests",
            "title",
            project_id,
            count,
            "Change request",
        )
    }

    /// Attach `count` interactions to a project.
    pub fn add_interactions(&self, project_id: i64, count: u32) -> Result<(), StoreError> {
        insert_children(
            &mut *self.lock()?,
            "interactions",
            "kind",
            project_id,
            count,
            "Call",
        )
    }

    /// Record one feedback score, optionally tied to a delivery.
    pub fn add_feedback(
        &self,
        customer_id: i64,
        project_id: Option<i64>,
        score: i64,
    ) -> Result<(), StoreError> {
        self.lock()?
            .execute(
                "INSERT INTO customer_feedback (customer_id, project_id, score)
                 VALUES (?1, ?2, ?3)",
                params![customer_id, project_id, score],
            )
            .map_err(map_sql_error)?;
        Ok(())
    }
}

/// Insert child rows in one transaction; table and column names are crate constants.
fn insert_children(
    conn: &mut Connection,
    table: &str,
    column: &str,
    project_id: i64,
    count: u32,
    label: &str,
) -> Result<(), StoreError> {
    let tx = conn.transaction().map_err(map_sql_error)?;
    {
        let mut stmt = tx
            .prepare_cached(&format!(
                "INSERT INTO {table} (project_id, {column}) VALUES (?1, ?2)"
            ))
            .map_err(map_sql_error)?;
        for idx in 0..count {
            stmt.execute(params![project_id, format!("{label} {}", idx + 1)])
                .map_err(map_sql_error)?;
        }
    }
    tx.commit().map_err(map_sql_error)
}
