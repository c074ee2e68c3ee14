use std::collections::HashMap;

use rusqlite::{Connection, OptionalExtension, Row, params};

use super::StoreError;
use super::util::{map_sql_error, parse_date};
use crate::features::{ProjectAggregate, YachtSpec};

const AGGREGATE_SELECT: &str = "SELECT p.id, p.name, COALESCE(c.name, ''),
        p.planned_start, p.planned_end, p.actual_end, m.length_m, m.base_price,
        (SELECT COUNT(*) FROM tasks t WHERE t.project_id = p.id),
        (SELECT COUNT(*) FROM change_requests r WHERE r.project_id = p.id),
        (SELECT COUNT(*) FROM interactions i WHERE i.project_id = p.id)
     FROM projects p
     LEFT JOIN customers c ON c.id = p.customer_id
     LEFT JOIN yacht_models m ON m.id = p.yacht_model_id";

/// Columns as stored, before date parsing.
struct RawAggregate {
    project_id: i64,
    name: String,
    customer_name: String,
    planned_start: String,
    planned_end: String,
    actual_end: Option<String>,
    length_m: Option<f64>,
    base_price: Option<f64>,
    task_count: i64,
    change_request_count: i64,
    interaction_count: i64,
}

impl RawAggregate {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            project_id: row.get(0)?,
            name: row.get(1)?,
            customer_name: row.get(2)?,
            planned_start: row.get(3)?,
            planned_end: row.get(4)?,
            actual_end: row.get(5)?,
            length_m: row.get(6)?,
            base_price: row.get(7)?,
            task_count: row.get(8)?,
            change_request_count: row.get(9)?,
            interaction_count: row.get(10)?,
        })
    }

    fn into_aggregate(self) -> Result<ProjectAggregate, StoreError> {
        let yacht = match (self.length_m, self.base_price) {
            (Some(length_m), Some(base_price)) => Some(YachtSpec {
                length_m: length_m as f32,
                base_price: base_price as f32,
            }),
            _ => None,
        };
        Ok(ProjectAggregate {
            project_id: self.project_id,
            name: self.name,
            customer_name: self.customer_name,
            planned_start: parse_date(&self.planned_start)?,
            planned_end: parse_date(&self.planned_end)?,
            actual_end: self.actual_end.as_deref().map(parse_date).transpose()?,
            yacht,
            task_count: count(self.task_count),
            change_request_count: count(self.change_request_count),
            interaction_count: count(self.interaction_count),
        })
    }
}

fn count(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}

/// Fetch every project with its related-entity counts.
pub fn project_aggregates(connection: &Connection) -> Result<Vec<ProjectAggregate>, StoreError> {
    let mut stmt = connection
        .prepare(&format!("{AGGREGATE_SELECT} ORDER BY p.id ASC"))
        .map_err(map_sql_error)?;
    let rows = stmt
        .query_map([], RawAggregate::from_row)
        .map_err(map_sql_error)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(map_sql_error)?;
    rows.into_iter().map(RawAggregate::into_aggregate).collect()
}

/// Fetch one project by id.
pub fn project_aggregate(
    connection: &Connection,
    project_id: i64,
) -> Result<Option<ProjectAggregate>, StoreError> {
    let raw = connection
        .query_row(
            &format!("{AGGREGATE_SELECT} WHERE p.id = ?1"),
            params![project_id],
            RawAggregate::from_row,
        )
        .optional()
        .map_err(map_sql_error)?;
    raw.map(RawAggregate::into_aggregate).transpose()
}

/// Average feedback score per project that has any feedback.
pub fn feedback_averages(connection: &Connection) -> Result<HashMap<i64, f64>, StoreError> {
    let mut stmt = connection
        .prepare(
            "SELECT project_id, AVG(score)
             FROM customer_feedback
             WHERE project_id IS NOT NULL
             GROUP BY project_id",
        )
        .map_err(map_sql_error)?;
    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, f64>(1)?)))
        .map_err(map_sql_error)?
        .collect::<Result<HashMap<_, _>, _>>()
        .map_err(map_sql_error)?;
    Ok(rows)
}
