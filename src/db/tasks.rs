//! Task and data point persistence.
//!
//! Scalar points live in `scalar_points` keyed by (metric, task) so a task
//! can only ever hold one current value per scalar metric. Duration
//! histogram entries live in `duration_points` with their own entry id and
//! are immutable once written.

use crate::error::{Error, Result};
use crate::types::{DataPoint, Task};
use crate::units::{Value, ValueKind};
use rusqlite::{params, Connection};
use std::collections::HashMap;

/// Upsert a task row and its data points.
pub fn save_task(conn: &Connection, project_id: &str, task: &Task) -> Result<()> {
    conn.execute(
        "INSERT INTO tasks (id, project_id, name, description, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(id) DO UPDATE SET
             name = excluded.name,
             description = excluded.description,
             updated_at = excluded.updated_at",
        params![
            task.id,
            project_id,
            task.name,
            task.description,
            task.created_at,
            task.updated_at,
        ],
    )?;

    for point in &task.points {
        match &point.entry_id {
            None => {
                conn.execute(
                    "INSERT INTO scalar_points (metric_id, task_id, value, recorded_at)
                     VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT(metric_id, task_id) DO UPDATE SET
                         value = excluded.value,
                         recorded_at = excluded.recorded_at",
                    params![
                        point.metric_id,
                        task.id,
                        point.value.canonical_text(),
                        point.recorded_at,
                    ],
                )?;
            }
            Some(entry_id) => {
                // Histogram entries never change once recorded.
                conn.execute(
                    "INSERT OR IGNORE INTO duration_points
                         (id, metric_id, task_id, seconds, recorded_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        entry_id,
                        point.metric_id,
                        task.id,
                        point.value.canonical_text(),
                        point.recorded_at,
                    ],
                )?;
            }
        }
    }

    Ok(())
}

/// Load every task of a project with its data points attached.
///
/// `kinds` maps metric ids to their declared value kind so stored
/// canonical text parses back into typed values.
pub fn load_tasks(
    conn: &Connection,
    project_id: &str,
    kinds: &HashMap<String, ValueKind>,
) -> Result<Vec<Task>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, description, created_at, updated_at
         FROM tasks WHERE project_id = ?1 ORDER BY created_at",
    )?;
    let rows: Vec<(String, String, Option<String>, i64, i64)> = stmt
        .query_map(params![project_id], |row| {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut tasks = Vec::with_capacity(rows.len());
    for (id, name, description, created_at, updated_at) in rows {
        let points = load_points(conn, &id, kinds)?;
        tasks.push(Task {
            id,
            name,
            description,
            created_at,
            updated_at,
            points,
        });
    }

    Ok(tasks)
}

fn point_kind(kinds: &HashMap<String, ValueKind>, metric_id: &str) -> Result<ValueKind> {
    kinds.get(metric_id).copied().ok_or_else(|| {
        Error::model(format!(
            "data point references unknown metric '{}'",
            metric_id
        ))
    })
}

fn load_points(
    conn: &Connection,
    task_id: &str,
    kinds: &HashMap<String, ValueKind>,
) -> Result<Vec<DataPoint>> {
    let mut points = Vec::new();

    let mut stmt = conn.prepare(
        "SELECT metric_id, value, recorded_at FROM scalar_points WHERE task_id = ?1",
    )?;
    let scalar_rows: Vec<(String, String, i64)> = stmt
        .query_map(params![task_id], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    for (metric_id, text, recorded_at) in scalar_rows {
        let kind = point_kind(kinds, &metric_id)?;
        points.push(DataPoint {
            entry_id: None,
            metric_id,
            value: Value::from_canonical(kind, &text)?,
            recorded_at,
        });
    }

    let mut stmt = conn.prepare(
        "SELECT id, metric_id, seconds, recorded_at
         FROM duration_points WHERE task_id = ?1 ORDER BY recorded_at",
    )?;
    let duration_rows: Vec<(String, String, String, i64)> = stmt
        .query_map(params![task_id], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    for (entry_id, metric_id, text, recorded_at) in duration_rows {
        let kind = point_kind(kinds, &metric_id)?;
        points.push(DataPoint {
            entry_id: Some(entry_id),
            metric_id,
            value: Value::from_canonical(kind, &text)?,
            recorded_at,
        });
    }

    Ok(points)
}
