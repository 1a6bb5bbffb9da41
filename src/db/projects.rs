//! Project aggregate CRUD.
//!
//! Projects load and save as one unit: the project row, its metric
//! definitions in insertion order, and every task with its data points.
//! Identity fields (organization, name) are lowercased on save so lookups
//! are case-insensitive; display casing lives in descriptions only.

use super::tasks::{load_tasks, save_task};
use super::Database;
use crate::error::{Error, Result};
use crate::types::{Metric, Project};
use crate::units::{Value, ValueKind};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;

/// Encode an allowed-values list as a JSON array of canonical strings.
fn encode_values(values: &Option<Vec<Value>>) -> Result<Option<String>> {
    match values {
        Some(values) => {
            let texts: Vec<String> = values.iter().map(|v| v.canonical_text()).collect();
            let json = serde_json::to_string(&texts)
                .map_err(|e| Error::model(format!("failed to encode allowed values: {}", e)))?;
            Ok(Some(json))
        }
        None => Ok(None),
    }
}

/// Decode a stored allowed-values column back into parsed values.
fn decode_values(kind: ValueKind, json: Option<String>) -> Result<Option<Vec<Value>>> {
    match json {
        Some(json) => {
            let texts: Vec<String> = serde_json::from_str(&json)
                .map_err(|e| Error::model(format!("corrupt allowed values column: {}", e)))?;
            let values = texts
                .iter()
                .map(|t| Value::from_canonical(kind, t))
                .collect::<Result<Vec<_>>>()?;
            Ok(Some(values))
        }
        None => Ok(None),
    }
}

fn parse_metric_row(row: &Row) -> Result<Metric> {
    let id: String = row.get("id")?;
    let name: String = row.get("name")?;
    let kind_text: String = row.get("value_kind")?;
    let description: Option<String> = row.get("description")?;
    let allowed_json: Option<String> = row.get("allowed_values")?;
    let default_text: Option<String> = row.get("default_value")?;

    let value_kind = ValueKind::from_str(&kind_text)
        .ok_or_else(|| Error::model(format!("unknown stored value kind '{}'", kind_text)))?;

    let allowed_values = decode_values(value_kind, allowed_json)?;
    let default_value = default_text
        .map(|t| Value::from_canonical(value_kind, &t))
        .transpose()?;

    Ok(Metric {
        id,
        name,
        value_kind,
        description,
        allowed_values,
        default_value,
    })
}

/// Load a full project aggregate given its row.
fn unpack_project(conn: &Connection, id: String, name: String, organization: String, description: Option<String>) -> Result<Project> {
    let mut stmt = conn.prepare(
        "SELECT id, name, value_kind, description, allowed_values, default_value
         FROM metrics WHERE project_id = ?1 ORDER BY position",
    )?;
    let mut rows = stmt.query(params![id])?;

    let mut metrics = Vec::new();
    while let Some(row) = rows.next()? {
        metrics.push(parse_metric_row(row)?);
    }

    let kinds: HashMap<String, ValueKind> = metrics
        .iter()
        .map(|m| (m.id.clone(), m.value_kind))
        .collect();

    let tasks = load_tasks(conn, &id, &kinds)?;

    Ok(Project {
        id,
        name,
        organization: if organization.is_empty() {
            None
        } else {
            Some(organization)
        },
        description,
        metrics,
        tasks,
    })
}

/// Fetch a project aggregate by qualified name (case-insensitive).
pub fn get_project(conn: &Connection, qualified: &str) -> Result<Option<Project>> {
    let (organization, name) = Project::split_qualified_name(qualified);
    let organization = organization.unwrap_or_default().to_lowercase();
    let name = name.to_lowercase();

    let row = conn
        .query_row(
            "SELECT id, name, organization, description FROM projects
             WHERE organization = ?1 AND name = ?2",
            params![organization, name],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                ))
            },
        )
        .optional()?;

    match row {
        Some((id, name, organization, description)) => {
            Ok(Some(unpack_project(conn, id, name, organization, description)?))
        }
        None => Ok(None),
    }
}

/// All project aggregates, ordered by qualified name.
pub fn list_projects(conn: &Connection) -> Result<Vec<Project>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, organization, description FROM projects
         ORDER BY organization, name",
    )?;
    let rows: Vec<(String, String, String, Option<String>)> = stmt
        .query_map([], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut projects = Vec::with_capacity(rows.len());
    for (id, name, organization, description) in rows {
        projects.push(unpack_project(conn, id, name, organization, description)?);
    }
    Ok(projects)
}

/// Qualified names starting with the given partial name (lowercased).
pub fn matching_names(conn: &Connection, partial: &str) -> Result<Vec<String>> {
    let partial = partial.to_lowercase();
    let mut stmt =
        conn.prepare("SELECT name, organization FROM projects ORDER BY organization, name")?;
    let rows: Vec<(String, String)> = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows
        .into_iter()
        .map(|(name, organization)| {
            crate::types::qualified_name(
                if organization.is_empty() {
                    None
                } else {
                    Some(organization.as_str())
                },
                &name,
            )
        })
        .filter(|qualified| qualified.starts_with(&partial))
        .collect())
}

/// Upsert a project aggregate.
///
/// Lowercases the identity fields on the aggregate itself, mirroring what
/// gets persisted.
pub fn save_project(conn: &Connection, project: &mut Project) -> Result<()> {
    project.name = project.name.to_lowercase();
    if let Some(org) = &project.organization {
        project.organization = Some(org.to_lowercase());
    }

    conn.execute(
        "INSERT INTO projects (id, name, organization, description) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(id) DO UPDATE SET
             name = excluded.name,
             organization = excluded.organization,
             description = excluded.description",
        params![
            project.id,
            project.name,
            project.organization.clone().unwrap_or_default(),
            project.description,
        ],
    )?;

    for (position, metric) in project.metrics.iter().enumerate() {
        conn.execute(
            "INSERT INTO metrics
                 (id, project_id, name, value_kind, description, allowed_values, default_value, position)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 value_kind = excluded.value_kind,
                 description = excluded.description,
                 allowed_values = excluded.allowed_values,
                 default_value = excluded.default_value,
                 position = excluded.position",
            params![
                metric.id,
                project.id,
                metric.name,
                metric.value_kind.as_str(),
                metric.description,
                encode_values(&metric.allowed_values)?,
                metric.default_value.as_ref().map(|v| v.canonical_text()),
                position as i64,
            ],
        )?;
    }

    for task in &project.tasks {
        save_task(conn, &project.id, task)?;
    }

    Ok(())
}

/// Delete a project and everything it owns, in dependency order.
pub fn delete_project(conn: &Connection, project: &Project) -> Result<()> {
    conn.execute(
        "DELETE FROM scalar_points
         WHERE task_id IN (SELECT id FROM tasks WHERE project_id = ?1)",
        params![project.id],
    )?;
    conn.execute(
        "DELETE FROM duration_points
         WHERE task_id IN (SELECT id FROM tasks WHERE project_id = ?1)",
        params![project.id],
    )?;
    conn.execute("DELETE FROM tasks WHERE project_id = ?1", params![project.id])?;
    conn.execute("DELETE FROM metrics WHERE project_id = ?1", params![project.id])?;
    conn.execute("DELETE FROM projects WHERE id = ?1", params![project.id])?;
    Ok(())
}

impl Database {
    /// All project aggregates in the store.
    pub fn list_projects(&self) -> Result<Vec<Project>> {
        self.with_conn(list_projects)
    }

    /// Fetch one project aggregate by qualified name.
    pub fn get_project(&self, qualified: &str) -> Result<Option<Project>> {
        self.with_conn(|conn| get_project(conn, qualified))
    }

    /// Qualified names matching a partial prefix.
    pub fn matching_names(&self, partial: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| matching_names(conn, partial))
    }

    /// Save a project aggregate in its own transaction.
    pub fn save_project(&self, project: &mut Project) -> Result<()> {
        self.with_transaction(|conn| save_project(conn, project))
    }

    /// Delete projects (and all owned data) in one transaction.
    pub fn delete_projects(&self, projects: &[Project]) -> Result<()> {
        self.with_transaction(|conn| {
            for project in projects {
                delete_project(conn, project)?;
            }
            Ok(())
        })
    }
}
