//! Import engine: reconcile loaded project definitions against the store.
//!
//! The whole import (conflict detection plus every write) runs inside one
//! transaction scope, so a failure anywhere leaves the store untouched.

use super::loader::load_candidates;
use crate::db::projects::{delete_project, get_project, save_project};
use crate::db::Database;
use crate::error::{Error, Result};
use crate::types::Project;
use clap::ValueEnum;
use std::path::Path;
use tracing::{info, warn};

/// Conflict-resolution strategy for importing project definitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ImportStrategy {
    /// Fail on any qualified-name collision, persisting nothing.
    #[default]
    Abort,
    /// Reconcile colliding projects field-by-field, preserving task data.
    Merge,
    /// Delete colliding projects (and their task data) and save fresh.
    Overwrite,
}

impl std::fmt::Display for ImportStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImportStrategy::Abort => write!(f, "abort"),
            ImportStrategy::Merge => write!(f, "merge"),
            ImportStrategy::Overwrite => write!(f, "overwrite"),
        }
    }
}

/// Import project definitions from a file under the given strategy.
///
/// Returns the project aggregates as persisted. Under `Abort`, a collision
/// raises a conflict error listing every colliding qualified name.
pub fn import_config(
    db: &Database,
    path: &Path,
    strategy: ImportStrategy,
) -> Result<Vec<Project>> {
    let candidates = load_candidates(path)?;

    db.with_transaction(|conn| {
        let mut pairs = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let existing = get_project(conn, &candidate.qualified_name())?;
            pairs.push((candidate, existing));
        }

        let mut imported = Vec::with_capacity(pairs.len());

        match strategy {
            ImportStrategy::Abort => {
                let conflicts: Vec<String> = pairs
                    .iter()
                    .filter_map(|(_, existing)| {
                        existing.as_ref().map(|e| e.qualified_name())
                    })
                    .collect();
                if !conflicts.is_empty() {
                    return Err(Error::ProjectConflict { names: conflicts });
                }

                for (mut candidate, _) in pairs {
                    save_project(conn, &mut candidate)?;
                    info!(project = %candidate.qualified_name(), "imported new project");
                    imported.push(candidate);
                }
            }
            ImportStrategy::Overwrite => {
                for (mut candidate, existing) in pairs {
                    if let Some(existing) = existing {
                        warn!(
                            project = %existing.qualified_name(),
                            "overwriting existing project and its recorded data"
                        );
                        delete_project(conn, &existing)?;
                    }
                    save_project(conn, &mut candidate)?;
                    imported.push(candidate);
                }
            }
            ImportStrategy::Merge => {
                for (candidate, existing) in pairs {
                    match existing {
                        Some(mut existing) => {
                            merge_into(&mut existing, candidate)?;
                            save_project(conn, &mut existing)?;
                            info!(
                                project = %existing.qualified_name(),
                                "merged project definition"
                            );
                            imported.push(existing);
                        }
                        None => {
                            let mut candidate = candidate;
                            save_project(conn, &mut candidate)?;
                            info!(
                                project = %candidate.qualified_name(),
                                "imported new project"
                            );
                            imported.push(candidate);
                        }
                    }
                }
            }
        }

        Ok(imported)
    })
}

/// Field-level reconciliation of a candidate definition into an existing
/// project.
///
/// The candidate's description wins. New metrics are added verbatim.
/// Same-name metrics of the same kind get a schema refresh (description,
/// allowed values, default); a kind change would reinterpret recorded
/// data, so those metrics are skipped with a warning instead.
fn merge_into(existing: &mut Project, candidate: Project) -> Result<()> {
    existing.description = candidate.description;

    for incoming in candidate.metrics {
        match existing.metrics.iter_mut().find(|m| m.name == incoming.name) {
            Some(current) if current.value_kind == incoming.value_kind => {
                current.description = incoming.description;
                current.allowed_values = incoming.allowed_values;
                current.default_value = incoming.default_value;
            }
            Some(current) => {
                warn!(
                    project = %existing.name,
                    metric = %incoming.name,
                    existing_kind = %current.value_kind,
                    incoming_kind = %incoming.value_kind,
                    "skipping metric merge: value kind change would corrupt recorded data"
                );
            }
            None => {
                existing.add_metric(incoming)?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Metric;
    use crate::units::{Value, ValueKind};

    fn metric(name: &str, kind: ValueKind) -> Metric {
        Metric::new(name, kind, None, None, None).unwrap()
    }

    #[test]
    fn merge_replaces_description_and_adds_new_metrics() {
        let mut existing = Project::new("p", None, Some("old".into()));
        existing.add_metric(metric("Points", ValueKind::Integer)).unwrap();
        let existing_metric_id = existing.metrics[0].id.clone();

        let mut candidate = Project::new("p", None, Some("new".into()));
        candidate.add_metric(metric("Points", ValueKind::Integer)).unwrap();
        candidate.add_metric(metric("Notes", ValueKind::Text)).unwrap();

        merge_into(&mut existing, candidate).unwrap();

        assert_eq!(existing.description.as_deref(), Some("new"));
        assert_eq!(existing.metrics.len(), 2);
        // Matched metrics keep their identity so recorded points stay linked.
        assert_eq!(existing.metrics[0].id, existing_metric_id);
        assert!(existing.metric("Notes").is_some());
    }

    #[test]
    fn merge_refreshes_compatible_metric_definitions() {
        let mut existing = Project::new("p", None, None);
        existing.add_metric(metric("Points", ValueKind::Integer)).unwrap();

        let mut candidate = Project::new("p", None, None);
        candidate
            .add_metric(
                Metric::new(
                    "Points",
                    ValueKind::Integer,
                    Some("estimated points".into()),
                    Some(vec![Value::Integer(1), Value::Integer(2)]),
                    Some(Value::Integer(1)),
                )
                .unwrap(),
            )
            .unwrap();

        merge_into(&mut existing, candidate).unwrap();

        let merged = existing.metric("Points").unwrap();
        assert_eq!(merged.description.as_deref(), Some("estimated points"));
        assert_eq!(
            merged.allowed_values,
            Some(vec![Value::Integer(1), Value::Integer(2)])
        );
        assert_eq!(merged.default_value, Some(Value::Integer(1)));
    }

    #[test]
    fn merge_skips_metrics_whose_kind_changed() {
        let mut existing = Project::new("p", None, None);
        existing
            .add_metric(
                Metric::new(
                    "Points",
                    ValueKind::Integer,
                    Some("original".into()),
                    None,
                    None,
                )
                .unwrap(),
            )
            .unwrap();

        let mut candidate = Project::new("p", None, None);
        candidate.add_metric(metric("Points", ValueKind::Duration)).unwrap();

        merge_into(&mut existing, candidate).unwrap();

        let kept = existing.metric("Points").unwrap();
        assert_eq!(kept.value_kind, ValueKind::Integer);
        assert_eq!(kept.description.as_deref(), Some("original"));
    }
}
