//! Schema loader: declarative file -> candidate project aggregates.
//!
//! The loader never consults the store; it only builds fully-formed,
//! unpersisted projects for the import engine to reconcile.

use super::types::{MetricDef, ProjectsFile};
use crate::error::{Error, Result};
use crate::types::{Metric, Project};
use crate::units::{parse_value, ValueKind};
use std::path::Path;
use tracing::debug;

/// Load candidate projects from a YAML definition file.
///
/// Fails with a config error if the file is unreadable, the document does
/// not match the expected shape, a metric-type token is unknown, or a
/// project declares two metrics with the same name.
pub fn load_candidates(path: &Path) -> Result<Vec<Project>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::config(format!("cannot read config file '{}': {}", path.display(), e))
    })?;

    let file: ProjectsFile = serde_yaml::from_str(&content).map_err(|e| {
        Error::config(format!("invalid config file '{}': {}", path.display(), e))
    })?;

    let mut candidates = Vec::with_capacity(file.projects.len());

    for def in file.projects {
        let mut project = Project::new(def.name, def.organization, def.desc);
        debug!(project = %project.qualified_name(), "loading project definition");

        for metric_def in def.metrics {
            let metric = build_metric(&metric_def)?;
            project.add_metric(metric)?;
        }

        candidates.push(project);
    }

    Ok(candidates)
}

fn build_metric(def: &MetricDef) -> Result<Metric> {
    let kind = ValueKind::from_token(&def.metric_type).ok_or_else(|| {
        Error::config(format!(
            "metric '{}': unknown metric type '{}'",
            def.name, def.metric_type
        ))
    })?;

    let allowed_values = match &def.value_range {
        Some(entries) => {
            let mut values = Vec::with_capacity(entries.len());
            for entry in entries {
                let text = scalar_text(entry).ok_or_else(|| {
                    Error::config(format!(
                        "metric '{}': value_range entries must be scalars",
                        def.name
                    ))
                })?;
                values.push(parse_value(kind, &text)?);
            }
            Some(values)
        }
        None => None,
    };

    let default_value = match &def.default_value {
        Some(entry) => {
            let text = scalar_text(entry).ok_or_else(|| {
                Error::config(format!(
                    "metric '{}': default_value must be a scalar",
                    def.name
                ))
            })?;
            Some(parse_value(kind, &text)?)
        }
        None => None,
    };

    Metric::new(
        def.name.clone(),
        kind,
        def.desc.clone(),
        allowed_values,
        default_value,
    )
}

/// Raw text of a YAML scalar, for feeding through the unit parsers.
fn scalar_text(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::Value;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_projects_with_typed_metrics() {
        let file = write_config(
            r#"
projects:
  - name: Worktally
    organization: Scopetastic
    desc: Time tracking
    metrics:
      - name: Story Points
        metric_type: Integer
        value_range: [1, 2, 3, 5, 8]
        default_value: 3
      - name: Compile Time
        metric_type: Duration
      - name: Notes
        metric_type: String
"#,
        );

        let candidates = load_candidates(file.path()).unwrap();
        assert_eq!(candidates.len(), 1);

        let project = &candidates[0];
        assert_eq!(project.qualified_name(), "Scopetastic/Worktally");
        assert_eq!(project.metrics.len(), 3);

        let points = project.metric("Story Points").unwrap();
        assert_eq!(points.value_kind, ValueKind::Integer);
        assert_eq!(
            points.allowed_values,
            Some(vec![
                Value::Integer(1),
                Value::Integer(2),
                Value::Integer(3),
                Value::Integer(5),
                Value::Integer(8),
            ])
        );
        assert_eq!(points.default_value, Some(Value::Integer(3)));

        assert_eq!(
            project.metric("Compile Time").unwrap().value_kind,
            ValueKind::Duration
        );
        assert_eq!(project.metric("Notes").unwrap().value_kind, ValueKind::Text);
        assert!(project.tasks.is_empty());
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let err = load_candidates(Path::new("/nonexistent/projects.yaml")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn malformed_yaml_is_a_config_error() {
        let file = write_config("projects: [not: valid: yaml");
        assert!(matches!(
            load_candidates(file.path()),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn unknown_metric_type_is_a_config_error() {
        let file = write_config(
            r#"
projects:
  - name: test
    metrics:
      - name: Widgets
        metric_type: Widget
"#,
        );
        let err = load_candidates(file.path()).unwrap_err();
        match err {
            Error::Config(msg) => assert!(msg.contains("Widget")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn duplicate_metric_names_are_a_config_error() {
        let file = write_config(
            r#"
projects:
  - name: test
    metrics:
      - name: Points
        metric_type: Integer
      - name: Points
        metric_type: Integer
"#,
        );
        assert!(matches!(
            load_candidates(file.path()),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn default_outside_range_is_a_config_error() {
        let file = write_config(
            r#"
projects:
  - name: test
    metrics:
      - name: Points
        metric_type: Integer
        value_range: [1, 2, 3]
        default_value: 9
"#,
        );
        assert!(matches!(
            load_candidates(file.path()),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn duration_range_entries_parse_through_the_unit_layer() {
        let file = write_config(
            r#"
projects:
  - name: test
    metrics:
      - name: Pomodoro
        metric_type: Duration
        value_range: ["25 mins", "50 mins"]
"#,
        );
        let candidates = load_candidates(file.path()).unwrap();
        let metric = candidates[0].metric("Pomodoro").unwrap();
        let allowed = metric.allowed_values.as_ref().unwrap();
        assert_eq!(allowed[0], parse_value(ValueKind::Duration, "25 mins").unwrap());
    }
}
