//! Project / Metric / Task / DataPoint model.
//!
//! Projects exclusively own their metrics and tasks; tasks own their data
//! points. A data point's metric reference is a plain id, validated at the
//! model boundary rather than by ORM-style relationship magic.

use crate::error::{Error, Result};
use crate::units::{Value, ValueKind};
use bigdecimal::BigDecimal;
use uuid::Uuid;

/// Separator between organization and name in a qualified project name,
/// e.g. `scopetastic/worktally`.
pub const ORG_SEPARATOR: char = '/';

/// Milliseconds since the Unix epoch.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// How recorded values aggregate per (task, metric).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    /// One current value; new writes add to it (Integer, Decimal).
    ScalarAccumulate,
    /// One current value; new writes replace it (Text).
    ScalarOverwrite,
    /// Many immutable entries; the total is their sum (Duration).
    HistogramAppend,
}

/// A named measurement definition owned by exactly one project.
#[derive(Debug, Clone)]
pub struct Metric {
    pub id: String,
    pub name: String,
    pub value_kind: ValueKind,
    pub description: Option<String>,
    /// Closed set of permitted values, already in parsed form.
    pub allowed_values: Option<Vec<Value>>,
    /// Already-parsed default, constrained to `allowed_values` if set.
    pub default_value: Option<Value>,
}

impl Metric {
    pub fn new(
        name: impl Into<String>,
        value_kind: ValueKind,
        description: Option<String>,
        allowed_values: Option<Vec<Value>>,
        default_value: Option<Value>,
    ) -> Result<Self> {
        let name = name.into();

        if let Some(values) = &allowed_values {
            for value in values {
                if value.kind() != value_kind {
                    return Err(Error::config(format!(
                        "metric '{}': allowed value '{}' is {}, expected {}",
                        name,
                        value.canonical_text(),
                        value.kind(),
                        value_kind
                    )));
                }
            }
        }

        if let Some(default) = &default_value {
            if default.kind() != value_kind {
                return Err(Error::config(format!(
                    "metric '{}': default value '{}' is {}, expected {}",
                    name,
                    default.canonical_text(),
                    default.kind(),
                    value_kind
                )));
            }
            if let Some(values) = &allowed_values {
                if !values.contains(default) {
                    return Err(Error::config(format!(
                        "metric '{}': default value '{}' is not in the allowed set",
                        name,
                        default.canonical_text()
                    )));
                }
            }
        }

        Ok(Self {
            id: Uuid::now_v7().to_string(),
            name,
            value_kind,
            description,
            allowed_values,
            default_value,
        })
    }

    /// Aggregation policy, derived from the value kind.
    pub fn aggregation(&self) -> Aggregation {
        match self.value_kind {
            ValueKind::Integer | ValueKind::Decimal => Aggregation::ScalarAccumulate,
            ValueKind::Text => Aggregation::ScalarOverwrite,
            ValueKind::Duration => Aggregation::HistogramAppend,
        }
    }
}

/// One recorded value.
///
/// Scalar metrics keep at most one point per (task, metric); duration
/// metrics keep one point per recorded interval, each with its own entry
/// id.
#[derive(Debug, Clone)]
pub struct DataPoint {
    /// Entry id for histogram points; `None` for scalars.
    pub entry_id: Option<String>,
    pub metric_id: String,
    pub value: Value,
    pub recorded_at: i64,
}

/// A unit of work inside a project, uniquely named within it.
#[derive(Debug, Clone)]
pub struct Task {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
    pub points: Vec<DataPoint>,
}

impl Task {
    pub fn new(name: impl Into<String>, description: Option<String>) -> Self {
        let now = now_ms();
        Self {
            id: Uuid::now_v7().to_string(),
            name: name.into(),
            description,
            created_at: now,
            updated_at: now,
            points: Vec::new(),
        }
    }

    /// The current scalar point for a metric, if any.
    pub fn scalar_point(&self, metric_id: &str) -> Option<&DataPoint> {
        self.points
            .iter()
            .find(|p| p.entry_id.is_none() && p.metric_id == metric_id)
    }

    /// All histogram entries for a metric.
    pub fn histogram_points<'a>(&'a self, metric_id: &'a str) -> impl Iterator<Item = &'a DataPoint> {
        self.points
            .iter()
            .filter(move |p| p.entry_id.is_some() && p.metric_id == metric_id)
    }

    /// Record a parsed value against a metric.
    ///
    /// Numeric scalars accumulate, text scalars overwrite, durations
    /// append a histogram entry. Fails without mutating anything if the
    /// value's kind does not match the metric or falls outside its
    /// allowed set; bumps `updated_at` only on success.
    pub fn record(&mut self, metric: &Metric, value: Value) -> Result<()> {
        if value.kind() != metric.value_kind {
            return Err(Error::model(format!(
                "metric '{}' expects {} values, got {}",
                metric.name,
                metric.value_kind,
                value.kind()
            )));
        }

        if let Some(allowed) = &metric.allowed_values {
            if !allowed.contains(&value) {
                return Err(Error::model(format!(
                    "value '{}' is not permitted for metric '{}' (allowed: {})",
                    value.canonical_text(),
                    metric.name,
                    allowed
                        .iter()
                        .map(|v| v.canonical_text())
                        .collect::<Vec<_>>()
                        .join(", ")
                )));
            }
        }

        let now = now_ms();

        match metric.aggregation() {
            Aggregation::ScalarAccumulate => {
                if let Some(existing) = self
                    .points
                    .iter_mut()
                    .find(|p| p.entry_id.is_none() && p.metric_id == metric.id)
                {
                    let sum = match existing.value.checked_add(&value) {
                        Some(sum) => sum?,
                        None => {
                            return Err(Error::model(format!(
                                "cannot accumulate {} onto metric '{}'",
                                value.kind(),
                                metric.name
                            )))
                        }
                    };
                    existing.value = sum;
                    existing.recorded_at = now;
                } else {
                    self.points.push(DataPoint {
                        entry_id: None,
                        metric_id: metric.id.clone(),
                        value,
                        recorded_at: now,
                    });
                }
            }
            Aggregation::ScalarOverwrite => {
                if let Some(existing) = self
                    .points
                    .iter_mut()
                    .find(|p| p.entry_id.is_none() && p.metric_id == metric.id)
                {
                    existing.value = value;
                    existing.recorded_at = now;
                } else {
                    self.points.push(DataPoint {
                        entry_id: None,
                        metric_id: metric.id.clone(),
                        value,
                        recorded_at: now,
                    });
                }
            }
            Aggregation::HistogramAppend => {
                self.points.push(DataPoint {
                    entry_id: Some(Uuid::now_v7().to_string()),
                    metric_id: metric.id.clone(),
                    value,
                    recorded_at: now,
                });
            }
        }

        self.updated_at = now;
        Ok(())
    }

    /// Current total for a metric: the scalar value, or the exact sum of
    /// all histogram entries (zero duration when none exist).
    pub fn total(&self, metric: &Metric) -> Option<Value> {
        match metric.aggregation() {
            Aggregation::ScalarAccumulate | Aggregation::ScalarOverwrite => {
                self.scalar_point(&metric.id).map(|p| p.value.clone())
            }
            Aggregation::HistogramAppend => {
                let mut sum = BigDecimal::from(0);
                for point in self.histogram_points(&metric.id) {
                    if let Value::Duration(seconds) = &point.value {
                        sum = sum + seconds;
                    }
                }
                Some(Value::Duration(sum))
            }
        }
    }
}

/// A named schema container: metric definitions plus the tasks recorded
/// against them.
#[derive(Debug, Clone)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub organization: Option<String>,
    pub description: Option<String>,
    /// Metric definitions, in insertion order, names unique per project.
    pub metrics: Vec<Metric>,
    pub tasks: Vec<Task>,
}

impl Project {
    pub fn new(
        name: impl Into<String>,
        organization: Option<String>,
        description: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            name: name.into(),
            organization,
            description,
            metrics: Vec::new(),
            tasks: Vec::new(),
        }
    }

    /// `organization/name`, or the bare name when there is no organization.
    pub fn qualified_name(&self) -> String {
        qualified_name(self.organization.as_deref(), &self.name)
    }

    /// Split a qualified name on the first separator back into
    /// `(organization, name)`.
    pub fn split_qualified_name(qualified: &str) -> (Option<String>, String) {
        match qualified.split_once(ORG_SEPARATOR) {
            Some((org, name)) => (Some(org.to_string()), name.to_string()),
            None => (None, qualified.to_string()),
        }
    }

    /// Add a metric definition. Names are unique per project; collisions
    /// are case- and punctuation-sensitive at this layer.
    pub fn add_metric(&mut self, metric: Metric) -> Result<()> {
        if self.metrics.iter().any(|m| m.name == metric.name) {
            return Err(Error::config(format!(
                "a metric named '{}' already exists in project '{}'",
                metric.name,
                self.qualified_name()
            )));
        }
        self.metrics.push(metric);
        Ok(())
    }

    /// Resolve a metric by exact name, then by normalized form (lowercase,
    /// underscores as spaces) so `compile_time` finds "Compile Time".
    pub fn metric(&self, lookup: &str) -> Option<&Metric> {
        if let Some(metric) = self.metrics.iter().find(|m| m.name == lookup) {
            return Some(metric);
        }

        let normalized = normalize_name(lookup);
        self.metrics
            .iter()
            .find(|m| normalize_name(&m.name) == normalized)
    }

    pub fn task(&self, name: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.name == name)
    }

    pub fn task_mut(&mut self, name: &str) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.name == name)
    }

    /// Get a task by name, creating it if it does not exist yet.
    pub fn ensure_task(&mut self, name: &str) -> &mut Task {
        let idx = match self.tasks.iter().position(|t| t.name == name) {
            Some(idx) => idx,
            None => {
                self.tasks.push(Task::new(name, None));
                self.tasks.len() - 1
            }
        };
        &mut self.tasks[idx]
    }
}

/// Compose a qualified name from its parts.
pub fn qualified_name(organization: Option<&str>, name: &str) -> String {
    match organization {
        Some(org) if !org.is_empty() => format!("{}{}{}", org, ORG_SEPARATOR, name),
        _ => name.to_string(),
    }
}

fn normalize_name(name: &str) -> String {
    name.to_lowercase().replace('_', " ")
}
