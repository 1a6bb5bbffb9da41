//! Serde shapes for the declarative project definition file.
//!
//! ```yaml
//! projects:
//!   - name: worktally
//!     organization: scopetastic
//!     desc: Time tracking for programmers
//!     metrics:
//!       - name: Story Points
//!         metric_type: Integer
//!         value_range: [1, 2, 3, 5, 8]
//!         default_value: 3
//!       - name: Compile Time
//!         metric_type: Duration
//! ```

use serde::Deserialize;

/// Top-level document: a collection of project definitions.
#[derive(Debug, Deserialize)]
pub struct ProjectsFile {
    pub projects: Vec<ProjectDef>,
}

/// One declared project.
#[derive(Debug, Deserialize)]
pub struct ProjectDef {
    pub name: String,
    pub organization: Option<String>,
    pub desc: Option<String>,
    #[serde(default)]
    pub metrics: Vec<MetricDef>,
}

/// One declared metric. `value_range` and `default_value` arrive as raw
/// scalars and go through the unit parser matching `metric_type`.
#[derive(Debug, Deserialize)]
pub struct MetricDef {
    pub name: String,
    pub metric_type: String,
    pub desc: Option<String>,
    pub value_range: Option<Vec<serde_yaml::Value>>,
    pub default_value: Option<serde_yaml::Value>,
}
