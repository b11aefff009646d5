use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// On-disk (YAML) representation of a deployment, as written under a
/// workflow-storage directory. Parsing itself is an infrastructure concern
/// (`ManifestStore`); this type is the shape both sides agree on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentManifest {
    pub name: String,
    pub flow_name: String,
    pub path: String,
    pub entrypoint: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    /// Per-deployment overrides merged onto the pool's base job template.
    #[serde(default)]
    pub overrides: Map<String, Value>,
}

impl DeploymentManifest {
    /// The `(flow_name, name)` pair used to look up a matching deployment.
    #[must_use]
    pub fn logical_identity(&self) -> (&str, &str) {
        (self.flow_name.as_str(), self.name.as_str())
    }
}
