use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use workcore_core::DeploymentId;

/// Workflow binding: a flow tied to a path, entrypoint, and work queue.
///
/// Invariant for local-storage runs: `storage_document_id` is `None`. A
/// `Some` value means the deployment's code lives in remote storage, which
/// this worker does not itself fetch (see `ScanStorageForDeployments`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deployment {
    pub id: DeploymentId,
    pub name: String,
    pub flow_name: String,
    pub path: String,
    pub entrypoint: String,
    pub storage_document_id: Option<String>,
    pub tags: Vec<String>,
    /// Manifest version this deployment was last applied from.
    pub timestamp: Option<DateTime<Utc>>,
    /// Per-deployment overrides merged onto the pool's base job template
    /// when resolving a flow run's `JobConfiguration`.
    #[serde(default)]
    pub job_variables: Map<String, Value>,
}

impl Deployment {
    /// The `(flow_name, name)` pair identifying this deployment for
    /// reconciliation purposes.
    #[must_use]
    pub fn logical_identity(&self) -> (&str, &str) {
        (self.flow_name.as_str(), self.name.as_str())
    }

    /// Whether `self` should be superseded by a manifest carrying
    /// `candidate_timestamp`, per the last-writer-wins rule: apply only if
    /// strictly newer; equal or missing timestamps lose to an existing one.
    #[must_use]
    pub fn should_apply_manifest(&self, candidate_timestamp: Option<DateTime<Utc>>) -> bool {
        match (candidate_timestamp, self.timestamp) {
            (Some(candidate), Some(existing)) => candidate > existing,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Deployment;
    use chrono::{Duration, Utc};
    use workcore_core::DeploymentId;

    fn deployment(timestamp: Option<chrono::DateTime<Utc>>) -> Deployment {
        Deployment {
            id: DeploymentId::new(),
            name: "deploy".to_owned(),
            flow_name: "flow".to_owned(),
            path: "/flows".to_owned(),
            entrypoint: "flow.py:main".to_owned(),
            storage_document_id: None,
            tags: Vec::new(),
            timestamp,
            job_variables: serde_json::Map::new(),
        }
    }

    #[test]
    fn newer_manifest_timestamp_applies() {
        let existing = deployment(Some(Utc::now()));
        assert!(existing.should_apply_manifest(Some(Utc::now() + Duration::seconds(1))));
    }

    #[test]
    fn equal_or_older_manifest_timestamp_does_not_apply() {
        let now = Utc::now();
        let existing = deployment(Some(now));
        assert!(!existing.should_apply_manifest(Some(now)));
        assert!(!existing.should_apply_manifest(Some(now - Duration::seconds(1))));
    }

    #[test]
    fn missing_manifest_timestamp_never_applies_over_existing() {
        let existing = deployment(Some(Utc::now()));
        assert!(!existing.should_apply_manifest(None));
    }

    #[test]
    fn any_timestamp_applies_when_no_existing_timestamp() {
        let existing = deployment(None);
        assert!(existing.should_apply_manifest(Some(Utc::now())));
    }
}
