use workcore_core::AppResult;

use crate::ports::ManifestScanEntry;

use super::WorkerRuntime;

impl WorkerRuntime {
    /// For each manifest file under the storage path, ensures the backend
    /// has a matching deployment whose attributes equal the manifest's,
    /// unless a newer version already exists in the backend. A malformed
    /// file is logged and does not abort the scan.
    pub async fn scan_storage_for_deployments(&self) -> AppResult<()> {
        for entry in self.manifest_store.scan().await? {
            match entry {
                ManifestScanEntry::ParseError { path, message } => {
                    tracing::warn!(path = %path, error = %message, "failed to parse deployment manifest");
                }
                ManifestScanEntry::Parsed(manifest) => {
                    let (flow_name, deployment_name) = manifest.logical_identity();
                    let existing = self
                        .backend
                        .read_deployment_by_name(flow_name, deployment_name)
                        .await?;

                    let should_apply = match &existing {
                        None => true,
                        Some(existing) => existing.should_apply_manifest(manifest.timestamp),
                    };

                    if !should_apply {
                        continue;
                    }

                    let deployment = self.backend.apply_deployment(&manifest).await?;

                    if let Err(error) = self.worker_impl.verify_submitted_deployment(&deployment).await {
                        tracing::warn!(
                            deployment = %deployment.name,
                            error = %error,
                            "deployment verification failed; leaving deployment applied"
                        );
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::worker_runtime::tests::{test_runtime, TestBackend, TestManifestStore};
    use std::sync::Arc;

    fn manifest_yaml(name: &str, tags: &str, timestamp: Option<&str>) -> String {
        let timestamp_line = timestamp
            .map(|value| format!("timestamp: {value}\n"))
            .unwrap_or_default();
        format!(
            "name: {name}\nflow_name: my-flow\npath: /flows\nentrypoint: flow.py:main\ntags: {tags}\n{timestamp_line}"
        )
    }

    async fn runtime_with_store() -> (crate::worker_runtime::WorkerRuntime, Arc<TestManifestStore>) {
        let backend = Arc::new(TestBackend::default());
        let store = Arc::new(TestManifestStore::default());
        let runtime = crate::worker_runtime::tests::test_runtime_with_store(backend, store.clone()).await;
        (runtime, store)
    }

    #[tokio::test]
    async fn applies_a_new_manifest() {
        let (runtime, store) = runtime_with_store().await;
        store.push_raw(manifest_yaml("test-deployment", "[]", None)).await;

        assert!(runtime.scan_storage_for_deployments().await.is_ok());

        let deployments = runtime.backend.read_deployments().await.unwrap_or_default();
        assert_eq!(deployments.len(), 1);
        assert!(deployments[0].tags.is_empty());
    }

    #[tokio::test]
    async fn newer_timestamp_replaces_existing_tags() {
        let (runtime, store) = runtime_with_store().await;
        store.push_raw(manifest_yaml("test-deployment", "[]", None)).await;
        assert!(runtime.scan_storage_for_deployments().await.is_ok());

        store
            .push_raw(manifest_yaml(
                "test-deployment",
                "[\"new-tag\"]",
                Some("2026-01-01T00:00:00Z"),
            ))
            .await;
        assert!(runtime.scan_storage_for_deployments().await.is_ok());

        let deployments = runtime.backend.read_deployments().await.unwrap_or_default();
        assert_eq!(deployments[0].tags, vec!["new-tag".to_owned()]);
    }

    #[tokio::test]
    async fn stale_manifest_without_newer_timestamp_is_skipped() {
        let (runtime, store) = runtime_with_store().await;
        store
            .push_raw(manifest_yaml(
                "test-deployment",
                "[\"new-tag\"]",
                Some("2026-01-01T00:00:00Z"),
            ))
            .await;
        assert!(runtime.scan_storage_for_deployments().await.is_ok());

        store.push_raw(manifest_yaml("test-deployment", "[\"older\"]", None)).await;
        assert!(runtime.scan_storage_for_deployments().await.is_ok());

        let deployments = runtime.backend.read_deployments().await.unwrap_or_default();
        assert_eq!(deployments[0].tags, vec!["new-tag".to_owned()]);
    }

    #[tokio::test]
    async fn malformed_manifest_does_not_abort_the_scan() {
        let (runtime, store) = runtime_with_store().await;
        store.push_raw("Ceci n'est pas un d\u{e9}ploiement").await;

        assert!(runtime.scan_storage_for_deployments().await.is_ok());

        assert!(runtime.backend.read_deployments().await.unwrap_or_default().is_empty());
    }
}
