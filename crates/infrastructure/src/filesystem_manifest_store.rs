use std::path::PathBuf;

use async_trait::async_trait;
use workcore_application::{ManifestScanEntry, ManifestStore};
use workcore_core::{AppError, AppResult};
use workcore_domain::DeploymentManifest;

const MANIFEST_EXTENSIONS: [&str; 2] = ["yaml", "yml"];

/// Filesystem [`ManifestStore`]: one YAML document per file directly under
/// `root`. Sub-directories are not descended into — deployment manifests
/// are expected flat, the same way the spec's `workflow_storage_path`
/// describes a single scanned directory, not a tree.
pub struct FilesystemManifestStore {
    root: PathBuf,
}

impl FilesystemManifestStore {
    /// Creates a store rooted at `root`. Does not touch the filesystem;
    /// call [`ManifestStore::ensure_storage_exists`] before scanning.
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

#[async_trait]
impl ManifestStore for FilesystemManifestStore {
    async fn ensure_storage_exists(&self) -> AppResult<()> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|error| AppError::Setup(format!("failed to create workflow storage directory '{}': {error}", self.root.display())))
    }

    async fn scan(&self) -> AppResult<Vec<ManifestScanEntry>> {
        let mut read_dir = match tokio::fs::read_dir(&self.root).await {
            Ok(read_dir) => read_dir,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(error) => {
                return Err(AppError::Internal(format!(
                    "failed to read workflow storage directory '{}': {error}",
                    self.root.display()
                )));
            }
        };

        let mut entries = Vec::new();
        loop {
            let next = read_dir
                .next_entry()
                .await
                .map_err(|error| AppError::Internal(format!("failed to list workflow storage directory: {error}")))?;
            let Some(entry) = next else { break };

            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let is_manifest = path
                .extension()
                .and_then(|extension| extension.to_str())
                .is_some_and(|extension| MANIFEST_EXTENSIONS.contains(&extension));
            if !is_manifest {
                continue;
            }

            entries.push(self.parse_one(&path).await);
        }

        Ok(entries)
    }
}

impl FilesystemManifestStore {
    async fn parse_one(&self, path: &std::path::Path) -> ManifestScanEntry {
        let display_path = path.display().to_string();

        let raw = match tokio::fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(error) => {
                return ManifestScanEntry::ParseError {
                    path: display_path,
                    message: error.to_string(),
                };
            }
        };

        match serde_yaml::from_str::<DeploymentManifest>(&raw) {
            Ok(manifest) => ManifestScanEntry::Parsed(manifest),
            Err(error) => ManifestScanEntry::ParseError {
                path: display_path,
                message: error.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::FilesystemManifestStore;
    use workcore_application::{ManifestScanEntry, ManifestStore};

    fn manifest_yaml(name: &str) -> String {
        format!("name: {name}\nflow_name: my-flow\npath: /flows\nentrypoint: flow.py:main\n")
    }

    #[tokio::test]
    async fn ensure_storage_exists_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap_or_else(|_| unreachable!());
        let nested = dir.path().join("nested").join("storage");
        let store = FilesystemManifestStore::new(nested.clone());

        assert!(store.ensure_storage_exists().await.is_ok());

        assert!(nested.is_dir());
    }

    #[tokio::test]
    async fn scan_of_missing_directory_returns_no_entries() {
        let dir = tempfile::tempdir().unwrap_or_else(|_| unreachable!());
        let missing = dir.path().join("does-not-exist");
        let store = FilesystemManifestStore::new(missing);

        let entries = store.scan().await.unwrap_or_default();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn scan_parses_yaml_files_and_ignores_others() {
        let dir = tempfile::tempdir().unwrap_or_else(|_| unreachable!());
        assert!(tokio::fs::write(dir.path().join("a.yaml"), manifest_yaml("a")).await.is_ok());
        assert!(tokio::fs::write(dir.path().join("b.yml"), manifest_yaml("b")).await.is_ok());
        assert!(tokio::fs::write(dir.path().join("README.md"), "not a manifest").await.is_ok());

        let store = FilesystemManifestStore::new(dir.path().to_path_buf());
        let entries = store.scan().await.unwrap_or_default();

        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|entry| matches!(entry, ManifestScanEntry::Parsed(_))));
    }

    #[tokio::test]
    async fn scan_reports_a_parse_error_without_failing_the_whole_scan() {
        let dir = tempfile::tempdir().unwrap_or_else(|_| unreachable!());
        assert!(tokio::fs::write(dir.path().join("good.yaml"), manifest_yaml("good")).await.is_ok());
        assert!(
            tokio::fs::write(dir.path().join("bad.yaml"), "Ceci n'est pas un d\u{e9}ploiement")
                .await
                .is_ok()
        );

        let store = FilesystemManifestStore::new(dir.path().to_path_buf());
        let entries = store.scan().await.unwrap_or_default();

        assert_eq!(entries.len(), 2);
        let parsed = entries.iter().filter(|entry| matches!(entry, ManifestScanEntry::Parsed(_))).count();
        let errors = entries.iter().filter(|entry| matches!(entry, ManifestScanEntry::ParseError { .. })).count();
        assert_eq!(parsed, 1);
        assert_eq!(errors, 1);
    }
}
