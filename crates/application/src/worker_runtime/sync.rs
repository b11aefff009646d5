use workcore_core::AppResult;

use crate::job_template::get_default_base_job_template;

use super::WorkerRuntime;

impl WorkerRuntime {
    /// After a successful call, the cached work pool reflects the
    /// backend's current view and the backend has received a fresh
    /// heartbeat for this worker.
    pub async fn sync_with_backend(&self) -> AppResult<()> {
        let pool_name = self.config.work_pool_name.as_str();

        let pool = {
            let cached = self.cached_pool.read().await.clone();
            match cached {
                Some(pool) => Some(pool),
                None => match self.backend.read_work_pool(pool_name).await? {
                    Some(pool) => Some(pool),
                    None if self.config.create_pool_if_not_found => {
                        let default_template =
                            get_default_base_job_template(&self.worker_impl.job_configuration_variables());
                        Some(
                            self.backend
                                .create_work_pool(pool_name, &self.config.worker_type, default_template)
                                .await?,
                        )
                    }
                    None => None,
                },
            }
        };

        let Some(pool) = pool else {
            return Ok(());
        };

        // Re-fetch so a freshly created pool and an already-cached one both
        // end up reflecting the backend's canonical view.
        let refreshed = self
            .backend
            .read_work_pool(pool_name)
            .await?
            .unwrap_or(pool);

        *self.cached_pool.write().await = Some(refreshed.clone());

        self.backend
            .send_worker_heartbeat(refreshed.id, self.config.name.as_str())
            .await
    }
}

#[cfg(test)]
mod tests {
    use crate::ports::BackendClient;
    use crate::worker_runtime::tests::{test_runtime, TestBackend};
    use std::sync::Arc;

    #[tokio::test]
    async fn auto_creates_pool_when_absent_and_enabled() {
        let backend = Arc::new(TestBackend::default());
        let runtime = test_runtime(backend.clone(), true).await;

        assert!(runtime.sync_with_backend().await.is_ok());

        let status = runtime.get_status().await;
        let Some(pool) = status.work_pool else {
            unreachable!()
        };
        let by_name = backend
            .read_work_pool(&status.config.work_pool_name.to_string())
            .await
            .unwrap_or_default();
        assert_eq!(Some(pool.id), by_name.map(|pool| pool.id));
    }

    #[tokio::test]
    async fn does_not_create_pool_when_disabled() {
        let backend = Arc::new(TestBackend::default());
        let runtime = test_runtime(backend, false).await;

        assert!(runtime.sync_with_backend().await.is_ok());

        assert!(runtime.get_status().await.work_pool.is_none());
    }

    #[tokio::test]
    async fn successive_syncs_advance_the_heartbeat_clock() {
        let backend = Arc::new(TestBackend::default());
        let runtime = test_runtime(backend.clone(), true).await;

        assert!(runtime.sync_with_backend().await.is_ok());
        let pool_name = runtime.get_status().await.config.work_pool_name.to_string();
        let Some(first) = backend
            .read_workers_for_work_pool(&pool_name)
            .await
            .unwrap_or_default()
            .into_iter()
            .next()
            .and_then(|worker| worker.last_heartbeat_time)
        else {
            unreachable!()
        };

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        assert!(runtime.sync_with_backend().await.is_ok());
        let Some(second) = backend
            .read_workers_for_work_pool(&pool_name)
            .await
            .unwrap_or_default()
            .into_iter()
            .next()
            .and_then(|worker| worker.last_heartbeat_time)
        else {
            unreachable!()
        };

        assert!(second > first);
    }

    #[tokio::test]
    async fn does_not_overwrite_an_existing_base_job_template() {
        let backend = Arc::new(TestBackend::default());
        let runtime = test_runtime(backend.clone(), true).await;
        assert!(runtime.sync_with_backend().await.is_ok());

        let Some(before) = runtime.get_status().await.work_pool.map(|pool| pool.base_job_template) else {
            unreachable!()
        };

        assert!(runtime.sync_with_backend().await.is_ok());
        let Some(after) = runtime.get_status().await.work_pool.map(|pool| pool.base_job_template) else {
            unreachable!()
        };

        assert_eq!(before, after);
    }
}
