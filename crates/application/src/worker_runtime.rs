use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinSet;
use workcore_core::{AppError, AppResult, NonEmptyString};
use workcore_domain::WorkPool;

use crate::concurrency_limiter::ConcurrencyLimiter;
use crate::ports::{BackendClient, ManifestStore, WorkerImpl};

mod scan;
mod submit;
mod sync;

/// Configuration options for one [`WorkerRuntime`]. Only `work_pool_name`
/// is required; everything else has a default.
#[derive(Debug, Clone)]
pub struct WorkerRuntimeConfig {
    /// Worker registration name; defaults to a generated unique string.
    pub name: NonEmptyString,
    /// Target pool name.
    pub work_pool_name: NonEmptyString,
    /// Worker type tag, used to auto-create the pool if absent.
    pub worker_type: String,
    /// Create the pool if it does not yet exist.
    pub create_pool_if_not_found: bool,
    /// Maximum concurrently in-flight flow runs; `None` is unlimited.
    pub limit: Option<usize>,
    /// How far into the future to look for scheduled runs.
    pub prefetch_seconds: i64,
    /// Directory scanned for deployment manifests.
    pub workflow_storage_path: std::path::PathBuf,
    /// Period of `SyncWithBackend`.
    pub heartbeat_seconds: u64,
    /// Period of `GetAndSubmitFlowRuns`.
    pub query_seconds: u64,
    /// Period of `ScanStorageForDeployments`.
    pub storage_scan_seconds: u64,
}

/// Snapshot returned by [`WorkerRuntime::get_status`]. Pure function over
/// current state; does not touch the network.
#[derive(Debug, Clone)]
pub struct StatusReport {
    pub worker_name: String,
    pub work_pool: Option<WorkPool>,
    pub config: WorkerRuntimeConfig,
}

/// Lifecycle object for one worker process: owns the cached work pool
/// snapshot, the backend client handle, the concurrency limiter, and the
/// set of in-flight submissions.
pub struct WorkerRuntime {
    pub(crate) config: WorkerRuntimeConfig,
    pub(crate) backend: Arc<dyn BackendClient>,
    pub(crate) manifest_store: Arc<dyn ManifestStore>,
    pub(crate) worker_impl: Arc<dyn WorkerImpl>,
    pub(crate) limiter: Arc<ConcurrencyLimiter>,
    pub(crate) cached_pool: RwLock<Option<WorkPool>>,
    /// One task per flow run currently being submitted (spawned by
    /// `submit_one`). Tracked so `teardown` can cancel them instead of
    /// leaving them detached.
    pub(crate) submissions: Mutex<JoinSet<()>>,
    pub(crate) start_time: SystemTime,
}

impl WorkerRuntime {
    /// Scoped acquisition: ensures the storage directory exists, records
    /// start time, and wires the concurrency limiter at `config.limit`
    /// capacity. Idempotent. Fails with `AppError::Setup` if the storage
    /// path cannot be created.
    pub async fn setup(
        config: WorkerRuntimeConfig,
        backend: Arc<dyn BackendClient>,
        manifest_store: Arc<dyn ManifestStore>,
        worker_impl: Arc<dyn WorkerImpl>,
    ) -> AppResult<Self> {
        if config.worker_type != worker_impl.worker_type() {
            return Err(AppError::Setup(format!(
                "configured worker_type '{}' does not match registered implementation '{}'",
                config.worker_type,
                worker_impl.worker_type()
            )));
        }

        manifest_store
            .ensure_storage_exists()
            .await
            .map_err(|error| AppError::Setup(format!("failed to prepare workflow storage: {error}")))?;

        let limiter = Arc::new(ConcurrencyLimiter::new(config.limit));

        Ok(Self {
            config,
            backend,
            manifest_store,
            worker_impl,
            limiter,
            cached_pool: RwLock::new(None),
            submissions: Mutex::new(JoinSet::new()),
            start_time: SystemTime::now(),
        })
    }

    /// Releases the backend client handle and cancels in-flight
    /// submissions. Safe to call once; every activity loop is cooperatively
    /// cancelled by the supervisor separately, but submission tasks are
    /// owned here, so teardown is what actually stops them.
    pub async fn teardown(&self) {
        tracing::info!(worker_name = %self.config.name, "worker runtime tearing down");
        self.submissions.lock().await.shutdown().await;
    }

    /// Opportunistically drains completed submission tasks from the
    /// tracked join set so it does not grow without bound. Never blocks
    /// waiting for a task that is still running.
    pub(crate) async fn reap_finished_submissions(&self) {
        let mut submissions = self.submissions.lock().await;
        while submissions.try_join_next().is_some() {}
    }

    /// Snapshot: worker name, cached pool (or none), configured settings.
    pub async fn get_status(&self) -> StatusReport {
        StatusReport {
            worker_name: self.config.name.as_str().to_owned(),
            work_pool: self.cached_pool.read().await.clone(),
            config: self.config.clone(),
        }
    }

    /// How long this runtime has been up.
    #[must_use]
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed().unwrap_or_default()
    }
}
