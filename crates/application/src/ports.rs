use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use workcore_core::{AppResult, DeploymentId, FlowRunId, WorkPoolId};
use workcore_domain::{Deployment, FlowRun, FlowRunState, JobConfiguration, WorkPool, WorkerRegistration};

/// Logical backend operations the worker depends on. Wire format, auth, and
/// transport are the adapter's business; this trait only pins the
/// operations and their error semantics (`NotFound`/`Conflict` are ordinary
/// return values, not transport failures).
#[async_trait]
pub trait BackendClient: Send + Sync {
    /// Looks up a work pool by its unique name. Returns `Ok(None)` when no
    /// such pool exists (callers distinguish this from a transport error).
    async fn read_work_pool(&self, name: &str) -> AppResult<Option<WorkPool>>;

    /// Creates a work pool with the given name, type, and default template.
    /// Fails with `AppError::Conflict` if the name is already taken.
    async fn create_work_pool(
        &self,
        name: &str,
        pool_type: &str,
        base_job_template: workcore_domain::BaseJobTemplate,
    ) -> AppResult<WorkPool>;

    /// Records a heartbeat for `worker_name` within `pool_id`.
    async fn send_worker_heartbeat(&self, pool_id: WorkPoolId, worker_name: &str) -> AppResult<()>;

    /// Lists the worker registrations currently known for a pool, by name.
    async fn read_workers_for_work_pool(&self, pool_name: &str) -> AppResult<Vec<WorkerRegistration>>;

    /// Returns `Scheduled` flow runs with a non-null deployment, due at or
    /// before `scheduled_before`, sorted by `scheduled_time` ascending.
    async fn get_scheduled_flow_runs(
        &self,
        pool_id: WorkPoolId,
        scheduled_before: DateTime<Utc>,
    ) -> AppResult<Vec<FlowRun>>;

    /// Looks up a deployment by id.
    async fn read_deployment(&self, id: DeploymentId) -> AppResult<Option<Deployment>>;

    /// Looks up a deployment by its logical `(flow_name, deployment_name)`.
    async fn read_deployment_by_name(
        &self,
        flow_name: &str,
        deployment_name: &str,
    ) -> AppResult<Option<Deployment>>;

    /// Creates or updates a deployment from a parsed manifest.
    async fn apply_deployment(&self, manifest: &workcore_domain::DeploymentManifest) -> AppResult<Deployment>;

    /// Lists every deployment known to the backend.
    async fn read_deployments(&self) -> AppResult<Vec<Deployment>>;

    /// Attempts to transition a flow run's state. Returns `Ok(true)` if the
    /// transition was accepted, `Ok(false)` on a lost race (the run was
    /// already in a state this worker did not expect).
    async fn set_flow_run_state(&self, id: FlowRunId, state: FlowRunState) -> AppResult<bool>;
}

/// Read-only scanner over a workflow-storage directory, yielding parsed
/// deployment manifests. One malformed file must not abort a scan; the
/// store itself performs no backend reconciliation.
#[async_trait]
pub trait ManifestStore: Send + Sync {
    /// Ensures the backing storage location exists (idempotent).
    async fn ensure_storage_exists(&self) -> AppResult<()>;

    /// Scans the storage location, returning one entry per file: either the
    /// successfully parsed manifest, or the parse error to log.
    async fn scan(&self) -> AppResult<Vec<ManifestScanEntry>>;
}

/// Outcome of parsing one file found during a manifest scan.
pub enum ManifestScanEntry {
    Parsed(workcore_domain::DeploymentManifest),
    ParseError { path: String, message: String },
}

/// Per-worker-type execution hook plus the static metadata used to build a
/// default job template. Implementations are registered in a process-wide
/// `type-tag → WorkerImpl` mapping populated at program start.
#[async_trait]
pub trait WorkerImpl: Send + Sync {
    /// The worker type tag this implementation serves, e.g. `"process"`.
    fn worker_type(&self) -> &'static str;

    /// Static per-field template metadata, folded by
    /// `GetDefaultBaseJobTemplate` into a `BaseJobTemplate`.
    fn job_configuration_variables(&self) -> Vec<JobTemplateField>;

    /// Performs the actual execution/dispatch for one flow run. Errors are
    /// caught by the submission pipeline and surfaced as `Crashed`.
    async fn run(&self, flow_run: &FlowRun, configuration: &JobConfiguration) -> AppResult<()>;

    /// Called during a storage scan for each applied deployment; may
    /// reject or adapt it. Treated as advisory: a failure is logged, the
    /// deployment stays applied.
    async fn verify_submitted_deployment(&self, deployment: &Deployment) -> AppResult<()>;
}

/// One declared template field: a placeholder name plus the JSON-Schema
/// metadata describing it (type, title, description, default). A field with
/// no default is required; `GetDefaultBaseJobTemplate` derives this from
/// `default` alone, so the struct itself carries no separate `required` flag.
#[derive(Debug, Clone)]
pub struct JobTemplateField {
    pub name: String,
    pub json_type: &'static str,
    pub title: String,
    pub description: Option<String>,
    pub default: Option<serde_json::Value>,
    /// The `{{ variable }}` expression substituted into `job_configuration`.
    pub template_expr: String,
}

/// Timeout budget applied to every backend call by an adapter.
#[derive(Debug, Clone, Copy)]
pub struct BackendClientTimeout(pub Duration);

impl Default for BackendClientTimeout {
    fn default() -> Self {
        Self(Duration::from_secs(15))
    }
}
