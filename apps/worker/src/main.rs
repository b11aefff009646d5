//! Workcore worker runtime entrypoint.
//!
//! Flag parsing here is deliberately minimal (`--run-once` is the only
//! recognized flag): the CLI/flag layer is an external collaborator per
//! the worker core's spec, not something this binary needs to make rich.
//! Everything else is configured through environment variables, the same
//! way the teacher's `WorkerConfig::load()` does it.

#![forbid(unsafe_code)]

use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use workcore_application::{BackendClientTimeout, LoopSupervisor, WorkerRuntime, WorkerRuntimeConfig};
use workcore_core::{AppError, AppResult, NonEmptyString};
use workcore_infrastructure::{FilesystemManifestStore, HttpBackendClient, ProcessWorkerImpl, PROCESS_WORKER_TYPE};

#[derive(Debug, Clone)]
struct WorkerConfig {
    api_base_url: String,
    api_key: Option<String>,
    backend_timeout_seconds: u64,
    name: String,
    work_pool_name: String,
    worker_type: String,
    create_pool_if_not_found: bool,
    limit: Option<usize>,
    prefetch_seconds: i64,
    workflow_storage_path: PathBuf,
    heartbeat_seconds: u64,
    query_seconds: u64,
    storage_scan_seconds: u64,
}

impl WorkerConfig {
    fn load() -> AppResult<Self> {
        let api_base_url = required_env("WORKCORE_API_URL")?.trim_end_matches('/').to_owned();
        let api_key = env::var("WORKCORE_API_KEY")
            .ok()
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty());
        let backend_timeout_seconds = parse_env_u64("WORKCORE_BACKEND_TIMEOUT_SECONDS", 15)?;

        let name = env::var("WORKER_NAME")
            .ok()
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| format!("worker-{}", std::process::id()));
        let work_pool_name = required_env("WORK_POOL_NAME")?;
        let worker_type = env::var("WORKER_TYPE")
            .ok()
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| PROCESS_WORKER_TYPE.to_owned());

        let create_pool_if_not_found = parse_env_bool("CREATE_POOL_IF_NOT_FOUND", true)?;
        let limit = parse_optional_env_usize("WORKER_LIMIT")?;
        let prefetch_seconds = parse_env_u64("PREFETCH_SECONDS", 10)?
            .try_into()
            .map_err(|_| AppError::Validation("PREFETCH_SECONDS is too large".to_owned()))?;

        let workflow_storage_path = env::var("WORKFLOW_STORAGE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./flows"));

        let heartbeat_seconds = parse_env_u64("HEARTBEAT_SECONDS", 30)?;
        let query_seconds = parse_env_u64("QUERY_SECONDS", 15)?;
        let storage_scan_seconds = parse_env_u64("STORAGE_SCAN_SECONDS", 60)?;

        if heartbeat_seconds == 0 || query_seconds == 0 || storage_scan_seconds == 0 {
            return Err(AppError::Validation(
                "HEARTBEAT_SECONDS, QUERY_SECONDS and STORAGE_SCAN_SECONDS must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            api_base_url,
            api_key,
            backend_timeout_seconds,
            name,
            work_pool_name,
            worker_type,
            create_pool_if_not_found,
            limit,
            prefetch_seconds,
            workflow_storage_path,
            heartbeat_seconds,
            query_seconds,
            storage_scan_seconds,
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    workcore_core::init_tracing();

    let run_once = env::args().any(|arg| arg == "--run-once");
    let config = WorkerConfig::load()?;

    info!(
        worker_name = %config.name,
        work_pool_name = %config.work_pool_name,
        worker_type = %config.worker_type,
        api_base_url = %config.api_base_url,
        run_once,
        "workcore-worker starting"
    );

    let backend = HttpBackendClient::new(
        config.api_base_url.as_str(),
        config.api_key.clone(),
        BackendClientTimeout(Duration::from_secs(config.backend_timeout_seconds)),
    )?;
    let manifest_store = FilesystemManifestStore::new(config.workflow_storage_path.clone());
    let worker_impl = ProcessWorkerImpl::new();

    let runtime_config = WorkerRuntimeConfig {
        name: NonEmptyString::new(config.name.clone())?,
        work_pool_name: NonEmptyString::new(config.work_pool_name.clone())?,
        worker_type: config.worker_type.clone(),
        create_pool_if_not_found: config.create_pool_if_not_found,
        limit: config.limit,
        prefetch_seconds: config.prefetch_seconds,
        workflow_storage_path: config.workflow_storage_path.clone(),
        heartbeat_seconds: config.heartbeat_seconds,
        query_seconds: config.query_seconds,
        storage_scan_seconds: config.storage_scan_seconds,
    };

    let runtime = WorkerRuntime::setup(
        runtime_config,
        Arc::new(backend),
        Arc::new(manifest_store),
        Arc::new(worker_impl),
    )
    .await?;

    // An initial sync and scan, matching the reference CLI's behavior of
    // configuring the worker (pool cache, heartbeat) before any periodic
    // loop starts polling for flow runs.
    if let Err(error) = runtime.sync_with_backend().await {
        tracing::warn!(error = %error, "initial sync with backend failed; will retry on schedule");
    }
    if let Err(error) = runtime.scan_storage_for_deployments().await {
        tracing::warn!(error = %error, "initial storage scan failed; will retry on schedule");
    }

    if runtime.get_status().await.work_pool.is_none() && !config.create_pool_if_not_found {
        return Err(AppError::Setup(format!(
            "work pool '{}' does not exist and CREATE_POOL_IF_NOT_FOUND is false",
            config.work_pool_name
        )));
    }

    let runtime = Arc::new(runtime);
    let supervisor = Arc::new(LoopSupervisor::new(Arc::clone(&runtime)));

    if run_once {
        supervisor.run_once().await;
    } else {
        let run_supervisor = Arc::clone(&supervisor);
        let run_handle = tokio::spawn(async move { run_supervisor.run().await });

        tokio::signal::ctrl_c()
            .await
            .map_err(|error| AppError::Internal(format!("failed to listen for shutdown signal: {error}")))?;

        info!(worker_name = %runtime.get_status().await.worker_name, "received shutdown signal");
        supervisor.cancel();
        let _ = run_handle.await;
    }

    runtime.teardown().await;
    info!("workcore-worker stopped");

    Ok(())
}

fn required_env(name: &str) -> AppResult<String> {
    env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))
}

fn parse_env_u64(name: &str, default: u64) -> AppResult<u64> {
    match env::var(name) {
        Ok(value) => value
            .parse::<u64>()
            .map_err(|error| AppError::Validation(format!("invalid {name} value '{value}': {error}"))),
        Err(_) => Ok(default),
    }
}

fn parse_optional_env_usize(name: &str) -> AppResult<Option<usize>> {
    match env::var(name) {
        Ok(value) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            trimmed
                .parse::<usize>()
                .map(Some)
                .map_err(|error| AppError::Validation(format!("invalid {name} value '{value}': {error}")))
        }
        Err(_) => Ok(None),
    }
}

fn parse_env_bool(name: &str, default: bool) -> AppResult<bool> {
    match env::var(name) {
        Ok(value) => match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(AppError::Validation(format!("invalid {name} value '{other}'"))),
        },
        Err(_) => Ok(default),
    }
}
