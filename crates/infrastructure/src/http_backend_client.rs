use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Method, StatusCode, Url};
use serde::{Deserialize, Serialize};
use workcore_application::{BackendClient, BackendClientTimeout};
use workcore_core::{AppError, AppResult, DeploymentId, FlowRunId, WorkPoolId};
use workcore_domain::{
    BaseJobTemplate, Deployment, DeploymentManifest, FlowRun, FlowRunState, WorkPool,
    WorkerRegistration,
};

/// HTTP adapter implementing [`BackendClient`] against a REST-shaped
/// orchestration backend: bearer-token auth, JSON bodies, `404` mapped to
/// `Ok(None)` for lookups, `409` mapped to `AppError::Conflict`, everything
/// else (network failure, 5xx, non-2xx) mapped to
/// `AppError::TransientBackend`.
///
/// Calls here do not retry internally — the spec's `SyncWithBackend`/
/// `GetAndSubmitFlowRuns`/`ScanStorageForDeployments` activities are each
/// retried whole by the `LoopSupervisor` at the next tick, so retrying a
/// single HTTP call here would just duplicate that backoff.
pub struct HttpBackendClient {
    http_client: reqwest::Client,
    base_url: Url,
    api_key: Option<String>,
}

impl HttpBackendClient {
    /// Builds a client against `base_url`, applying `timeout` to every
    /// request. `api_key`, when set, is sent as a bearer token.
    pub fn new(base_url: &str, api_key: Option<String>, timeout: BackendClientTimeout) -> AppResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|error| AppError::Validation(format!("invalid backend base URL '{base_url}': {error}")))?;

        let http_client = reqwest::Client::builder()
            .timeout(timeout.0)
            .build()
            .map_err(|error| AppError::Internal(format!("failed to build HTTP client: {error}")))?;

        Ok(Self {
            http_client,
            base_url,
            api_key,
        })
    }

    fn url(&self, segments: &[&str]) -> AppResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| AppError::Internal("backend base URL cannot be a base".to_owned()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> reqwest::RequestBuilder {
        let builder = self.http_client.request(method, url);
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    async fn send_json<B: Serialize, T: for<'de> Deserialize<'de>>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&B>,
    ) -> AppResult<T> {
        match self.send(method, segments, body).await? {
            Some(response) => response
                .json::<T>()
                .await
                .map_err(|error| AppError::TransientBackend(format!("malformed backend response: {error}"))),
            None => Err(AppError::NotFound(segments.join("/"))),
        }
    }

    async fn send_json_optional<B: Serialize, T: for<'de> Deserialize<'de>>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&B>,
    ) -> AppResult<Option<T>> {
        match self.send(method, segments, body).await? {
            Some(response) => response
                .json::<T>()
                .await
                .map(Some)
                .map_err(|error| AppError::TransientBackend(format!("malformed backend response: {error}"))),
            None => Ok(None),
        }
    }

    /// Sends one request. Returns `Ok(None)` for a `404` (a lookup miss);
    /// every other non-2xx status or transport failure is an `Err`.
    async fn send<B: Serialize>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&B>,
    ) -> AppResult<Option<reqwest::Response>> {
        let url = self.url(segments)?;
        let mut request = self.request(method, url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|error| {
            AppError::TransientBackend(format!("backend request transport error: {error}"))
        })?;

        match response.status() {
            status if status.is_success() => Ok(Some(response)),
            StatusCode::NOT_FOUND => Ok(None),
            StatusCode::CONFLICT => {
                let body = response_body_snippet(response).await;
                Err(AppError::Conflict(body))
            }
            status if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS => {
                let body = response_body_snippet(response).await;
                Err(AppError::TransientBackend(format!("backend returned {status}: {body}")))
            }
            status => {
                let body = response_body_snippet(response).await;
                Err(AppError::Internal(format!("backend returned {status}: {body}")))
            }
        }
    }
}

async fn response_body_snippet(response: reqwest::Response) -> String {
    response
        .text()
        .await
        .unwrap_or_else(|_| "<response body unavailable>".to_owned())
}

#[derive(Debug, Serialize)]
struct CreateWorkPoolRequest<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    pool_type: &'a str,
    base_job_template: &'a BaseJobTemplate,
}

#[derive(Debug, Serialize)]
struct HeartbeatRequest<'a> {
    name: &'a str,
}

#[derive(Debug, Serialize)]
struct ScheduledFlowRunsFilter {
    work_pool_id: WorkPoolId,
    scheduled_before: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct SetStateRequest {
    state: FlowRunState,
}

#[derive(Debug, Deserialize)]
struct SetStateResponse {
    status: SetStateStatus,
}

#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
enum SetStateStatus {
    Accepted,
    Abort,
    Reject,
    Wait,
}

#[async_trait]
impl BackendClient for HttpBackendClient {
    async fn read_work_pool(&self, name: &str) -> AppResult<Option<WorkPool>> {
        self.send_json_optional::<(), WorkPool>(Method::GET, &["work_pools", "name", name], None)
            .await
    }

    async fn create_work_pool(
        &self,
        name: &str,
        pool_type: &str,
        base_job_template: BaseJobTemplate,
    ) -> AppResult<WorkPool> {
        let request = CreateWorkPoolRequest {
            name,
            pool_type,
            base_job_template: &base_job_template,
        };
        self.send_json(Method::POST, &["work_pools"], Some(&request)).await
    }

    async fn send_worker_heartbeat(&self, pool_id: WorkPoolId, worker_name: &str) -> AppResult<()> {
        let request = HeartbeatRequest { name: worker_name };
        let pool_id = pool_id.to_string();
        self.send(
            Method::POST,
            &["work_pools", pool_id.as_str(), "workers", "heartbeat"],
            Some(&request),
        )
        .await?;
        Ok(())
    }

    async fn read_workers_for_work_pool(&self, pool_name: &str) -> AppResult<Vec<WorkerRegistration>> {
        Ok(self
            .send_json_optional::<(), Vec<WorkerRegistration>>(
                Method::GET,
                &["work_pools", "name", pool_name, "workers"],
                None,
            )
            .await?
            .unwrap_or_default())
    }

    async fn get_scheduled_flow_runs(
        &self,
        pool_id: WorkPoolId,
        scheduled_before: DateTime<Utc>,
    ) -> AppResult<Vec<FlowRun>> {
        let request = ScheduledFlowRunsFilter {
            work_pool_id: pool_id,
            scheduled_before,
        };
        self.send_json(Method::POST, &["flow_runs", "filter"], Some(&request)).await
    }

    async fn read_deployment(&self, id: DeploymentId) -> AppResult<Option<Deployment>> {
        let id = id.to_string();
        self.send_json_optional::<(), Deployment>(Method::GET, &["deployments", id.as_str()], None)
            .await
    }

    async fn read_deployment_by_name(
        &self,
        flow_name: &str,
        deployment_name: &str,
    ) -> AppResult<Option<Deployment>> {
        self.send_json_optional::<(), Deployment>(
            Method::GET,
            &["deployments", "name", flow_name, deployment_name],
            None,
        )
        .await
    }

    async fn apply_deployment(&self, manifest: &DeploymentManifest) -> AppResult<Deployment> {
        self.send_json(Method::POST, &["deployments"], Some(manifest)).await
    }

    async fn read_deployments(&self) -> AppResult<Vec<Deployment>> {
        self.send_json(Method::GET, &["deployments"], None::<&()>).await
    }

    async fn set_flow_run_state(&self, id: FlowRunId, state: FlowRunState) -> AppResult<bool> {
        let id = id.to_string();
        let request = SetStateRequest { state };
        let response: SetStateResponse = self
            .send_json(Method::POST, &["flow_runs", id.as_str(), "set_state"], Some(&request))
            .await?;
        Ok(response.status == SetStateStatus::Accepted)
    }
}
