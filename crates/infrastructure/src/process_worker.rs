use async_trait::async_trait;
use serde_json::Value;
use tokio::process::Command;
use workcore_application::{JobTemplateField, WorkerImpl};
use workcore_core::{AppError, AppResult};
use workcore_domain::{Deployment, FlowRun, JobConfiguration};

/// Worker type tag served by [`ProcessWorkerImpl`].
pub const WORKER_TYPE: &str = "process";

/// Reference `WorkerImpl`: runs a flow run's resolved `command` as a local
/// subprocess. The only extra field this worker type declares beyond the
/// baseline `command`/`env` is `working_dir`, an optional directory the
/// subprocess is spawned in.
#[derive(Debug, Default)]
pub struct ProcessWorkerImpl;

impl ProcessWorkerImpl {
    /// Creates a process worker implementation.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl WorkerImpl for ProcessWorkerImpl {
    fn worker_type(&self) -> &'static str {
        WORKER_TYPE
    }

    fn job_configuration_variables(&self) -> Vec<JobTemplateField> {
        vec![JobTemplateField {
            name: "working_dir".to_owned(),
            json_type: "string",
            title: "Working Directory".to_owned(),
            description: Some("The working directory to open before starting the flow run. If not set, the current directory is used.".to_owned()),
            default: Some(serde_json::Value::Null),
            template_expr: "{{ working_dir }}".to_owned(),
        }]
    }

    async fn run(&self, flow_run: &FlowRun, configuration: &JobConfiguration) -> AppResult<()> {
        let Some(command_line) = configuration.command.as_deref() else {
            return Err(AppError::Run(format!(
                "flow run {} has no command to execute",
                flow_run.id
            )));
        };

        let mut parts = command_line.split_whitespace();
        let Some(program) = parts.next() else {
            return Err(AppError::Run(format!(
                "flow run {} resolved to an empty command",
                flow_run.id
            )));
        };

        let mut process = Command::new(program);
        process.args(parts).envs(configuration.env.iter());

        if let Some(working_dir) = configuration.extra.get("working_dir").and_then(Value::as_str) {
            process.current_dir(working_dir);
        }

        tracing::info!(flow_run = %flow_run.id, command = %command_line, "starting flow run subprocess");

        let status = process
            .status()
            .await
            .map_err(|error| AppError::Run(format!("failed to spawn subprocess for flow run {}: {error}", flow_run.id)))?;

        if !status.success() {
            return Err(AppError::Run(format!(
                "flow run {} subprocess exited with {status}",
                flow_run.id
            )));
        }

        Ok(())
    }

    async fn verify_submitted_deployment(&self, deployment: &Deployment) -> AppResult<()> {
        if deployment.entrypoint.trim().is_empty() {
            return Err(AppError::Validation(format!(
                "deployment '{}' has an empty entrypoint",
                deployment.name
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::ProcessWorkerImpl;
    use chrono::Utc;
    use workcore_application::WorkerImpl;
    use workcore_core::FlowRunId;
    use workcore_domain::{FlowRun, FlowRunState, JobConfiguration};

    fn flow_run() -> FlowRun {
        FlowRun {
            id: FlowRunId::new(),
            deployment_id: None,
            state: FlowRunState::Pending,
            scheduled_time: Utc::now(),
            name: "run".to_owned(),
        }
    }

    #[tokio::test]
    async fn run_without_a_command_is_a_run_error() {
        let worker = ProcessWorkerImpl::new();
        let result = worker.run(&flow_run(), &JobConfiguration::default()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn run_executes_the_resolved_command() {
        let worker = ProcessWorkerImpl::new();
        let configuration = JobConfiguration {
            command: Some("true".to_owned()),
            ..Default::default()
        };
        assert!(worker.run(&flow_run(), &configuration).await.is_ok());
    }

    #[tokio::test]
    async fn run_surfaces_a_nonzero_exit_as_a_run_error() {
        let worker = ProcessWorkerImpl::new();
        let configuration = JobConfiguration {
            command: Some("false".to_owned()),
            ..Default::default()
        };
        let result = worker.run(&flow_run(), &configuration).await;
        assert!(result.is_err());
    }

    #[test]
    fn declares_the_working_dir_variable() {
        let worker = ProcessWorkerImpl::new();
        let fields = worker.job_configuration_variables();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].name, "working_dir");
        assert_eq!(fields[0].default, Some(serde_json::Value::Null));
    }
}
