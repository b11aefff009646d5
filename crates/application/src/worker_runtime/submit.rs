use std::collections::HashSet;

use chrono::Utc;
use workcore_core::{AppResult, FlowRunId};
use workcore_domain::{FlowRun, FlowRunState, WorkPool};

use crate::job_template::from_template_and_overrides;

use super::WorkerRuntime;

impl WorkerRuntime {
    /// Returns the set of flow runs for which acquisition succeeded in this
    /// call; for each, [`crate::ports::WorkerImpl::run`] has been started
    /// (cooperatively — it may still be executing when this call returns).
    pub async fn get_and_submit_flow_runs(&self) -> AppResult<HashSet<FlowRunId>> {
        self.reap_finished_submissions().await;

        let Some(pool) = self.cached_pool.read().await.clone() else {
            return Ok(HashSet::new());
        };

        if pool.is_paused {
            return Ok(HashSet::new());
        }

        let scheduled_before = Utc::now() + chrono::Duration::seconds(self.config.prefetch_seconds);
        let candidates = self
            .backend
            .get_scheduled_flow_runs(pool.id, scheduled_before)
            .await?;

        let mut submitted = HashSet::new();

        for candidate in candidates {
            let run_id = candidate.id;

            if !self.limiter.try_acquire_on_behalf_of(run_id).await {
                break;
            }

            if self.submit_one(&pool, candidate).await {
                submitted.insert(run_id);
            }
        }

        Ok(submitted)
    }

    /// Attempts to submit one already-acquired candidate. The caller has
    /// already acquired a limiter slot for `candidate.id`; every path out of
    /// this function releases that slot, except a successfully spawned run,
    /// where the spawned task releases it on completion. A backend error on
    /// any step is logged and treated the same as a lost-race conflict: the
    /// slot is released and this candidate is skipped, so the caller moves
    /// on to the next one instead of aborting the whole cycle.
    async fn submit_one(&self, pool: &WorkPool, candidate: FlowRun) -> bool {
        let run_id = candidate.id;

        let Some(deployment_id) = candidate.deployment_id else {
            self.limiter.release(run_id).await;
            return false;
        };

        let deployment = match self.backend.read_deployment(deployment_id).await {
            Ok(Some(deployment)) => deployment,
            Ok(None) => {
                self.limiter.release(run_id).await;
                return false;
            }
            Err(error) => {
                tracing::warn!(flow_run = %run_id, error = %error, "failed to read deployment; releasing slot");
                self.limiter.release(run_id).await;
                return false;
            }
        };

        if deployment.storage_document_id.is_some() {
            tracing::warn!(
                flow_run = %run_id,
                "workers currently only support local storage; use an agent"
            );
            self.limiter.release(run_id).await;
            return false;
        }

        let configuration = match from_template_and_overrides(&pool.base_job_template, &deployment.job_variables) {
            Ok(configuration) => configuration,
            Err(error) => {
                tracing::warn!(flow_run = %run_id, error = %error, "job configuration resolution failed");
                let _ = self.backend.set_flow_run_state(run_id, FlowRunState::Crashed).await;
                self.limiter.release(run_id).await;
                return false;
            }
        };

        let transitioned = match self.backend.set_flow_run_state(run_id, FlowRunState::Pending).await {
            Ok(transitioned) => transitioned,
            Err(error) => {
                tracing::warn!(flow_run = %run_id, error = %error, "failed to transition flow run to pending; releasing slot");
                self.limiter.release(run_id).await;
                return false;
            }
        };
        if !transitioned {
            self.limiter.release(run_id).await;
            return false;
        }

        let backend = self.backend.clone();
        let worker_impl = self.worker_impl.clone();
        let limiter = self.limiter.clone();

        self.submissions.lock().await.spawn(async move {
            if let Err(error) = worker_impl.run(&candidate, &configuration).await {
                tracing::warn!(flow_run = %run_id, error = %error, "flow run execution failed");
                let _ = backend.set_flow_run_state(run_id, FlowRunState::Crashed).await;
            }
            limiter.release(run_id).await;
        });

        true
    }
}
