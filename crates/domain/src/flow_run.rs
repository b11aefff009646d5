use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use workcore_core::{DeploymentId, FlowRunId};

/// Backend-owned record of one scheduled or in-progress execution of a flow.
///
/// The worker only acts on runs whose `deployment_id` is set and whose
/// `state` is [`FlowRunState::Scheduled`] with `scheduled_time` inside the
/// prefetch window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowRun {
    pub id: FlowRunId,
    pub deployment_id: Option<DeploymentId>,
    pub state: FlowRunState,
    pub scheduled_time: DateTime<Utc>,
    pub name: String,
}

impl FlowRun {
    /// Whether this run is eligible for submission: a deployment is set,
    /// the state is `Scheduled`, and `scheduled_time` falls within
    /// `now + prefetch_window`.
    #[must_use]
    pub fn is_eligible_for_submission(&self, now: DateTime<Utc>, prefetch_window: chrono::Duration) -> bool {
        self.deployment_id.is_some()
            && self.state == FlowRunState::Scheduled
            && self.scheduled_time <= now + prefetch_window
    }
}

/// Lifecycle state of a flow run, as tracked by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FlowRunState {
    Scheduled,
    Pending,
    Running,
    Completed,
    Failed,
    Crashed,
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::{FlowRun, FlowRunState};
    use chrono::{Duration, Utc};
    use workcore_core::{DeploymentId, FlowRunId};

    fn run(state: FlowRunState, scheduled_offset: Duration, deployment_id: Option<DeploymentId>) -> FlowRun {
        FlowRun {
            id: FlowRunId::new(),
            deployment_id,
            state,
            scheduled_time: Utc::now() + scheduled_offset,
            name: "run".to_owned(),
        }
    }

    #[test]
    fn eligible_when_scheduled_within_window_and_has_deployment() {
        let candidate = run(FlowRunState::Scheduled, Duration::seconds(5), Some(DeploymentId::new()));
        assert!(candidate.is_eligible_for_submission(Utc::now(), Duration::seconds(10)));
    }

    #[test]
    fn ineligible_without_deployment() {
        let candidate = run(FlowRunState::Scheduled, Duration::seconds(5), None);
        assert!(!candidate.is_eligible_for_submission(Utc::now(), Duration::seconds(10)));
    }

    #[test]
    fn ineligible_when_not_scheduled() {
        let candidate = run(FlowRunState::Running, Duration::seconds(5), Some(DeploymentId::new()));
        assert!(!candidate.is_eligible_for_submission(Utc::now(), Duration::seconds(10)));
    }

    #[test]
    fn ineligible_outside_prefetch_window() {
        let candidate = run(FlowRunState::Scheduled, Duration::seconds(20), Some(DeploymentId::new()));
        assert!(!candidate.is_eligible_for_submission(Utc::now(), Duration::seconds(10)));
    }
}
