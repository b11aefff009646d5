use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinSet;

use crate::worker_runtime::WorkerRuntime;

/// One of the three periodic activities a [`LoopSupervisor`] schedules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Activity {
    SyncWithBackend,
    ScanStorageForDeployments,
    GetAndSubmitFlowRuns,
}

impl Activity {
    fn as_str(self) -> &'static str {
        match self {
            Self::SyncWithBackend => "sync_with_backend",
            Self::ScanStorageForDeployments => "scan_storage_for_deployments",
            Self::GetAndSubmitFlowRuns => "get_and_submit_flow_runs",
        }
    }

    async fn run(self, runtime: &WorkerRuntime) -> workcore_core::AppResult<()> {
        match self {
            Self::SyncWithBackend => runtime.sync_with_backend().await,
            Self::ScanStorageForDeployments => runtime.scan_storage_for_deployments().await,
            Self::GetAndSubmitFlowRuns => runtime.get_and_submit_flow_runs().await.map(|_| ()),
        }
    }
}

/// Schedules and restarts the three periodic activities under a shared
/// cancellation scope. Child activity failures are logged and retried at
/// the next tick; they never cancel the supervisor or siblings.
pub struct LoopSupervisor {
    runtime: Arc<WorkerRuntime>,
    cancel_tx: watch::Sender<bool>,
}

impl LoopSupervisor {
    /// Creates a supervisor for `runtime`.
    #[must_use]
    pub fn new(runtime: Arc<WorkerRuntime>) -> Self {
        let (cancel_tx, _) = watch::channel(false);
        Self { runtime, cancel_tx }
    }

    /// Requests cancellation; every activity loop exits at its next
    /// suspension point.
    pub fn cancel(&self) {
        let _ = self.cancel_tx.send(true);
    }

    /// Runs each periodic activity exactly once, in spec order, and
    /// returns. Used by `run_once` hosts and by the end-to-end tests in
    /// `§8`.
    pub async fn run_once(&self) {
        for activity in [
            Activity::SyncWithBackend,
            Activity::ScanStorageForDeployments,
            Activity::GetAndSubmitFlowRuns,
        ] {
            if let Err(error) = activity.run(&self.runtime).await {
                tracing::warn!(activity = activity.as_str(), error = %error, "activity failed");
            }
        }
    }

    /// Runs the three activities forever, each on its own period, until
    /// `cancel` is called. Consecutive failures of one activity are logged
    /// at increasing severity; they never affect the other activities.
    pub async fn run(&self) {
        let mut tasks = JoinSet::new();

        tasks.spawn(periodic_loop(
            Arc::clone(&self.runtime),
            Activity::SyncWithBackend,
            Duration::from_secs(self.runtime.config.heartbeat_seconds),
            self.cancel_tx.subscribe(),
        ));
        tasks.spawn(periodic_loop(
            Arc::clone(&self.runtime),
            Activity::ScanStorageForDeployments,
            Duration::from_secs(self.runtime.config.storage_scan_seconds),
            self.cancel_tx.subscribe(),
        ));
        tasks.spawn(periodic_loop(
            Arc::clone(&self.runtime),
            Activity::GetAndSubmitFlowRuns,
            Duration::from_secs(self.runtime.config.query_seconds),
            self.cancel_tx.subscribe(),
        ));

        while tasks.join_next().await.is_some() {}
    }
}

async fn periodic_loop(
    runtime: Arc<WorkerRuntime>,
    activity: Activity,
    period: Duration,
    mut cancel_rx: watch::Receiver<bool>,
) {
    let mut consecutive_failures: u32 = 0;

    // `interval_at` + `Skip` measures each tick from the start of the
    // previous one rather than from when the workload finished, and drops
    // ticks missed while a slow iteration was running instead of firing
    // them back-to-back once it catches up.
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            changed = cancel_rx.changed() => {
                if changed.is_err() || *cancel_rx.borrow() {
                    return;
                }
            }
            _ = ticker.tick() => {
                match activity.run(&runtime).await {
                    Ok(()) => consecutive_failures = 0,
                    Err(error) => {
                        consecutive_failures = consecutive_failures.saturating_add(1);
                        tracing::warn!(
                            activity = activity.as_str(),
                            error = %error,
                            consecutive_failures,
                            "periodic activity failed; retrying next tick"
                        );
                    }
                }
            }
        }
    }
}
