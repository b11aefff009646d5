//! Application services and ports for the workflow worker.

#![forbid(unsafe_code)]

mod concurrency_limiter;
mod job_template;
mod loop_supervisor;
mod ports;
mod worker_runtime;

pub use concurrency_limiter::ConcurrencyLimiter;
pub use job_template::{from_template_and_overrides, get_default_base_job_template};
pub use loop_supervisor::{Activity, LoopSupervisor};
pub use ports::{BackendClient, BackendClientTimeout, JobTemplateField, ManifestScanEntry, ManifestStore, WorkerImpl};
pub use worker_runtime::{StatusReport, WorkerRuntime, WorkerRuntimeConfig};
