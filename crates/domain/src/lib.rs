//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod deployment;
mod flow_run;
mod job_configuration;
mod manifest;
mod work_pool;
mod worker_registration;

pub use deployment::Deployment;
pub use flow_run::{FlowRun, FlowRunState};
pub use job_configuration::JobConfiguration;
pub use manifest::DeploymentManifest;
pub use work_pool::{BaseJobTemplate, TemplateVariablesSchema, WorkPool};
pub use worker_registration::WorkerRegistration;
