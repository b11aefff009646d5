//! Reference adapters for the application crate's ports: an HTTP
//! `BackendClient`, a filesystem `ManifestStore`, and a subprocess
//! `WorkerImpl`.

#![forbid(unsafe_code)]

mod filesystem_manifest_store;
mod http_backend_client;
mod process_worker;

pub use filesystem_manifest_store::FilesystemManifestStore;
pub use http_backend_client::HttpBackendClient;
pub use process_worker::{ProcessWorkerImpl, WORKER_TYPE as PROCESS_WORKER_TYPE};
