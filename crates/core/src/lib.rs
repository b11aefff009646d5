//! Shared primitives for all Rust crates in the worker.

#![forbid(unsafe_code)]

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// Initializes the process's `tracing` subscriber: `RUST_LOG`-driven level
/// filtering (defaulting to `info`), compact formatting, no target module
/// paths. Call once, at the top of `main`.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

/// Result type used across the worker's crates.
pub type AppResult<T> = Result<T, AppError>;

/// A validated non-empty UTF-8 string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NonEmptyString(String);

impl NonEmptyString {
    /// Creates a validated non-empty string.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(AppError::Validation(
                "value must not be empty or whitespace".to_owned(),
            ));
        }

        Ok(Self(value))
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<NonEmptyString> for String {
    fn from(value: NonEmptyString) -> Self {
        value.0
    }
}

impl Display for NonEmptyString {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

/// Stable identifier for one work pool, as assigned by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkPoolId(Uuid);

/// Stable identifier for one deployment, as assigned by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeploymentId(Uuid);

/// Stable identifier for one flow run, as assigned by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlowRunId(Uuid);

macro_rules! uuid_id {
    ($name:ident) => {
        impl $name {
            /// Creates a random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wraps an existing UUID value.
            #[must_use]
            pub fn from_uuid(value: Uuid) -> Self {
                Self(value)
            }

            /// Returns the underlying UUID value.
            #[must_use]
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl Display for $name {
            fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
                write!(formatter, "{}", self.0)
            }
        }
    };
}

uuid_id!(WorkPoolId);
uuid_id!(DeploymentId);
uuid_id!(FlowRunId);

/// Common application error categories shared by every crate in the worker.
///
/// `Setup`, `TransientBackend`, `Conflict`, `ManifestParse`, `JobConfiguration`
/// and `Run` map directly onto the worker's error taxonomy; `Validation`,
/// `NotFound` and `Internal` cover ambient concerns (bad configuration,
/// missing resources, unexpected I/O) the taxonomy leaves implicit.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid input or violated invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// Requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Write operation conflicts with existing state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),

    /// Cannot bring the worker up: bad configuration, unknown worker type,
    /// or a missing work pool with pool-creation disabled. Fatal at startup.
    #[error("setup error: {0}")]
    Setup(String),

    /// Network error or 5xx response from the backend. Recovered locally by
    /// the loop supervisor; the next tick retries.
    #[error("transient backend error: {0}")]
    TransientBackend(String),

    /// A manifest file failed to parse. Logged and the scan continues.
    #[error("manifest parse error: {0}")]
    ManifestParse(String),

    /// Template/overrides resolution produced an invalid configuration for
    /// this worker type.
    #[error("job configuration error: {0}")]
    JobConfiguration(String),

    /// The per-worker-type `Run` hook raised an error.
    #[error("run error: {0}")]
    Run(String),
}
