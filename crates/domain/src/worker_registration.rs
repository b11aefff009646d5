use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use workcore_core::NonEmptyString;

/// Identity of a worker within a pool, as tracked by the backend.
///
/// Created/updated by `SyncWithBackend`; terminated implicitly by absence of
/// heartbeats (the worker never deletes its own registration).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerRegistration {
    /// Unique name within the pool.
    pub name: NonEmptyString,
    /// Timestamp of the most recently accepted heartbeat.
    pub last_heartbeat_time: Option<DateTime<Utc>>,
}

impl WorkerRegistration {
    /// Creates a worker registration snapshot.
    #[must_use]
    pub fn new(name: NonEmptyString, last_heartbeat_time: Option<DateTime<Utc>>) -> Self {
        Self {
            name,
            last_heartbeat_time,
        }
    }
}
