use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, Semaphore, TryAcquireError};
use workcore_core::FlowRunId;

/// Counting semaphore keyed by flow-run identity.
///
/// Acquire and release are both keyed by [`FlowRunId`] so that tests and
/// error paths can release a specific slot explicitly. Releasing an id the
/// limiter no longer tracks (already released, or never acquired) is a
/// no-op rather than an error.
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
    held: Mutex<HashMap<FlowRunId, tokio::sync::OwnedSemaphorePermit>>,
}

impl ConcurrencyLimiter {
    /// Creates a limiter with the given capacity. `None` means unlimited:
    /// acquisition always succeeds and no permits are tracked.
    #[must_use]
    pub fn new(limit: Option<usize>) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(limit.unwrap_or(Semaphore::MAX_PERMITS))),
            held: Mutex::new(HashMap::new()),
        }
    }

    /// Attempts to acquire one slot on behalf of `run_id` without blocking.
    /// Returns `false` if capacity is currently exhausted.
    pub async fn try_acquire_on_behalf_of(&self, run_id: FlowRunId) -> bool {
        match Arc::clone(&self.semaphore).try_acquire_owned() {
            Ok(permit) => {
                self.held.lock().await.insert(run_id, permit);
                true
            }
            Err(TryAcquireError::NoPermits | TryAcquireError::Closed) => false,
        }
    }

    /// Releases the slot held for `run_id`, if any. Tolerates unknown ids.
    pub async fn release(&self, run_id: FlowRunId) {
        self.held.lock().await.remove(&run_id);
    }

    /// Number of slots currently held, for tests and status reporting.
    pub async fn held_count(&self) -> usize {
        self.held.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::ConcurrencyLimiter;
    use workcore_core::FlowRunId;

    #[tokio::test]
    async fn acquisition_respects_capacity() {
        let limiter = ConcurrencyLimiter::new(Some(2));
        let first = FlowRunId::new();
        let second = FlowRunId::new();
        let third = FlowRunId::new();

        assert!(limiter.try_acquire_on_behalf_of(first).await);
        assert!(limiter.try_acquire_on_behalf_of(second).await);
        assert!(!limiter.try_acquire_on_behalf_of(third).await);
        assert_eq!(limiter.held_count().await, 2);
    }

    #[tokio::test]
    async fn release_frees_a_slot_for_reuse() {
        let limiter = ConcurrencyLimiter::new(Some(1));
        let first = FlowRunId::new();
        let second = FlowRunId::new();

        assert!(limiter.try_acquire_on_behalf_of(first).await);
        assert!(!limiter.try_acquire_on_behalf_of(second).await);

        limiter.release(first).await;
        assert!(limiter.try_acquire_on_behalf_of(second).await);
    }

    #[tokio::test]
    async fn releasing_unknown_id_is_a_no_op() {
        let limiter = ConcurrencyLimiter::new(Some(1));
        limiter.release(FlowRunId::new()).await;
        assert_eq!(limiter.held_count().await, 0);
    }

    #[tokio::test]
    async fn unlimited_capacity_never_blocks() {
        let limiter = ConcurrencyLimiter::new(None);
        for _ in 0..64 {
            assert!(limiter.try_acquire_on_behalf_of(FlowRunId::new()).await);
        }
    }
}
