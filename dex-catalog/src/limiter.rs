//! Bounded concurrency for async jobs.

use std::future::Future;
use std::sync::Arc;

use dex_core::{DexError, DexResult};
use tokio::sync::Semaphore;

/// Caps how many submitted jobs run at once.
///
/// Backed by a fair semaphore, so waiting jobs are admitted in the order they
/// asked for a permit. The backlog is unbounded. A job that fails (or panics)
/// drops its permit like any other, so the queue keeps draining. There is no
/// way to cancel a queued job; callers decide whether to use a result once it
/// arrives.
#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    permits: Arc<Semaphore>,
    max: usize,
}

impl ConcurrencyLimiter {
    pub fn new(max: usize) -> Self {
        let max = max.max(1);
        Self {
            permits: Arc::new(Semaphore::new(max)),
            max,
        }
    }

    pub fn max_concurrency(&self) -> usize {
        self.max
    }

    /// Permits not currently held by a running job.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Run `job` once a permit is free, settling with the job's own result.
    pub async fn submit<T, F, Fut>(&self, job: F) -> DexResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = DexResult<T>>,
    {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| DexError::internal(format!("Limiter closed: {}", e)))?;
        job().await
    }
}

impl Default for ConcurrencyLimiter {
    fn default() -> Self {
        Self::new(crate::options::DEFAULT_CONCURRENCY)
    }
}
