//! Counting admission gate used by chunk batches and query attempts alike.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::{Error, Result};

#[derive(Debug, Default)]
struct LimiterStats {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

/// Bounds how many operations run at once and records the high-water mark.
///
/// Cloning is cheap and every clone shares the same permits.
#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
    limit: usize,
    stats: Arc<LimiterStats>,
}

impl ConcurrencyLimiter {
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(limit)),
            limit,
            stats: Arc::new(LimiterStats::default()),
        }
    }

    /// Wait for a slot. The slot is given back when the permit drops.
    pub async fn acquire(&self) -> Result<LimiterPermit> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| Error::Internal("concurrency limiter closed".into()))?;

        let now = self.stats.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.peak.fetch_max(now, Ordering::SeqCst);

        Ok(LimiterPermit {
            _permit: permit,
            stats: self.stats.clone(),
        })
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn in_flight(&self) -> usize {
        self.stats.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of permits held at the same time since creation.
    pub fn peak(&self) -> usize {
        self.stats.peak.load(Ordering::SeqCst)
    }

    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}

/// Held for the duration of one limited operation.
#[derive(Debug)]
pub struct LimiterPermit {
    _permit: OwnedSemaphorePermit,
    stats: Arc<LimiterStats>,
}

impl Drop for LimiterPermit {
    fn drop(&mut self) {
        // Runs before the semaphore permit field is dropped.
        self.stats.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}
