//! Bulkhead concurrency limiter
//!
//! Admits up to `max_concurrent` operations, queues up to `max_queue`
//! more in FIFO order, and rejects the rest immediately.

use crate::error::{ConceptRagError, Result};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Bulkhead tuning per operation name
#[derive(Debug, Clone, Copy)]
pub struct BulkheadConfig {
    pub max_concurrent: usize,
    pub max_queue: usize,
}

impl Default for BulkheadConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 10,
            max_queue: 20,
        }
    }
}

/// Snapshot of one bulkhead's occupancy
#[derive(Debug, Clone, Copy, Serialize)]
pub struct BulkheadMetrics {
    pub max_concurrent: usize,
    pub max_queue: usize,
    pub active: usize,
    pub queued: usize,
    pub rejections: u64,
}

/// Holds one admitted slot; dropping it releases the slot
pub struct BulkheadPermit {
    _permit: OwnedSemaphorePermit,
}

/// Per-name bulkhead
pub struct Bulkhead {
    name: String,
    config: BulkheadConfig,
    semaphore: Arc<Semaphore>,
    queued: AtomicUsize,
    rejections: AtomicU64,
}

impl Bulkhead {
    pub fn new(name: impl Into<String>, config: BulkheadConfig) -> Self {
        Self {
            name: name.into(),
            config,
            semaphore: Arc::new(Semaphore::new(config.max_concurrent)),
            queued: AtomicUsize::new(0),
            rejections: AtomicU64::new(0),
        }
    }

    /// Acquire a slot, waiting in the FIFO queue if the pool is full.
    /// Rejects once the queue is also full.
    pub async fn acquire(&self) -> Result<BulkheadPermit> {
        // Fast path: free slot right now
        if let Ok(permit) = self.semaphore.clone().try_acquire_owned() {
            return Ok(BulkheadPermit { _permit: permit });
        }

        let waiting = self.queued.fetch_add(1, Ordering::SeqCst);
        if waiting >= self.config.max_queue {
            self.queued.fetch_sub(1, Ordering::SeqCst);
            self.rejections.fetch_add(1, Ordering::SeqCst);
            tracing::debug!(name = %self.name, "bulkhead queue full, rejecting");
            return Err(ConceptRagError::BulkheadRejection(self.name.clone()));
        }

        // Semaphore wakes waiters in acquire order (FIFO)
        let acquired = self.semaphore.clone().acquire_owned().await;
        self.queued.fetch_sub(1, Ordering::SeqCst);
        match acquired {
            Ok(permit) => Ok(BulkheadPermit { _permit: permit }),
            Err(_) => Err(ConceptRagError::BulkheadRejection(self.name.clone())),
        }
    }

    pub fn metrics(&self) -> BulkheadMetrics {
        BulkheadMetrics {
            max_concurrent: self.config.max_concurrent,
            max_queue: self.config.max_queue,
            active: self.config.max_concurrent - self.semaphore.available_permits(),
            queued: self.queued.load(Ordering::SeqCst),
            rejections: self.rejections.load(Ordering::SeqCst),
        }
    }

    /// Whether every slot is taken (queue may still have room)
    pub fn is_saturated(&self) -> bool {
        self.semaphore.available_permits() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_exact_admission_split() {
        let bulkhead = Arc::new(Bulkhead::new(
            "test",
            BulkheadConfig {
                max_concurrent: 5,
                max_queue: 10,
            },
        ));

        let mut handles = Vec::new();
        for _ in 0..20 {
            let bulkhead = bulkhead.clone();
            handles.push(tokio::spawn(async move {
                match bulkhead.acquire().await {
                    Ok(_permit) => {
                        tokio::time::sleep(Duration::from_millis(500)).await;
                        true
                    }
                    Err(_) => false,
                }
            }));
        }
        // Let every task reach the bulkhead before slots start freeing
        let outcomes: Vec<bool> = futures::future::join_all(handles)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();

        let succeeded = outcomes.iter().filter(|ok| **ok).count();
        let rejected = outcomes.len() - succeeded;
        assert_eq!(succeeded, 15);
        assert_eq!(rejected, 5);

        let metrics = bulkhead.metrics();
        assert_eq!(metrics.active, 0);
        assert_eq!(metrics.queued, 0);
        assert_eq!(metrics.rejections, 5);
    }

    #[tokio::test]
    async fn test_permit_release_frees_slot() {
        let bulkhead = Bulkhead::new(
            "test",
            BulkheadConfig {
                max_concurrent: 1,
                max_queue: 0,
            },
        );

        let permit = bulkhead.acquire().await.unwrap();
        assert!(bulkhead.is_saturated());
        assert!(bulkhead.acquire().await.is_err());

        drop(permit);
        assert!(!bulkhead.is_saturated());
        assert!(bulkhead.acquire().await.is_ok());
    }
}
