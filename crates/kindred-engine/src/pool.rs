// SPDX-FileCopyrightText: 2026 Kindred Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded compute pool for model inference.
//!
//! Generation and embedding are CPU-bound; running them inline on the
//! async runtime would starve ledger and index I/O. Work is dispatched to
//! `spawn_blocking` behind a semaphore so at most `workers` inferences run
//! at once. Once dispatched, a task runs to completion even if the caller
//! drops its future -- cancellation is advisory past this point.

use std::sync::Arc;

use kindred_core::KindredError;
use tokio::sync::Semaphore;

/// Bounded pool for blocking inference work.
#[derive(Clone)]
pub struct ComputePool {
    permits: Arc<Semaphore>,
}

impl ComputePool {
    /// Creates a pool allowing `workers` concurrent blocking tasks.
    pub fn new(workers: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(workers)),
        }
    }

    /// Runs `f` on the blocking thread pool, waiting for a permit first.
    pub async fn run<F, T>(&self, f: F) -> Result<T, KindredError>
    where
        F: FnOnce() -> Result<T, KindredError> + Send + 'static,
        T: Send + 'static,
    {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| KindredError::Internal(format!("compute pool closed: {e}")))?;

        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            f()
        })
        .await
        .map_err(|e| KindredError::Internal(format!("compute task panicked: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrency_never_exceeds_workers() {
        let pool = ComputePool::new(2);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let pool = pool.clone();
            let running = running.clone();
            let peak = peak.clone();
            handles.push(tokio::spawn(async move {
                pool.run(move || {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    std::thread::sleep(Duration::from_millis(20));
                    running.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                })
                .await
                .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert!(peak.load(Ordering::SeqCst) <= 2, "pool bound was exceeded");
    }

    #[tokio::test]
    async fn results_and_errors_propagate() {
        let pool = ComputePool::new(1);
        let value = pool.run(|| Ok(41 + 1)).await.unwrap();
        assert_eq!(value, 42);

        let err = pool
            .run::<_, ()>(|| Err(KindredError::Generation { message: "boom".into() }))
            .await
            .unwrap_err();
        assert!(matches!(err, KindredError::Generation { .. }));
    }
}
