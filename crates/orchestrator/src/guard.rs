//! Worker teardown guard
//!
//! Created as soon as `start` has been attempted. `teardown` consumes the
//! guard, so the worker is stopped at most once; dropping the guard without
//! calling it is reported as a leak.
//!
//! `Drop` cannot await `stop`, so a leaked guard only logs a warning and the
//! worker keeps running. This happens when the future of
//! [`Orchestrator::run`](crate::Orchestrator::run) is dropped mid-flight,
//! e.g. when wrapped in `tokio::time::timeout`. Bound a run with the job
//! deadline or its cancellation token instead.

use contracts::{Worker, WorkerError};
use tracing::{info, instrument, warn};

/// Stops the worker exactly once
#[must_use = "call `teardown().await` on every exit path"]
pub struct TeardownGuard<'a, W: Worker> {
    worker: &'a W,
    armed: bool,
}

impl<'a, W: Worker> TeardownGuard<'a, W> {
    pub fn new(worker: &'a W) -> Self {
        Self {
            worker,
            armed: true,
        }
    }

    /// Stop the worker; failures are logged and returned, never retried
    #[instrument(name = "worker_teardown", skip(self), fields(worker = %self.worker.name()))]
    pub async fn teardown(mut self) -> Result<(), WorkerError> {
        self.armed = false;

        let result = self.worker.stop().await;
        observability::record_teardown(result.is_ok());
        match &result {
            Ok(()) => info!("Worker stopped"),
            Err(e) => warn!(error = %e, "Worker teardown failed"),
        }
        result
    }
}

impl<W: Worker> Drop for TeardownGuard<'_, W> {
    fn drop(&mut self) {
        if self.armed {
            warn!(
                worker = %self.worker.name(),
                "Teardown guard dropped without stopping the worker; it may still be running"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::Job;
    use shared_store::MemoryStore;
    use worker::{MockWorker, MockWorkerConfig};

    #[tokio::test]
    async fn test_teardown_stops_once() {
        let worker = MockWorker::new(MemoryStore::new(), MockWorkerConfig::default());
        let job = Job::builder(["http://a"]).build().unwrap();
        worker.start(&job.worker_context()).await.unwrap();

        let guard = TeardownGuard::new(&worker);
        guard.teardown().await.unwrap();

        assert_eq!(worker.stops(), 1);
    }

    #[tokio::test]
    async fn test_dropped_guard_does_not_stop() {
        let worker = MockWorker::new(MemoryStore::new(), MockWorkerConfig::default());
        {
            let _guard = TeardownGuard::new(&worker);
        }
        assert_eq!(worker.stops(), 0);
    }

    #[tokio::test]
    async fn test_teardown_returns_stop_error() {
        let worker = MockWorker::new(
            MemoryStore::new(),
            MockWorkerConfig {
                fail_stop: true,
                ..MockWorkerConfig::default()
            },
        );

        let guard = TeardownGuard::new(&worker);
        assert!(guard.teardown().await.is_err());
        assert_eq!(worker.stops(), 1);
    }
}
