//! Simulated worker
//!
//! Behaves like the real pipeline from the orchestrator's point of view:
//! after a configurable delay it writes its artifacts into the job namespace
//! and then the completion marker. Supports injecting start, stop and log
//! failures, and counts lifecycle calls so tests can assert teardown.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use bytes::Bytes;
use contracts::{SharedStore, StoreKey, Worker, WorkerContext, WorkerError};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Behaviour of a [`MockWorker`]
#[derive(Debug, Clone)]
pub struct MockWorkerConfig {
    /// Delay before the marker is written; `None` never completes
    pub complete_after: Option<Duration>,
    /// Artifacts written (relative to the job namespace) before the marker
    pub artifacts: Vec<(StoreKey, Bytes)>,
    /// Marker content
    pub marker_payload: Bytes,
    /// `start` fails
    pub fail_start: bool,
    /// `stop` fails (the pending work is still aborted)
    pub fail_stop: bool,
    /// `fetch_logs` fails
    pub fail_logs: bool,
    /// What `fetch_logs` returns
    pub logs: String,
}

impl Default for MockWorkerConfig {
    fn default() -> Self {
        Self {
            complete_after: Some(Duration::ZERO),
            artifacts: Vec::new(),
            marker_payload: Bytes::from_static(b"{\"status\":\"complete\"}"),
            fail_start: false,
            fail_stop: false,
            fail_logs: false,
            logs: "mock worker: no output".to_string(),
        }
    }
}

impl MockWorkerConfig {
    /// Complete after `delay`
    pub fn completing_after(delay: Duration) -> Self {
        Self {
            complete_after: Some(delay),
            ..Self::default()
        }
    }

    /// Never write the marker
    pub fn never_completing() -> Self {
        Self {
            complete_after: None,
            ..Self::default()
        }
    }

    /// Add an artifact written before the marker
    pub fn with_artifact(mut self, key: &str, data: impl Into<Bytes>) -> Self {
        match StoreKey::parse(key) {
            Ok(key) => self.artifacts.push((key, data.into())),
            Err(e) => warn!(key, error = %e, "Ignoring invalid mock artifact key"),
        }
        self
    }
}

struct Inner<S> {
    store: S,
    config: MockWorkerConfig,
    starts: AtomicU32,
    stops: AtomicU32,
    log_fetches: AtomicU32,
    /// Input read when the work ran
    input_seen: Mutex<Option<Bytes>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

/// Simulated worker writing into `store`; clones share state
pub struct MockWorker<S> {
    inner: Arc<Inner<S>>,
}

impl<S> Clone for MockWorker<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S> MockWorker<S>
where
    S: SharedStore + Sync + 'static,
{
    pub fn new(store: S, config: MockWorkerConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                config,
                starts: AtomicU32::new(0),
                stops: AtomicU32::new(0),
                log_fetches: AtomicU32::new(0),
                input_seen: Mutex::new(None),
                task: Mutex::new(None),
            }),
        }
    }

    /// Number of `start` calls
    pub fn starts(&self) -> u32 {
        self.inner.starts.load(Ordering::SeqCst)
    }

    /// Number of `stop` calls
    pub fn stops(&self) -> u32 {
        self.inner.stops.load(Ordering::SeqCst)
    }

    /// Number of `fetch_logs` calls
    pub fn log_fetches(&self) -> u32 {
        self.inner.log_fetches.load(Ordering::SeqCst)
    }

    /// Input the worker read before producing its outputs
    pub fn input_seen(&self) -> Option<Bytes> {
        lock(&self.inner.input_seen).clone()
    }

    async fn produce(inner: Arc<Inner<S>>, ctx: WorkerContext) {
        let Some(delay) = inner.config.complete_after else {
            return;
        };
        tokio::time::sleep(delay).await;

        let store = &inner.store;
        let input = store.get(&ctx.input_key).await.ok().flatten();
        *lock(&inner.input_seen) = input;

        for (key, data) in inner.config.artifacts.iter().cloned() {
            let key = ctx.namespace.key(&key);
            if let Err(e) = store.put(&key, data).await {
                warn!(key = %key, error = %e, "Mock worker failed to write artifact");
            }
        }
        if let Err(e) = store.put(&ctx.marker_key, inner.config.marker_payload.clone()).await {
            warn!(key = %ctx.marker_key, error = %e, "Mock worker failed to write marker");
            return;
        }
        debug!(job_id = %ctx.job_id, "Mock worker completed");
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<S> Worker for MockWorker<S>
where
    S: SharedStore + Sync + 'static,
{
    fn name(&self) -> &str {
        "mock"
    }

    async fn start(&self, ctx: &WorkerContext) -> Result<(), WorkerError> {
        self.inner.starts.fetch_add(1, Ordering::SeqCst);
        if self.inner.config.fail_start {
            return Err(WorkerError::start_failed("mock", "injected start failure"));
        }

        let handle = tokio::spawn(Self::produce(Arc::clone(&self.inner), ctx.clone()));
        if let Some(previous) = lock(&self.inner.task).replace(handle) {
            previous.abort();
        }
        Ok(())
    }

    async fn stop(&self) -> Result<(), WorkerError> {
        self.inner.stops.fetch_add(1, Ordering::SeqCst);
        if let Some(task) = lock(&self.inner.task).take() {
            task.abort();
        }
        if self.inner.config.fail_stop {
            return Err(WorkerError::CommandFailed {
                command: "mock stop".to_string(),
                status: "exit status: 1".to_string(),
                stderr: "injected stop failure".to_string(),
            });
        }
        Ok(())
    }

    async fn fetch_logs(&self) -> Result<String, WorkerError> {
        self.inner.log_fetches.fetch_add(1, Ordering::SeqCst);
        if self.inner.config.fail_logs {
            return Err(WorkerError::NotRunning {
                worker: "mock".to_string(),
            });
        }
        Ok(self.inner.config.logs.clone())
    }
}
