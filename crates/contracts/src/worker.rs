//! Worker trait - external process lifecycle abstraction
//!
//! A worker is an opaque external process (a compose project, a detached
//! container, or a simulated worker in tests) that consumes the job input
//! from the shared store and eventually writes its artifacts followed by a
//! completion marker.

use uuid::Uuid;

use crate::{JobNamespace, StoreKey, WorkerError};

/// Environment variable carrying the job id
pub const ENV_JOB_ID: &str = "PIPELINE_JOB_ID";
/// Environment variable carrying the namespace prefix
pub const ENV_NAMESPACE: &str = "PIPELINE_NAMESPACE";
/// Environment variable carrying the resolved input key
pub const ENV_INPUT_KEY: &str = "PIPELINE_INPUT_KEY";
/// Environment variable carrying the resolved completion-marker key
pub const ENV_MARKER_KEY: &str = "PIPELINE_MARKER_KEY";

/// What a worker needs to know about the job it serves
#[derive(Debug, Clone)]
pub struct WorkerContext {
    pub job_id: Uuid,
    pub namespace: JobNamespace,
    /// Fully resolved input key
    pub input_key: StoreKey,
    /// Fully resolved completion-marker key
    pub marker_key: StoreKey,
}

impl WorkerContext {
    /// Environment passed to real workers
    pub fn env(&self) -> Vec<(&'static str, String)> {
        vec![
            (ENV_JOB_ID, self.job_id.to_string()),
            (ENV_NAMESPACE, self.namespace.prefix().to_string()),
            (ENV_INPUT_KEY, self.input_key.to_string()),
            (ENV_MARKER_KEY, self.marker_key.to_string()),
        ]
    }
}

/// External worker lifecycle
///
/// `stop` must be safe to call after a partial or failed `start`.
#[trait_variant::make(Worker: Send)]
pub trait LocalWorker {
    /// Worker name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Start the worker for the given job
    async fn start(&self, ctx: &WorkerContext) -> Result<(), WorkerError>;

    /// Stop the worker and release everything `start` acquired
    async fn stop(&self) -> Result<(), WorkerError>;

    /// Tail of the worker's diagnostic output
    async fn fetch_logs(&self) -> Result<String, WorkerError>;
}
