//! PipelineConfig - Config Loader output
//!
//! Describes one pipeline deployment: job timing defaults, store layout,
//! declared artifacts, the shared store backend and the worker runtime.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::{
    ArtifactSpec, ContractError, JobNamespace, PollPolicy, RetryPolicy, StoreKey,
    DEFAULT_COMPLETION_MARKER, DEFAULT_INPUT_KEY,
};

/// Config version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Config version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Job timing and retry defaults
    #[serde(default)]
    pub job: JobSettings,

    /// Input / marker key layout
    #[serde(default)]
    pub layout: LayoutConfig,

    /// Declared output artifacts (defaults to the fetch/process/analyze set)
    #[serde(default = "ArtifactSpec::default_set")]
    pub artifacts: Vec<ArtifactSpec>,

    /// Shared store backend
    #[serde(default)]
    pub store: StoreConfig,

    /// Worker runtime
    #[serde(default)]
    pub worker: WorkerConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            version: ConfigVersion::default(),
            job: JobSettings::default(),
            layout: LayoutConfig::default(),
            artifacts: ArtifactSpec::default_set(),
            store: StoreConfig::default(),
            worker: WorkerConfig::default(),
        }
    }
}

/// Job timing and retry settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSettings {
    /// Interval between completion probes (ms)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Maximum wait for the completion marker (ms)
    #[serde(default = "default_deadline_ms")]
    pub deadline_ms: u64,

    /// Submission attempts, including the first
    #[serde(default = "default_retry_budget")]
    pub retry_budget: u32,

    /// Fixed pause between submission attempts (ms)
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Pinned namespace prefix. `None` derives `jobs/<job id>`, `""` uses the store root.
    #[serde(default)]
    pub namespace: Option<String>,
}

fn default_poll_interval_ms() -> u64 {
    PollPolicy::default().interval.as_millis() as u64
}

fn default_deadline_ms() -> u64 {
    PollPolicy::default().deadline.as_millis() as u64
}

fn default_retry_budget() -> u32 {
    RetryPolicy::default().budget
}

fn default_retry_backoff_ms() -> u64 {
    RetryPolicy::default().backoff.as_millis() as u64
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            deadline_ms: default_deadline_ms(),
            retry_budget: default_retry_budget(),
            retry_backoff_ms: default_retry_backoff_ms(),
            namespace: None,
        }
    }
}

impl JobSettings {
    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy::new(
            Duration::from_millis(self.poll_interval_ms),
            Duration::from_millis(self.deadline_ms),
        )
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry_budget,
            Duration::from_millis(self.retry_backoff_ms),
        )
    }

    /// Pinned namespace, if any
    pub fn pinned_namespace(&self) -> Result<Option<JobNamespace>, ContractError> {
        self.namespace
            .as_deref()
            .map(JobNamespace::new)
            .transpose()
    }
}

/// Where the input goes and which key signals completion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    #[serde(default = "default_input_key")]
    pub input_key: StoreKey,

    #[serde(default = "default_completion_marker")]
    pub completion_marker: StoreKey,
}

fn default_input_key() -> StoreKey {
    StoreKey::from_static(DEFAULT_INPUT_KEY)
}

fn default_completion_marker() -> StoreKey {
    StoreKey::from_static(DEFAULT_COMPLETION_MARKER)
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            input_key: default_input_key(),
            completion_marker: default_completion_marker(),
        }
    }
}

/// Shared store backend
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoreConfig {
    /// Host directory, typically bind-mounted into the worker containers
    Directory { path: PathBuf },

    /// Mount point inside a running container, reached through `docker exec`
    Container { container: String, mount: String },
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::Directory {
            path: PathBuf::from("./shared"),
        }
    }
}

/// Worker runtime
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WorkerConfig {
    /// Multi-container compose project
    Compose {
        /// Compose file
        #[serde(default = "default_compose_file")]
        file: PathBuf,

        /// Compose project name
        #[serde(default = "default_project")]
        project: String,

        /// Log lines captured on failure
        #[serde(default = "default_log_tail")]
        log_tail: u32,
    },

    /// Single detached container
    Container {
        image: String,

        /// Container name
        #[serde(default = "default_project")]
        name: String,

        /// Host path mounted into the container
        volume: PathBuf,

        /// Mount point inside the container
        #[serde(default = "default_mount")]
        mount: String,

        /// Extra container arguments
        #[serde(default)]
        args: Vec<String>,

        /// Extra environment variables
        #[serde(default)]
        env: BTreeMap<String, String>,

        /// Log lines captured on failure
        #[serde(default = "default_log_tail")]
        log_tail: u32,
    },
}

fn default_compose_file() -> PathBuf {
    PathBuf::from("docker-compose.yaml")
}

fn default_project() -> String {
    "url-pipeline".to_string()
}

fn default_mount() -> String {
    "/shared".to_string()
}

fn default_log_tail() -> u32 {
    100
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self::Compose {
            file: default_compose_file(),
            project: default_project(),
            log_tail: default_log_tail(),
        }
    }
}

impl WorkerConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Compose { .. } => "compose",
            Self::Container { .. } => "container",
        }
    }

    pub fn log_tail(&self) -> u32 {
        match self {
            Self::Compose { log_tail, .. } | Self::Container { log_tail, .. } => *log_tail,
        }
    }
}

impl StoreConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Directory { .. } => "directory",
            Self::Container { .. } => "container",
        }
    }
}
