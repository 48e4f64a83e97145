//! Pipeline assembly - turns a `PipelineConfig` into a store, a worker and a job.

mod report;
mod shutdown;

pub use report::{write_outputs, RunReportFile};
pub use shutdown::install_shutdown_handler;

use std::path::Path;

use bytes::Bytes;
use contracts::{
    Job, PipelineConfig, SharedStore, StoreConfig, StoreError, StoreKey, Worker, WorkerConfig,
    WorkerContext, WorkerError,
};
use shared_store::DirectoryStore;
use worker::{ComposeConfig, ComposeWorker, ContainerConfig, ContainerStore, ContainerWorker};

use crate::cli::RunArgs;
use crate::error::{CliError, Result};

/// Store selected by configuration
pub enum PipelineStore {
    Directory(DirectoryStore),
    Container(ContainerStore),
}

impl PipelineStore {
    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        match config {
            StoreConfig::Directory { path } => DirectoryStore::new(path)
                .map(Self::Directory)
                .map_err(|source| CliError::output(path, source)),
            StoreConfig::Container { container, mount } => Ok(Self::Container(
                ContainerStore::new(container.clone(), mount.clone()),
            )),
        }
    }
}

impl SharedStore for PipelineStore {
    fn name(&self) -> &str {
        match self {
            Self::Directory(store) => store.name(),
            Self::Container(store) => store.name(),
        }
    }

    async fn put(&self, key: &StoreKey, data: Bytes) -> std::result::Result<(), StoreError> {
        match self {
            Self::Directory(store) => store.put(key, data).await,
            Self::Container(store) => store.put(key, data).await,
        }
    }

    async fn get(&self, key: &StoreKey) -> std::result::Result<Option<Bytes>, StoreError> {
        match self {
            Self::Directory(store) => store.get(key).await,
            Self::Container(store) => store.get(key).await,
        }
    }

    async fn exists(&self, key: &StoreKey) -> bool {
        match self {
            Self::Directory(store) => store.exists(key).await,
            Self::Container(store) => store.exists(key).await,
        }
    }
}

/// Worker selected by configuration
pub enum PipelineWorker {
    Compose(ComposeWorker),
    Container(ContainerWorker),
}

impl PipelineWorker {
    pub fn from_config(config: &WorkerConfig) -> Self {
        match config {
            WorkerConfig::Compose {
                file,
                project,
                log_tail,
            } => Self::Compose(ComposeWorker::new(ComposeConfig {
                file: file.clone(),
                project: project.clone(),
                log_tail: *log_tail,
            })),
            WorkerConfig::Container {
                image,
                name,
                volume,
                mount,
                args,
                env,
                log_tail,
            } => Self::Container(ContainerWorker::new(ContainerConfig {
                image: image.clone(),
                name: name.clone(),
                volume: volume.clone(),
                mount: mount.clone(),
                args: args.clone(),
                env: env.clone(),
                log_tail: *log_tail,
            })),
        }
    }
}

impl Worker for PipelineWorker {
    fn name(&self) -> &str {
        match self {
            Self::Compose(worker) => worker.name(),
            Self::Container(worker) => worker.name(),
        }
    }

    async fn start(&self, ctx: &WorkerContext) -> std::result::Result<(), WorkerError> {
        match self {
            Self::Compose(worker) => worker.start(ctx).await,
            Self::Container(worker) => worker.start(ctx).await,
        }
    }

    async fn stop(&self) -> std::result::Result<(), WorkerError> {
        match self {
            Self::Compose(worker) => worker.stop().await,
            Self::Container(worker) => worker.stop().await,
        }
    }

    async fn fetch_logs(&self) -> std::result::Result<String, WorkerError> {
        match self {
            Self::Compose(worker) => worker.fetch_logs().await,
            Self::Container(worker) => worker.fetch_logs().await,
        }
    }
}

/// Apply `run` command overrides on top of the loaded configuration
pub fn apply_overrides(config: &mut PipelineConfig, args: &RunArgs) {
    if let Some(secs) = args.deadline_secs {
        config.job.deadline_ms = secs.saturating_mul(1000);
    }
    if let Some(ms) = args.poll_interval_ms {
        config.job.poll_interval_ms = ms;
    }
    if let Some(budget) = args.retry_budget {
        config.job.retry_budget = budget;
    }
    if let Some(namespace) = &args.namespace {
        config.job.namespace = Some(namespace.clone());
    }
}

/// Parse an input list: one item per line, trimmed, blank lines skipped
pub fn parse_inputs(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Inputs from `--input-file` followed by positional URLs
pub fn read_inputs(input_file: Option<&Path>, urls: &[String]) -> Result<Vec<String>> {
    let mut inputs = match input_file {
        Some(path) => {
            let content = std::fs::read_to_string(path).map_err(|source| CliError::InputFile {
                path: path.to_path_buf(),
                source,
            })?;
            parse_inputs(&content)
        }
        None => Vec::new(),
    };
    inputs.extend(
        urls.iter()
            .map(|url| url.trim())
            .filter(|url| !url.is_empty())
            .map(str::to_string),
    );

    if inputs.is_empty() {
        return Err(CliError::argument(
            "no inputs: pass URLs as arguments or use --input-file",
        ));
    }
    Ok(inputs)
}

/// Build the job for `inputs` from the (validated) configuration
pub fn build_job(config: &PipelineConfig, inputs: Vec<String>) -> Result<Job> {
    let mut builder = Job::builder(inputs)
        .input_key(config.layout.input_key.clone())
        .marker_key(config.layout.completion_marker.clone())
        .artifacts(config.artifacts.iter().cloned())
        .poll(config.job.poll_policy())
        .retry(config.job.retry_policy());

    if let Some(namespace) = config.job.pinned_namespace()? {
        builder = builder.namespace(namespace);
    }

    Ok(builder.build()?)
}

/// Human-readable plan printed by `run --dry-run`
pub fn describe_plan(config: &PipelineConfig, job: &Job) -> String {
    let mut lines = vec![
        "=== Run Plan ===".to_string(),
        format!("Job: {}", job.id),
        format!("Namespace: {}", job.namespace),
        format!("Inputs: {}", job.inputs.len()),
        format!("Store: {}", config.store.kind()),
        format!("Worker: {}", config.worker.kind()),
        format!("Input key: {}", job.resolved_input_key()),
        format!("Completion marker: {}", job.resolved_marker_key()),
        format!(
            "Polling: every {:?}, deadline {:?} (at most {} probes)",
            job.poll.interval,
            job.poll.deadline,
            job.poll.max_probes()
        ),
        format!(
            "Submission: {} attempts, {:?} backoff",
            job.retry.budget, job.retry.backoff
        ),
        "Artifacts:".to_string(),
    ];
    for artifact in &job.artifacts {
        let kind = if artifact.required { "required" } else { "optional" };
        lines.push(format!(
            "  - {} <- {} ({kind})",
            artifact.name,
            job.resolved_artifact_key(artifact)
        ));
    }
    lines.join("\n")
}
