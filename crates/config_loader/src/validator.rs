//! Config validation
//!
//! Rules:
//! - poll interval > 0, deadline >= poll interval
//! - retry budget >= 1
//! - completion marker differs from the input key
//! - artifact names unique, non-empty, no path separators, not the run report
//! - at least one required artifact, no artifact at the input/marker key
//! - store / worker required fields present, log tail > 0

use std::collections::HashSet;

use contracts::{ContractError, PipelineConfig, StoreConfig, WorkerConfig, REPORT_FILE};

/// Validate a PipelineConfig
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(config: &PipelineConfig) -> Result<(), ContractError> {
    validate_job(config)?;
    validate_layout(config)?;
    validate_artifacts(config)?;
    validate_store(config)?;
    validate_worker(config)?;
    Ok(())
}

/// Timing and retry settings
fn validate_job(config: &PipelineConfig) -> Result<(), ContractError> {
    let job = &config.job;

    if job.poll_interval_ms == 0 {
        return Err(ContractError::config_validation(
            "job.poll_interval_ms",
            "poll_interval_ms must be > 0",
        ));
    }

    if job.deadline_ms < job.poll_interval_ms {
        return Err(ContractError::config_validation(
            "job.deadline_ms",
            format!(
                "deadline_ms ({}) must be >= poll_interval_ms ({})",
                job.deadline_ms, job.poll_interval_ms
            ),
        ));
    }

    if job.retry_budget == 0 {
        return Err(ContractError::config_validation(
            "job.retry_budget",
            "retry_budget must be >= 1",
        ));
    }

    job.pinned_namespace()
        .map_err(|e| ContractError::config_validation("job.namespace", e.to_string()))?;

    Ok(())
}

/// Input / marker keys
fn validate_layout(config: &PipelineConfig) -> Result<(), ContractError> {
    let layout = &config.layout;
    if layout.input_key == layout.completion_marker {
        return Err(ContractError::config_validation(
            "layout.completion_marker",
            "completion_marker must differ from input_key",
        ));
    }
    Ok(())
}

/// Declared artifacts
fn validate_artifacts(config: &PipelineConfig) -> Result<(), ContractError> {
    let mut seen = HashSet::new();

    for (idx, artifact) in config.artifacts.iter().enumerate() {
        if artifact.name.trim().is_empty() {
            return Err(ContractError::config_validation(
                format!("artifacts[{idx}].name"),
                "artifact name cannot be empty",
            ));
        }

        if artifact.name.contains(['/', '\\']) || artifact.name == "." || artifact.name == ".." {
            return Err(ContractError::config_validation(
                format!("artifacts[{idx}].name"),
                format!("artifact name '{}' must be a plain file name", artifact.name),
            ));
        }

        if artifact.name == REPORT_FILE {
            return Err(ContractError::config_validation(
                format!("artifacts[{idx}].name"),
                format!("artifact name '{REPORT_FILE}' is reserved for the run report"),
            ));
        }

        if !seen.insert(artifact.name.as_str()) {
            return Err(ContractError::config_validation(
                format!("artifacts[name={}]", artifact.name),
                "duplicate artifact name",
            ));
        }

        if artifact.key == config.layout.input_key {
            return Err(ContractError::config_validation(
                format!("artifacts[{}].key", artifact.name),
                "artifact key collides with layout.input_key",
            ));
        }
    }

    if !config.artifacts.iter().any(|a| a.required) {
        return Err(ContractError::config_validation(
            "artifacts",
            "at least one artifact must be required",
        ));
    }

    Ok(())
}

/// Store backend
fn validate_store(config: &PipelineConfig) -> Result<(), ContractError> {
    match &config.store {
        StoreConfig::Directory { path } => {
            if path.as_os_str().is_empty() {
                return Err(ContractError::config_validation(
                    "store.path",
                    "directory store path cannot be empty",
                ));
            }
        }
        StoreConfig::Container { container, mount } => {
            if container.trim().is_empty() {
                return Err(ContractError::config_validation(
                    "store.container",
                    "container name cannot be empty",
                ));
            }
            if !mount.starts_with('/') {
                return Err(ContractError::config_validation(
                    "store.mount",
                    format!("mount '{mount}' must be an absolute container path"),
                ));
            }
        }
    }
    Ok(())
}

/// Worker runtime
fn validate_worker(config: &PipelineConfig) -> Result<(), ContractError> {
    if config.worker.log_tail() == 0 {
        return Err(ContractError::config_validation(
            "worker.log_tail",
            "log_tail must be > 0",
        ));
    }

    match &config.worker {
        WorkerConfig::Compose { project, .. } => {
            if project.trim().is_empty() {
                return Err(ContractError::config_validation(
                    "worker.project",
                    "compose project name cannot be empty",
                ));
            }
        }
        WorkerConfig::Container {
            image, name, mount, ..
        } => {
            if image.trim().is_empty() {
                return Err(ContractError::config_validation(
                    "worker.image",
                    "container image cannot be empty",
                ));
            }
            if name.trim().is_empty() {
                return Err(ContractError::config_validation(
                    "worker.name",
                    "container name cannot be empty",
                ));
            }
            if !mount.starts_with('/') {
                return Err(ContractError::config_validation(
                    "worker.mount",
                    format!("mount '{mount}' must be an absolute container path"),
                ));
            }
        }
    }
    Ok(())
}
