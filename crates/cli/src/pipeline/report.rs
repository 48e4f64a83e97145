//! Run report and artifact export
//!
//! Every run, successful or not, leaves `<output>/run_report.json` behind.
//! Collected artifacts are written next to it under their declared names.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use contracts::{Job, RunOutcome, RunReport, REPORT_FILE};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{CliError, Result};

/// Serialized form of a run
#[derive(Debug, Serialize)]
pub struct RunReportFile {
    pub job_id: String,
    pub namespace: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub inputs: usize,
    pub outcome: OutcomeRecord,
    pub final_state: String,
    pub submission_attempts: u32,
    pub polls: u64,
    pub artifacts: Vec<ArtifactRecord>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing_optional: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teardown_error: Option<String>,
}

/// Outcome without the artifact payloads
#[derive(Debug, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutcomeRecord {
    Success,
    Timeout { elapsed_ms: u64 },
    Cancelled { elapsed_ms: u64 },
    SubmissionFailed { attempts: u32, last_error: String },
    RetrievalFailed { missing: Vec<String> },
    StartFailed { error: String },
}

impl From<&RunOutcome> for OutcomeRecord {
    fn from(outcome: &RunOutcome) -> Self {
        match outcome {
            RunOutcome::Success { .. } => Self::Success,
            RunOutcome::Timeout { elapsed } => Self::Timeout {
                elapsed_ms: elapsed.as_millis() as u64,
            },
            RunOutcome::Cancelled { elapsed } => Self::Cancelled {
                elapsed_ms: elapsed.as_millis() as u64,
            },
            RunOutcome::SubmissionFailed {
                attempts,
                last_error,
            } => Self::SubmissionFailed {
                attempts: *attempts,
                last_error: last_error.clone(),
            },
            RunOutcome::RetrievalFailed { missing } => Self::RetrievalFailed {
                missing: missing.clone(),
            },
            RunOutcome::StartFailed { error } => Self::StartFailed {
                error: error.clone(),
            },
        }
    }
}

/// One exported artifact
#[derive(Debug, Serialize)]
pub struct ArtifactRecord {
    pub name: String,
    pub bytes: usize,
    pub path: PathBuf,
}

impl RunReportFile {
    /// Build the report; `artifacts` lists what was written to disk
    pub fn new(
        job: &Job,
        report: &RunReport,
        started_at: DateTime<Utc>,
        artifacts: Vec<ArtifactRecord>,
    ) -> Self {
        let finished_at = chrono::Duration::from_std(report.elapsed)
            .ok()
            .and_then(|elapsed| started_at.checked_add_signed(elapsed))
            .unwrap_or(started_at);

        let missing_optional = match &report.outcome {
            RunOutcome::Success { artifacts } => job
                .artifacts
                .iter()
                .filter(|spec| !spec.required && !artifacts.contains_key(&spec.name))
                .map(|spec| spec.name.clone())
                .collect(),
            _ => Vec::new(),
        };

        Self {
            job_id: report.job_id.to_string(),
            namespace: report.namespace.prefix().to_string(),
            started_at,
            finished_at,
            elapsed_ms: report.elapsed.as_millis() as u64,
            inputs: job.inputs.len(),
            outcome: OutcomeRecord::from(&report.outcome),
            final_state: report.final_state.to_string(),
            submission_attempts: report.submission_attempts,
            polls: report.polls,
            artifacts,
            missing_optional,
            diagnostics: report.diagnostics.clone(),
            teardown_error: report.teardown_error.clone(),
        }
    }
}

/// Write collected artifacts and `run_report.json` under `output`
///
/// Returns the path of the report file.
pub fn write_outputs(
    output: &Path,
    job: &Job,
    report: &RunReport,
    started_at: DateTime<Utc>,
) -> Result<PathBuf> {
    std::fs::create_dir_all(output).map_err(|e| CliError::output(output, e))?;

    let mut written = Vec::new();
    if let RunOutcome::Success { artifacts } = &report.outcome {
        for (name, data) in artifacts {
            let path = output.join(name);
            std::fs::write(&path, data).map_err(|e| CliError::output(&path, e))?;
            debug!(artifact = %name, path = %path.display(), bytes = data.len(), "Artifact written");
            written.push(ArtifactRecord {
                name: name.clone(),
                bytes: data.len(),
                path,
            });
        }
    }

    let file = RunReportFile::new(job, report, started_at, written);
    let path = output.join(REPORT_FILE);
    let json = serde_json::to_vec_pretty(&file)
        .map_err(|e| CliError::output(&path, std::io::Error::other(e)))?;
    std::fs::write(&path, json).map_err(|e| CliError::output(&path, e))?;

    info!(report = %path.display(), outcome = report.outcome.kind(), "Run report written");
    Ok(path)
}
