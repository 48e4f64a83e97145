//! RunOutcome / RunReport - orchestrator output
//!
//! Exactly one outcome variant is produced per run.

use bytes::Bytes;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

use crate::JobNamespace;

/// Lifecycle state of a single run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobState {
    Idle,
    Submitting,
    Polling,
    Collecting,
    Done,
    Failed,
}

impl JobState {
    /// Terminal states accept no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Submitting => "submitting",
            Self::Polling => "polling",
            Self::Collecting => "collecting",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tagged result of one run
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// Marker observed and every required artifact collected
    Success { artifacts: BTreeMap<String, Bytes> },

    /// Marker not observed before the deadline
    Timeout { elapsed: Duration },

    /// Caller cancelled the run
    Cancelled { elapsed: Duration },

    /// Input could not be written and verified within the retry budget
    SubmissionFailed { attempts: u32, last_error: String },

    /// Marker observed but required artifacts are missing
    RetrievalFailed { missing: Vec<String> },

    /// Worker could not be started
    StartFailed { error: String },
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Stable outcome label (logs, metrics, reports)
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Success { .. } => "success",
            Self::Timeout { .. } => "timeout",
            Self::Cancelled { .. } => "cancelled",
            Self::SubmissionFailed { .. } => "submission_failed",
            Self::RetrievalFailed { .. } => "retrieval_failed",
            Self::StartFailed { .. } => "start_failed",
        }
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success { artifacts } => {
                write!(f, "success ({} artifacts)", artifacts.len())
            }
            Self::Timeout { elapsed } => {
                write!(f, "timed out after {:.1}s", elapsed.as_secs_f64())
            }
            Self::Cancelled { elapsed } => {
                write!(f, "cancelled after {:.1}s", elapsed.as_secs_f64())
            }
            Self::SubmissionFailed {
                attempts,
                last_error,
            } => write!(
                f,
                "submission failed after {attempts} attempts: {last_error}"
            ),
            Self::RetrievalFailed { missing } => {
                write!(f, "missing required output: {}", missing.join(", "))
            }
            Self::StartFailed { error } => write!(f, "worker start failed: {error}"),
        }
    }
}

/// File name of the run report exported next to the artifacts;
/// no artifact may use it
pub const REPORT_FILE: &str = "run_report.json";

/// Everything the caller learns about a run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub job_id: Uuid,
    pub namespace: JobNamespace,
    pub outcome: RunOutcome,
    /// State the run ended in (`Done` or `Failed`)
    pub final_state: JobState,
    /// Submission attempts actually made
    pub submission_attempts: u32,
    /// Completion probes actually made
    pub polls: u64,
    /// Wall time from start to teardown
    pub elapsed: Duration,
    /// Worker log tail, captured on failure only
    pub diagnostics: Option<String>,
    /// Set when stopping the worker failed; the outcome is kept as is
    pub teardown_error: Option<String>,
}

impl RunReport {
    /// Outcome succeeded and the worker was stopped cleanly
    pub fn is_clean(&self) -> bool {
        self.outcome.is_success() && self.teardown_error.is_none()
    }
}
