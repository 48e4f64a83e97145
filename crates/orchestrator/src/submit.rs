//! Input submission with bounded retry

use bytes::Bytes;
use contracts::{Job, SharedStore, StoreKey};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

/// Result of the submission step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// Inputs written and verified
    Submitted { attempts: u32 },
    /// Retry budget exhausted
    Failed { attempts: u32, last_error: String },
    /// Cancelled between attempts
    Cancelled { attempts: u32 },
}

impl SubmissionOutcome {
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Submitted { attempts }
            | Self::Failed { attempts, .. }
            | Self::Cancelled { attempts } => *attempts,
        }
    }
}

/// Write the job inputs to its input key, retrying with a fixed backoff.
///
/// Every attempt overwrites the same key and is verified by reading the key
/// back: it must be present and non-empty. A budget of zero still makes one
/// attempt. There is no pause after the last attempt, and cancellation is
/// honoured between attempts.
#[instrument(
    name = "submit_inputs",
    skip(store, job, cancel),
    fields(job_id = %job.id, store = %store.name(), inputs = job.inputs.len())
)]
pub async fn submit<S: SharedStore + Sync>(
    store: &S,
    job: &Job,
    cancel: &CancellationToken,
) -> SubmissionOutcome {
    let key = job.resolved_input_key();
    let payload = job.input_payload();
    let budget = job.retry.budget.max(1);
    let mut last_error = String::new();

    for attempt in 1..=budget {
        if cancel.is_cancelled() {
            return SubmissionOutcome::Cancelled {
                attempts: attempt - 1,
            };
        }

        match write_and_verify(store, &key, payload.clone()).await {
            Ok(()) => {
                observability::record_submission_attempt(store.name(), true);
                info!(attempt, key = %key, bytes = payload.len(), "Inputs submitted");
                return SubmissionOutcome::Submitted { attempts: attempt };
            }
            Err(e) => {
                observability::record_submission_attempt(store.name(), false);
                warn!(attempt, budget, error = %e, "Submission attempt failed");
                last_error = e;
            }
        }

        if attempt < budget {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return SubmissionOutcome::Cancelled { attempts: attempt };
                }
                _ = tokio::time::sleep(job.retry.backoff) => {}
            }
        }
    }

    SubmissionOutcome::Failed {
        attempts: budget,
        last_error,
    }
}

async fn write_and_verify<S: SharedStore + Sync>(
    store: &S,
    key: &StoreKey,
    payload: Bytes,
) -> Result<(), String> {
    store.put(key, payload).await.map_err(|e| e.to_string())?;

    match store.get(key).await {
        Ok(Some(data)) if !data.is_empty() => Ok(()),
        Ok(Some(_)) => Err(format!("'{key}' is empty after write")),
        Ok(None) => Err(format!("'{key}' is absent after write")),
        Err(e) => Err(format!("verifying '{key}' failed: {e}")),
    }
}
