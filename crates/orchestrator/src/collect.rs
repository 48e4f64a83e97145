//! Artifact collection
//!
//! Runs only after the completion marker has been observed. Every declared
//! artifact is read; absent, empty and unreadable artifacts are gathered
//! into one missing list instead of stopping at the first.

use std::collections::BTreeMap;

use bytes::Bytes;
use contracts::{Job, SharedStore};
use tracing::{debug, instrument, warn};

/// Result of reading the declared artifacts
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Collected {
    /// Present artifacts by name
    pub artifacts: BTreeMap<String, Bytes>,
    /// Missing required artifacts
    pub missing_required: Vec<String>,
    /// Missing optional artifacts
    pub missing_optional: Vec<String>,
}

impl Collected {
    /// Whether every required artifact was found
    pub fn is_complete(&self) -> bool {
        self.missing_required.is_empty()
    }

    /// Every missing name, required first
    pub fn all_missing(&self) -> Vec<String> {
        self.missing_required
            .iter()
            .chain(&self.missing_optional)
            .cloned()
            .collect()
    }
}

#[instrument(
    name = "collect_outputs",
    skip(store, job),
    fields(job_id = %job.id, artifacts = job.artifacts.len())
)]
pub async fn collect_outputs<S: SharedStore + Sync>(store: &S, job: &Job) -> Collected {
    let mut collected = Collected::default();

    for spec in &job.artifacts {
        let key = job.resolved_artifact_key(spec);
        let data = match store.get(&key).await {
            Ok(Some(data)) if !data.is_empty() => Some(data),
            Ok(Some(_)) => {
                debug!(artifact = %spec.name, key = %key, "Artifact is empty");
                None
            }
            Ok(None) => None,
            Err(e) => {
                warn!(artifact = %spec.name, key = %key, error = %e, "Artifact read failed");
                None
            }
        };

        match data {
            Some(data) => {
                observability::record_artifact(&spec.name, true, data.len());
                debug!(artifact = %spec.name, bytes = data.len(), "Artifact collected");
                collected.artifacts.insert(spec.name.clone(), data);
            }
            None if spec.required => {
                observability::record_artifact(&spec.name, false, 0);
                warn!(artifact = %spec.name, key = %key, "Required artifact missing");
                collected.missing_required.push(spec.name.clone());
            }
            None => {
                observability::record_artifact(&spec.name, false, 0);
                warn!(artifact = %spec.name, key = %key, "Optional artifact missing, continuing");
                collected.missing_optional.push(spec.name.clone());
            }
        }
    }

    collected
}
