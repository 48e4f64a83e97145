//! Job - one orchestration request
//!
//! A job is built per invocation, consumed once by the orchestrator and
//! dropped after the report is produced.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ContractError, JobNamespace, PollPolicy, RetryPolicy, StoreKey, WorkerContext};

/// Default relative key the inputs are written to
pub const DEFAULT_INPUT_KEY: &str = "input/urls.txt";
/// Default relative key of the completion marker
pub const DEFAULT_COMPLETION_MARKER: &str = "status/analyze_complete.json";

/// Declared output artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactSpec {
    /// Artifact name, also the file name it is exported under
    pub name: String,

    /// Relative key the worker writes the artifact to
    pub key: StoreKey,

    /// Missing required artifacts fail the run; optional ones are tolerated
    #[serde(default)]
    pub required: bool,
}

impl ArtifactSpec {
    pub fn required(name: impl Into<String>, key: &str) -> Result<Self, ContractError> {
        Ok(Self {
            name: name.into(),
            key: StoreKey::parse(key)?,
            required: true,
        })
    }

    pub fn optional(name: impl Into<String>, key: &str) -> Result<Self, ContractError> {
        Ok(Self {
            name: name.into(),
            key: StoreKey::parse(key)?,
            required: false,
        })
    }

    /// Artifacts of the fetch → process → analyze pipeline
    pub fn default_set() -> Vec<ArtifactSpec> {
        [
            ("final_report.json", "analysis/final_report.json", true),
            ("fetch_complete.json", "status/fetch_complete.json", false),
            ("process_complete.json", "status/process_complete.json", false),
        ]
        .into_iter()
        .map(|(name, key, required)| ArtifactSpec {
            name: name.to_string(),
            key: StoreKey::from_static(key),
            required,
        })
        .collect()
    }
}

/// One orchestration request
#[derive(Debug, Clone)]
pub struct Job {
    /// Unique job id
    pub id: Uuid,

    /// Key prefix isolating this job inside the store
    pub namespace: JobNamespace,

    /// Ordered input items (e.g. URLs)
    pub inputs: Vec<String>,

    /// Relative input key
    pub input_key: StoreKey,

    /// Relative completion-marker key
    pub marker_key: StoreKey,

    /// Declared output artifacts
    pub artifacts: Vec<ArtifactSpec>,

    /// Completion polling policy
    pub poll: PollPolicy,

    /// Submission retry policy
    pub retry: RetryPolicy,
}

impl Job {
    /// Start building a job for `inputs`
    pub fn builder<I, S>(inputs: I) -> JobBuilder
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        JobBuilder::new(inputs)
    }

    /// Bytes written to the input key: one item per line
    pub fn input_payload(&self) -> Bytes {
        let mut payload = self.inputs.join("\n");
        payload.push('\n');
        Bytes::from(payload)
    }

    /// Input key resolved inside the job namespace
    pub fn resolved_input_key(&self) -> StoreKey {
        self.namespace.key(&self.input_key)
    }

    /// Completion-marker key resolved inside the job namespace
    pub fn resolved_marker_key(&self) -> StoreKey {
        self.namespace.key(&self.marker_key)
    }

    /// Artifact key resolved inside the job namespace
    pub fn resolved_artifact_key(&self, artifact: &ArtifactSpec) -> StoreKey {
        self.namespace.key(&artifact.key)
    }

    /// Context handed to the worker on start
    pub fn worker_context(&self) -> WorkerContext {
        WorkerContext {
            job_id: self.id,
            namespace: self.namespace.clone(),
            input_key: self.resolved_input_key(),
            marker_key: self.resolved_marker_key(),
        }
    }
}

/// Builder for [`Job`]
#[derive(Debug, Clone)]
pub struct JobBuilder {
    inputs: Vec<String>,
    namespace: Option<JobNamespace>,
    input_key: Option<StoreKey>,
    marker_key: Option<StoreKey>,
    artifacts: Vec<ArtifactSpec>,
    poll: PollPolicy,
    retry: RetryPolicy,
}

impl JobBuilder {
    fn new<I, S>(inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inputs: inputs.into_iter().map(Into::into).collect(),
            namespace: None,
            input_key: None,
            marker_key: None,
            artifacts: Vec::new(),
            poll: PollPolicy::default(),
            retry: RetryPolicy::default(),
        }
    }

    /// Pin the namespace instead of deriving `jobs/<id>`
    pub fn namespace(mut self, namespace: JobNamespace) -> Self {
        self.namespace = Some(namespace);
        self
    }

    pub fn input_key(mut self, key: StoreKey) -> Self {
        self.input_key = Some(key);
        self
    }

    pub fn marker_key(mut self, key: StoreKey) -> Self {
        self.marker_key = Some(key);
        self
    }

    pub fn artifact(mut self, artifact: ArtifactSpec) -> Self {
        self.artifacts.push(artifact);
        self
    }

    pub fn artifacts(mut self, artifacts: impl IntoIterator<Item = ArtifactSpec>) -> Self {
        self.artifacts.extend(artifacts);
        self
    }

    pub fn poll(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Finish the job
    ///
    /// # Errors
    /// - no inputs
    /// - input key equal to the marker key
    pub fn build(self) -> Result<Job, ContractError> {
        if self.inputs.is_empty() {
            return Err(ContractError::EmptyJob);
        }

        let id = Uuid::new_v4();
        let namespace = match self.namespace {
            Some(namespace) => namespace,
            None => JobNamespace::new(&format!("jobs/{id}"))?,
        };
        let input_key = match self.input_key {
            Some(key) => key,
            None => StoreKey::parse(DEFAULT_INPUT_KEY)?,
        };
        let marker_key = match self.marker_key {
            Some(key) => key,
            None => StoreKey::parse(DEFAULT_COMPLETION_MARKER)?,
        };

        if input_key == marker_key {
            return Err(ContractError::invalid_key(
                marker_key.as_str(),
                "completion marker must differ from the input key",
            ));
        }

        let artifacts = if self.artifacts.is_empty() {
            ArtifactSpec::default_set()
        } else {
            self.artifacts
        };

        Ok(Job {
            id,
            namespace,
            inputs: self.inputs,
            input_key,
            marker_key,
            artifacts,
            poll: self.poll,
            retry: self.retry,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let job = Job::builder(["http://a", "http://b"]).build().unwrap();
        assert_eq!(job.inputs, vec!["http://a", "http://b"]);
        assert_eq!(job.namespace.prefix(), format!("jobs/{}", job.id));
        assert_eq!(
            job.resolved_input_key().as_str(),
            format!("jobs/{}/input/urls.txt", job.id)
        );
        assert_eq!(job.artifacts.len(), 3);
        assert_eq!(job.artifacts.iter().filter(|a| a.required).count(), 1);
        assert_eq!(job.poll, PollPolicy::default());
        assert_eq!(job.retry, RetryPolicy::default());
    }

    #[test]
    fn test_empty_job_rejected() {
        let result = Job::builder(Vec::<String>::new()).build();
        assert!(matches!(result, Err(ContractError::EmptyJob)));
    }

    #[test]
    fn test_marker_must_differ_from_input() {
        let key = StoreKey::parse("shared/urls.txt").unwrap();
        let result = Job::builder(["http://a"])
            .input_key(key.clone())
            .marker_key(key)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_input_payload_is_line_per_item() {
        let job = Job::builder(["http://a", "http://b"]).build().unwrap();
        assert_eq!(job.input_payload(), Bytes::from_static(b"http://a\nhttp://b\n"));
    }

    #[test]
    fn test_unique_namespaces() {
        let a = Job::builder(["x"]).build().unwrap();
        let b = Job::builder(["x"]).build().unwrap();
        assert_ne!(a.resolved_marker_key(), b.resolved_marker_key());
    }

    #[test]
    fn test_worker_context_env() {
        let job = Job::builder(["x"])
            .namespace(JobNamespace::root())
            .build()
            .unwrap();
        let env = job.worker_context().env();
        assert!(env.contains(&(crate::ENV_NAMESPACE, String::new())));
        assert!(env.contains(&(crate::ENV_INPUT_KEY, "input/urls.txt".to_string())));
    }
}
