//! Pipeline 指标收集模块
//!
//! 记录提交、轮询、产物收集与运行结果的指标，并提供单次运行的摘要。

use std::fmt;
use std::time::Duration;

use contracts::{JobState, RunOutcome, RunReport};
use metrics::{counter, gauge, histogram};

/// 记录一次提交尝试
pub fn record_submission_attempt(store: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "url_pipeline_submission_attempts_total",
        "store" => store.to_string(),
        "status" => status
    )
    .increment(1);
}

/// 记录一次完成标记探测
pub fn record_poll(ready: bool, latency: Duration) {
    counter!("url_pipeline_polls_total").increment(1);
    histogram!("url_pipeline_probe_latency_ms").record(latency.as_secs_f64() * 1000.0);
    if ready {
        counter!("url_pipeline_markers_observed_total").increment(1);
    }
}

/// 记录产物读取结果
pub fn record_artifact(name: &str, present: bool, size: usize) {
    let status = if present { "present" } else { "missing" };
    counter!(
        "url_pipeline_artifacts_total",
        "artifact" => name.to_string(),
        "status" => status
    )
    .increment(1);
    if present {
        histogram!("url_pipeline_artifact_bytes", "artifact" => name.to_string())
            .record(size as f64);
    }
}

/// 记录 worker 停止结果
pub fn record_teardown(success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!("url_pipeline_teardowns_total", "status" => status).increment(1);
}

/// 记录状态迁移
pub fn record_state(state: JobState) {
    counter!("url_pipeline_state_transitions_total", "state" => state.as_str()).increment(1);
}

/// 记录当前正在运行的 job 数量
pub fn record_active_jobs(delta: f64) {
    gauge!("url_pipeline_active_jobs").increment(delta);
}

/// 记录运行结果与耗时
pub fn record_outcome(outcome: &RunOutcome, elapsed: Duration) {
    counter!("url_pipeline_runs_total", "outcome" => outcome.kind()).increment(1);
    histogram!("url_pipeline_run_duration_seconds", "outcome" => outcome.kind())
        .record(elapsed.as_secs_f64());
}

/// 单次运行摘要
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    pub outcome: String,
    pub final_state: String,
    pub submission_attempts: u32,
    pub polls: u64,
    pub elapsed: Duration,
    pub artifacts: usize,
    pub artifact_bytes: u64,
    pub missing: Vec<String>,
    pub has_diagnostics: bool,
    /// worker 停止失败的原因
    pub teardown_error: Option<String>,
}

impl RunStats {
    /// 从运行报告生成摘要
    pub fn from_report(report: &RunReport) -> Self {
        let (artifacts, artifact_bytes, missing) = match &report.outcome {
            RunOutcome::Success { artifacts } => (
                artifacts.len(),
                artifacts.values().map(|data| data.len() as u64).sum(),
                Vec::new(),
            ),
            RunOutcome::RetrievalFailed { missing } => (0, 0, missing.clone()),
            _ => (0, 0, Vec::new()),
        };

        Self {
            outcome: report.outcome.kind().to_string(),
            final_state: report.final_state.to_string(),
            submission_attempts: report.submission_attempts,
            polls: report.polls,
            elapsed: report.elapsed,
            artifacts,
            artifact_bytes,
            missing,
            has_diagnostics: report.diagnostics.is_some(),
            teardown_error: report.teardown_error.clone(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome == "success" && self.teardown_error.is_none()
    }
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Run Summary ===")?;
        writeln!(f, "Outcome: {} (state: {})", self.outcome, self.final_state)?;
        writeln!(f, "Elapsed: {:.2}s", self.elapsed.as_secs_f64())?;
        writeln!(f, "Submission attempts: {}", self.submission_attempts)?;
        writeln!(f, "Completion polls: {}", self.polls)?;
        writeln!(
            f,
            "Artifacts collected: {} ({} bytes)",
            self.artifacts, self.artifact_bytes
        )?;
        if !self.missing.is_empty() {
            writeln!(f, "Missing: {}", self.missing.join(", "))?;
        }
        if self.has_diagnostics {
            writeln!(f, "Worker logs captured in report")?;
        }
        if let Some(error) = &self.teardown_error {
            writeln!(f, "Teardown failed: {error}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use contracts::JobNamespace;
    use std::collections::BTreeMap;

    fn report(outcome: RunOutcome, final_state: JobState) -> RunReport {
        RunReport {
            job_id: uuid::Uuid::nil(),
            namespace: JobNamespace::root(),
            outcome,
            final_state,
            submission_attempts: 2,
            polls: 4,
            elapsed: Duration::from_millis(1500),
            diagnostics: None,
            teardown_error: None,
        }
    }

    #[test]
    fn test_stats_from_success() {
        let artifacts = BTreeMap::from([
            ("final_report.json".to_string(), Bytes::from_static(b"{}")),
            ("fetch_complete.json".to_string(), Bytes::from_static(b"{\"ok\":1}")),
        ]);
        let stats = RunStats::from_report(&report(
            RunOutcome::Success { artifacts },
            JobState::Done,
        ));

        assert!(stats.is_success());
        assert_eq!(stats.artifacts, 2);
        assert_eq!(stats.artifact_bytes, 10);
        assert_eq!(stats.polls, 4);
    }

    #[test]
    fn test_summary_display() {
        let stats = RunStats::from_report(&report(
            RunOutcome::RetrievalFailed {
                missing: vec!["final_report.json".into()],
            },
            JobState::Failed,
        ));

        let output = stats.to_string();
        assert!(output.contains("Outcome: retrieval_failed (state: failed)"));
        assert!(output.contains("Elapsed: 1.50s"));
        assert!(output.contains("Missing: final_report.json"));
    }

    #[test]
    fn test_teardown_failure_is_not_success() {
        let mut report = report(
            RunOutcome::Success {
                artifacts: BTreeMap::new(),
            },
            JobState::Done,
        );
        report.teardown_error = Some("'docker compose down' exited with 1".into());

        let stats = RunStats::from_report(&report);

        assert!(!stats.is_success());
        assert!(stats
            .to_string()
            .contains("Teardown failed: 'docker compose down' exited with 1"));
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_submission_attempt("memory", true);
        record_poll(false, Duration::from_millis(3));
        record_artifact("final_report.json", true, 10);
        record_teardown(true);
        record_state(JobState::Polling);
        record_active_jobs(1.0);
        record_outcome(
            &RunOutcome::Timeout {
                elapsed: Duration::from_secs(300),
            },
            Duration::from_secs(300),
        );
    }
}
