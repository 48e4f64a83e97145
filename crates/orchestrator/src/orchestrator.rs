//! Orchestrator 核心实现
//!
//! 启动 worker，提交输入，轮询完成标记，收集产物，
//! 并保证在每条退出路径上恰好 teardown 一次。

use contracts::{Job, JobState, RunOutcome, RunReport, SharedStore, Worker};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::collect::{collect_outputs, Collected};
use crate::diagnostics::best_effort;
use crate::guard::TeardownGuard;
use crate::poll::{poll_until, PollOutcome};
use crate::state::JobStateMachine;
use crate::submit::{submit, SubmissionOutcome};

/// Pipeline orchestrator
///
/// 持有共享存储与 worker；每次 `run` 处理一个 job。
pub struct Orchestrator<S, W> {
    store: S,
    worker: W,
    cancel: CancellationToken,
}

/// Counters accumulated while driving one job
#[derive(Debug, Default)]
struct Progress {
    attempts: u32,
    polls: u64,
}

impl<S, W> Orchestrator<S, W>
where
    S: SharedStore + Sync,
    W: Worker + Sync,
{
    pub fn new(store: S, worker: W) -> Self {
        Self {
            store,
            worker,
            cancel: CancellationToken::new(),
        }
    }

    /// Use an externally owned cancellation token (e.g. wired to signals)
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that cancels the job in progress
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn worker(&self) -> &W {
        &self.worker
    }

    /// Write the job inputs to the store, retrying within the job's budget
    pub async fn submit(&self, job: &Job) -> SubmissionOutcome {
        submit(&self.store, job, &self.cancel).await
    }

    /// Poll for the job's completion marker until it appears, the deadline
    /// passes or the job is cancelled
    pub async fn await_completion(&self, job: &Job) -> PollOutcome {
        let marker = job.resolved_marker_key();
        let marker = &marker;
        let store = &self.store;

        let outcome = poll_until(&job.poll, &self.cancel, move || async move {
            let probe_started = Instant::now();
            let ready = store.exists(marker).await;
            observability::record_poll(ready, probe_started.elapsed());
            ready
        })
        .await;

        match outcome {
            PollOutcome::Ready { elapsed, polls } => {
                info!(
                    marker = %marker,
                    polls,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Completion marker observed"
                );
            }
            PollOutcome::TimedOut { elapsed, polls } => {
                warn!(
                    marker = %marker,
                    polls,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Completion deadline exceeded"
                );
            }
            PollOutcome::Cancelled { elapsed, polls } => {
                warn!(polls, elapsed_ms = elapsed.as_millis() as u64, "Polling cancelled");
            }
        }
        outcome
    }

    /// Read every declared artifact; only call once the marker was observed
    pub async fn collect_outputs(&self, job: &Job) -> Collected {
        collect_outputs(&self.store, job).await
    }

    /// Run one job to a terminal state
    ///
    /// Never fails: every failure becomes a [`RunOutcome`] in the report.
    /// The worker is stopped exactly once whatever the outcome, and its log
    /// tail is captured (best effort) before teardown when the run failed.
    /// A failed stop is reported in [`RunReport::teardown_error`].
    ///
    /// Stop a run through the cancellation token. Dropping this future
    /// mid-flight (e.g. under `tokio::time::timeout`) skips teardown and
    /// leaves the worker running.
    #[instrument(
        name = "orchestrator_run",
        skip(self, job),
        fields(
            job_id = %job.id,
            namespace = %job.namespace,
            worker = %self.worker.name(),
            store = %self.store.name()
        )
    )]
    pub async fn run(&self, job: Job) -> RunReport {
        let started = Instant::now();
        observability::record_active_jobs(1.0);
        info!(inputs = job.inputs.len(), artifacts = job.artifacts.len(), "Job started");

        let mut machine = JobStateMachine::new();
        let mut progress = Progress::default();

        let guard = TeardownGuard::new(&self.worker);
        let outcome = self
            .drive(&job, &mut machine, &mut progress, started)
            .await;

        let diagnostics = if outcome.is_success() {
            None
        } else {
            best_effort("fetch worker logs", self.worker.fetch_logs())
                .await
                .filter(|logs| !logs.trim().is_empty())
        };

        // A failed stop keeps the outcome but is carried in the report
        let teardown_error = guard.teardown().await.err().map(|e| e.to_string());

        let final_state = if outcome.is_success() {
            machine.state()
        } else {
            machine.fail()
        };
        let elapsed = started.elapsed();

        observability::record_outcome(&outcome, elapsed);
        observability::record_active_jobs(-1.0);

        if let Some(teardown_error) = &teardown_error {
            error!(
                outcome = %outcome,
                error = %teardown_error,
                "Worker may still be running after the job"
            );
        } else if outcome.is_success() {
            info!(outcome = %outcome, elapsed_ms = elapsed.as_millis() as u64, "Job finished");
        } else {
            warn!(
                outcome = %outcome,
                state = %final_state,
                elapsed_ms = elapsed.as_millis() as u64,
                "Job failed"
            );
        }

        RunReport {
            job_id: job.id,
            namespace: job.namespace,
            outcome,
            final_state,
            submission_attempts: progress.attempts,
            polls: progress.polls,
            elapsed,
            diagnostics,
            teardown_error,
        }
    }

    async fn drive(
        &self,
        job: &Job,
        machine: &mut JobStateMachine,
        progress: &mut Progress,
        started: Instant,
    ) -> RunOutcome {
        advance(machine, JobState::Submitting);

        if self.cancel.is_cancelled() {
            return RunOutcome::Cancelled {
                elapsed: started.elapsed(),
            };
        }

        if let Err(e) = self.worker.start(&job.worker_context()).await {
            error!(error = %e, "Worker failed to start");
            return RunOutcome::StartFailed {
                error: e.to_string(),
            };
        }

        let submission = self.submit(job).await;
        progress.attempts = submission.attempts();
        match submission {
            SubmissionOutcome::Submitted { .. } => {}
            SubmissionOutcome::Failed {
                attempts,
                last_error,
            } => {
                return RunOutcome::SubmissionFailed {
                    attempts,
                    last_error,
                };
            }
            SubmissionOutcome::Cancelled { .. } => {
                return RunOutcome::Cancelled {
                    elapsed: started.elapsed(),
                };
            }
        }

        advance(machine, JobState::Polling);
        let polled = self.await_completion(job).await;
        progress.polls = polled.polls();
        match polled {
            PollOutcome::Ready { .. } => {}
            PollOutcome::TimedOut { elapsed, .. } => return RunOutcome::Timeout { elapsed },
            PollOutcome::Cancelled { .. } => {
                return RunOutcome::Cancelled {
                    elapsed: started.elapsed(),
                };
            }
        }

        advance(machine, JobState::Collecting);
        let collected = self.collect_outputs(job).await;
        if !collected.is_complete() {
            return RunOutcome::RetrievalFailed {
                missing: collected.all_missing(),
            };
        }

        advance(machine, JobState::Done);
        RunOutcome::Success {
            artifacts: collected.artifacts,
        }
    }
}

fn advance(machine: &mut JobStateMachine, to: JobState) {
    if let Err(e) = machine.transition(to) {
        error!(error = %e, "Job state machine violation");
    }
}
