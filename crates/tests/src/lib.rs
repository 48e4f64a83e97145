//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 模拟 e2e 测试（MockWorker + MemoryStore，无需 docker）
//! - 目录存储上的真实文件系统往返

#[cfg(test)]
mod contract_tests {
    use contracts::{ArtifactSpec, PipelineConfig, PollPolicy};
    use std::time::Duration;

    #[test]
    fn test_default_config_is_valid() {
        let config = PipelineConfig::default();
        config_loader::ConfigLoader::validate(&config).unwrap();
        assert_eq!(config.artifacts, ArtifactSpec::default_set());
    }

    #[test]
    fn test_probe_bound_matches_deadline() {
        let policy = PollPolicy::new(Duration::from_secs(1), Duration::from_secs(10));
        assert_eq!(policy.max_probes(), 11);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::time::Duration;

    use bytes::Bytes;
    use contracts::{
        ArtifactSpec, Job, JobNamespace, JobState, PollPolicy, RetryPolicy, RunOutcome,
        SharedStore,
    };
    use orchestrator::{CancellationToken, Orchestrator};
    use shared_store::{DirectoryStore, MemoryStore, MemoryStoreConfig};
    use worker::{MockWorker, MockWorkerConfig};

    const INTERVAL: Duration = Duration::from_secs(1);

    /// Two URLs, deadline of 10 poll intervals, default artifact set
    fn job() -> Job {
        Job::builder(["http://a", "http://b"])
            .poll(PollPolicy::new(INTERVAL, INTERVAL * 10))
            .retry(RetryPolicy::new(3, Duration::from_secs(1)))
            .build()
            .unwrap()
    }

    fn orchestrator(
        store: &MemoryStore,
        config: MockWorkerConfig,
    ) -> Orchestrator<MemoryStore, MockWorker<MemoryStore>> {
        Orchestrator::new(store.clone(), MockWorker::new(store.clone(), config))
    }

    /// End-to-end test: submit → marker after ~3 intervals → collect
    #[tokio::test(start_paused = true)]
    async fn test_e2e_success() {
        let store = MemoryStore::new();
        let report_bytes = Bytes::from_static(b"{\"urls\":2,\"status\":\"ok\"}\n");
        let orchestrator = orchestrator(
            &store,
            MockWorkerConfig::completing_after(INTERVAL * 3 + INTERVAL / 2)
                .with_artifact("analysis/final_report.json", report_bytes.clone()),
        );
        let job = job();
        let input_key = job.resolved_input_key();
        let payload = job.input_payload();

        let report = orchestrator.run(job).await;

        let RunOutcome::Success { artifacts } = &report.outcome else {
            panic!("unexpected outcome: {:?}", report.outcome);
        };
        assert_eq!(artifacts["final_report.json"], report_bytes);
        assert_eq!(report.final_state, JobState::Done);
        // Probes at 0s, 1s, 2s, 3s, 4s
        assert_eq!(report.polls, 5);
        assert_eq!(report.elapsed, INTERVAL * 4);
        assert_eq!(store.peek(&input_key), Some(payload));
        assert_eq!(
            orchestrator.worker().input_seen(),
            Some(Bytes::from_static(b"http://a\nhttp://b\n"))
        );
        assert_eq!(orchestrator.worker().stops(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_e2e_timeout() {
        let store = MemoryStore::new();
        let orchestrator = orchestrator(&store, MockWorkerConfig::never_completing());

        let report = orchestrator.run(job()).await;

        assert_eq!(
            report.outcome,
            RunOutcome::Timeout {
                elapsed: INTERVAL * 10
            }
        );
        assert_eq!(report.final_state, JobState::Failed);
        assert_eq!(report.polls, 11);
        assert_eq!(store.probe_count(), 11);
        assert_eq!(orchestrator.worker().stops(), 1);
        assert_eq!(orchestrator.worker().log_fetches(), 1);
        assert_eq!(
            report.diagnostics.as_deref(),
            Some("mock worker: no output")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_e2e_cancel_during_polling() {
        let store = MemoryStore::new();
        let cancel = CancellationToken::new();
        let orchestrator = orchestrator(&store, MockWorkerConfig::never_completing())
            .with_cancellation(cancel.clone());

        let cancel_at = Duration::from_millis(3_200);
        tokio::spawn(async move {
            tokio::time::sleep(cancel_at).await;
            cancel.cancel();
        });

        let report = orchestrator.run(job()).await;

        let RunOutcome::Cancelled { elapsed } = report.outcome else {
            panic!("expected cancellation, got {:?}", report.outcome);
        };
        assert!(elapsed >= cancel_at);
        assert!(elapsed < cancel_at + INTERVAL);
        assert_eq!(report.final_state, JobState::Failed);
        assert_eq!(orchestrator.worker().stops(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_e2e_submission_retried_within_budget() {
        // Attempts 1 and 2 are rejected, attempt 3 (the last one) lands
        let store = MemoryStore::with_config(MemoryStoreConfig {
            failing_puts: 2,
            ..Default::default()
        });
        let orchestrator = orchestrator(
            &store,
            MockWorkerConfig::completing_after(Duration::from_millis(4_500))
                .with_artifact("analysis/final_report.json", "{}"),
        );

        let report = orchestrator.run(job()).await;

        assert!(report.outcome.is_success(), "{:?}", report.outcome);
        assert_eq!(report.submission_attempts, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_e2e_truncated_write_is_retried() {
        let store = MemoryStore::with_config(MemoryStoreConfig {
            truncating_puts: 1,
            ..Default::default()
        });
        let orchestrator = orchestrator(
            &store,
            MockWorkerConfig::completing_after(Duration::from_millis(2_500))
                .with_artifact("analysis/final_report.json", "{}"),
        );
        let job = job();
        let input_key = job.resolved_input_key();
        let payload = job.input_payload();

        let report = orchestrator.run(job).await;

        assert!(report.outcome.is_success(), "{:?}", report.outcome);
        assert_eq!(report.submission_attempts, 2);
        assert_eq!(store.peek(&input_key), Some(payload));
    }

    #[tokio::test(start_paused = true)]
    async fn test_e2e_submission_budget_exhausted() {
        let store = MemoryStore::with_config(MemoryStoreConfig {
            failing_puts: u32::MAX,
            ..Default::default()
        });
        let orchestrator = orchestrator(&store, MockWorkerConfig::never_completing());
        let job = Job::builder(["http://a"])
            .retry(RetryPolicy::new(4, Duration::from_secs(2)))
            .build()
            .unwrap();

        let report = orchestrator.run(job).await;

        assert!(matches!(
            report.outcome,
            RunOutcome::SubmissionFailed { attempts: 4, .. }
        ));
        // No backoff after the last attempt
        assert_eq!(report.elapsed, Duration::from_secs(6));
        assert_eq!(report.polls, 0);
        assert_eq!(store.probe_count(), 0);
        assert_eq!(orchestrator.worker().stops(), 1);
        assert!(report.diagnostics.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_e2e_partial_success() {
        let store = MemoryStore::new();
        let orchestrator = orchestrator(
            &store,
            MockWorkerConfig::completing_after(Duration::from_millis(500))
                .with_artifact("analysis/final_report.json", "{\"ok\":true}")
                .with_artifact("status/fetch_complete.json", "{}"),
        );

        let report = orchestrator.run(job()).await;

        let RunOutcome::Success { artifacts } = report.outcome else {
            panic!("unexpected outcome: {:?}", report.outcome);
        };
        assert_eq!(
            artifacts.keys().map(String::as_str).collect::<Vec<_>>(),
            ["fetch_complete.json", "final_report.json"]
        );
        assert!(report.diagnostics.is_none());
        assert_eq!(orchestrator.worker().log_fetches(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_e2e_missing_required_output() {
        let store = MemoryStore::new();
        let orchestrator = orchestrator(
            &store,
            MockWorkerConfig::completing_after(Duration::from_millis(500))
                .with_artifact("status/fetch_complete.json", "{}")
                .with_artifact("status/process_complete.json", "{}"),
        );

        let report = orchestrator.run(job()).await;

        assert_eq!(
            report.outcome,
            RunOutcome::RetrievalFailed {
                missing: vec!["final_report.json".to_string()]
            }
        );
        assert!(report.diagnostics.is_some());
        assert_eq!(orchestrator.worker().stops(), 1);
    }

    #[tokio::test]
    async fn test_submission_is_idempotent() {
        let store = MemoryStore::new();
        let orchestrator = orchestrator(&store, MockWorkerConfig::never_completing());
        let job = job();

        assert_eq!(orchestrator.submit(&job).await.attempts(), 1);
        assert_eq!(orchestrator.submit(&job).await.attempts(), 1);

        assert_eq!(store.put_count(), 2);
        assert_eq!(store.keys(), vec![job.resolved_input_key()]);
        assert_eq!(store.peek(&job.resolved_input_key()), Some(job.input_payload()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_jobs_are_isolated() {
        let store = MemoryStore::new();
        let first = orchestrator(
            &store,
            MockWorkerConfig::completing_after(Duration::from_millis(1_500))
                .with_artifact("analysis/final_report.json", "first"),
        );
        let second = orchestrator(
            &store,
            MockWorkerConfig::completing_after(Duration::from_millis(2_500))
                .with_artifact("analysis/final_report.json", "second"),
        );
        let (job_a, job_b) = (job(), job());
        assert_ne!(job_a.namespace, job_b.namespace);

        let (a, b) = tokio::join!(first.run(job_a), second.run(job_b));

        let artifact = |outcome: &RunOutcome| match outcome {
            RunOutcome::Success { artifacts } => artifacts["final_report.json"].clone(),
            other => panic!("unexpected outcome: {other:?}"),
        };
        assert_eq!(artifact(&a.outcome), Bytes::from_static(b"first"));
        assert_eq!(artifact(&b.outcome), Bytes::from_static(b"second"));
        assert!(store
            .keys()
            .iter()
            .all(|key| key.as_str().starts_with("jobs/")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_root_namespace_layout() {
        let store = MemoryStore::new();
        let orchestrator = orchestrator(
            &store,
            MockWorkerConfig::completing_after(Duration::from_millis(500))
                .with_artifact("analysis/final_report.json", "{}"),
        );
        let job = Job::builder(["http://a"])
            .namespace(JobNamespace::root())
            .build()
            .unwrap();

        let report = orchestrator.run(job).await;

        assert!(report.outcome.is_success());
        let keys: Vec<String> = store.keys().iter().map(|k| k.to_string()).collect();
        assert_eq!(
            keys,
            [
                "analysis/final_report.json",
                "input/urls.txt",
                "status/analyze_complete.json"
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_config_driven_layout() {
        let config = config_loader::ConfigLoader::load_from_str(
            r#"
[job]
poll_interval_ms = 200
deadline_ms = 5000
retry_budget = 2

[layout]
input_key = "in/list.txt"
completion_marker = "done.flag"

[[artifacts]]
name = "result.json"
key = "out/result.json"
required = true
"#,
            config_loader::ConfigFormat::Toml,
        )
        .unwrap();

        let job = Job::builder(["http://a"])
            .input_key(config.layout.input_key.clone())
            .marker_key(config.layout.completion_marker.clone())
            .artifacts(config.artifacts.iter().cloned())
            .poll(config.job.poll_policy())
            .retry(config.job.retry_policy())
            .build()
            .unwrap();
        let store = MemoryStore::new();
        let orchestrator = orchestrator(
            &store,
            MockWorkerConfig::completing_after(Duration::from_millis(900))
                .with_artifact("out/result.json", "[1,2,3]"),
        );

        let marker = job.resolved_marker_key();
        let report = orchestrator.run(job).await;

        assert!(report.outcome.is_success(), "{:?}", report.outcome);
        // Probes every 200ms: marker written at 900ms, seen at 1000ms
        assert_eq!(report.polls, 6);
        assert!(marker.as_str().ends_with("/done.flag"));
        assert!(orchestrator.worker().input_seen().is_some());
    }

    /// Real filesystem round trip through the directory store
    #[tokio::test]
    async fn test_e2e_directory_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirectoryStore::new(dir.path().join("shared")).unwrap();
        let worker = MockWorker::new(
            store.clone(),
            MockWorkerConfig::completing_after(Duration::from_millis(50))
                .with_artifact("analysis/final_report.json", "{\"ok\":true}"),
        );
        let orchestrator = Orchestrator::new(store.clone(), worker);
        let job = Job::builder(["http://a", "http://b"])
            .artifact(
                ArtifactSpec::required("final_report.json", "analysis/final_report.json")
                    .unwrap(),
            )
            .poll(PollPolicy::new(
                Duration::from_millis(10),
                Duration::from_secs(5),
            ))
            .build()
            .unwrap();
        let input_path = store.path_for(&job.resolved_input_key());

        let report = orchestrator.run(job).await;

        assert!(report.outcome.is_success(), "{:?}", report.outcome);
        assert_eq!(
            std::fs::read_to_string(input_path).unwrap(),
            "http://a\nhttp://b\n"
        );
        assert_eq!(store.name(), orchestrator.store().name());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_summary() {
        let store = MemoryStore::new();
        let orchestrator = orchestrator(&store, MockWorkerConfig::never_completing());

        let report = orchestrator.run(job()).await;
        let stats = observability::RunStats::from_report(&report);

        assert!(!stats.is_success());
        assert_eq!(stats.outcome, "timeout");
        assert!(stats.to_string().contains("Completion polls: 11"));
    }
}
