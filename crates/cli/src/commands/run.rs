//! `run` command implementation.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use config_loader::ConfigLoader;
use contracts::{Job, RunReport, SharedStore, Worker};
use observability::RunStats;
use orchestrator::{CancellationToken, Orchestrator};
use tracing::{info, warn};

use super::load_config;
use crate::cli::RunArgs;
use crate::error::CliError;
use crate::pipeline::{
    apply_overrides, build_job, describe_plan, install_shutdown_handler, read_inputs,
    write_outputs, PipelineStore, PipelineWorker,
};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;

    // Apply CLI overrides, then re-check the result
    apply_overrides(&mut config, args);
    ConfigLoader::validate(&config).context("Invalid configuration after CLI overrides")?;

    let inputs = read_inputs(args.input_file.as_deref(), &args.urls)?;
    let job = build_job(&config, inputs)?;

    info!(
        job_id = %job.id,
        namespace = %job.namespace,
        inputs = job.inputs.len(),
        store = config.store.kind(),
        worker = config.worker.kind(),
        "Job prepared"
    );

    // Dry run - print the plan and exit
    if args.dry_run {
        info!("Dry run mode - configuration and inputs are valid, exiting");
        println!("{}", describe_plan(&config, &job));
        return Ok(());
    }

    // Fail on an unusable output directory before the worker is started
    std::fs::create_dir_all(&args.output).map_err(|e| CliError::output(&args.output, e))?;

    let store = PipelineStore::from_config(&config.store)?;
    let worker = PipelineWorker::from_config(&config.worker);
    let cancel = install_shutdown_handler();

    let report = execute_job(store, worker, cancel, job, &args.output).await?;
    finish(&report)
}

/// Run `job` to completion and write its outputs under `output`
pub async fn execute_job<S, W>(
    store: S,
    worker: W,
    cancel: CancellationToken,
    job: Job,
    output: &Path,
) -> Result<RunReport>
where
    S: SharedStore + Sync,
    W: Worker + Sync,
{
    let orchestrator = Orchestrator::new(store, worker).with_cancellation(cancel);

    info!(
        store = orchestrator.store().name(),
        worker = orchestrator.worker().name(),
        "Starting job..."
    );

    let started_at = Utc::now();
    let report = orchestrator.run(job.clone()).await;

    let report_path = write_outputs(output, &job, &report, started_at)
        .with_context(|| format!("Failed to write results to {}", output.display()))?;
    println!("Report: {}", report_path.display());

    Ok(report)
}

/// Print the summary and map the outcome to the exit status
fn finish(report: &RunReport) -> Result<()> {
    let stats = RunStats::from_report(report);
    println!("{stats}");

    if !report.outcome.is_success() {
        warn!(job_id = %report.job_id, outcome = report.outcome.kind(), "Job failed");
        return Err(CliError::RunFailed {
            job_id: report.job_id.to_string(),
            outcome: report.outcome.to_string(),
        }
        .into());
    }

    if let Some(error) = &report.teardown_error {
        warn!(job_id = %report.job_id, error = %error, "Job succeeded but teardown failed");
        return Err(CliError::TeardownFailed {
            job_id: report.job_id.to_string(),
            error: error.clone(),
        }
        .into());
    }

    info!(
        job_id = %report.job_id,
        elapsed_secs = report.elapsed.as_secs_f64(),
        "Job completed successfully"
    );
    Ok(())
}
