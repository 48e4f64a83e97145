//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{PipelineConfig, StoreConfig, WorkerConfig};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    store: String,
    worker: String,
    poll_interval_ms: u64,
    deadline_ms: u64,
    retry_budget: u32,
    required_artifacts: usize,
    optional_artifacts: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(config) => {
            let warnings = collect_warnings(&config);
            let required = config.artifacts.iter().filter(|a| a.required).count();

            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", config.version),
                    store: config.store.kind().to_string(),
                    worker: config.worker.kind().to_string(),
                    poll_interval_ms: config.job.poll_interval_ms,
                    deadline_ms: config.job.deadline_ms,
                    retry_budget: config.job.retry_budget,
                    required_artifacts: required,
                    optional_artifacts: config.artifacts.len() - required,
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &PipelineConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.artifacts.iter().all(|a| a.required) {
        warnings.push(
            "No optional artifacts declared - any missing output fails the run".to_string(),
        );
    }

    if config.job.deadline_ms < config.job.poll_interval_ms.saturating_mul(10) {
        warnings.push(format!(
            "deadline_ms ({}) is less than 10 x poll_interval_ms ({}) - completion is probed only a few times",
            config.job.deadline_ms, config.job.poll_interval_ms
        ));
    }

    if config.job.namespace.as_deref() == Some("") {
        warnings.push(
            "job.namespace pins the store root - concurrent jobs on this store will collide"
                .to_string(),
        );
    }

    if config.job.retry_budget == 1 {
        warnings.push("retry_budget is 1 - transient store errors are not retried".to_string());
    }

    // A container store and a container worker normally share the same container
    if let (StoreConfig::Container { container, .. }, WorkerConfig::Container { name, .. }) =
        (&config.store, &config.worker)
    {
        if container != name {
            warnings.push(format!(
                "store.container '{container}' differs from worker.name '{name}'"
            ));
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Store: {}", summary.store);
            println!("  Worker: {}", summary.worker);
            println!(
                "  Polling: every {} ms, deadline {} ms",
                summary.poll_interval_ms, summary.deadline_ms
            );
            println!("  Retry budget: {}", summary.retry_budget);
            println!(
                "  Artifacts: {} required, {} optional",
                summary.required_artifacts, summary.optional_artifacts
            );
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
