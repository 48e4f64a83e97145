//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// URL Pipeline - drive an external fetch/process/analyze worker pipeline
#[derive(Parser, Debug)]
#[command(
    name = "url-pipeline",
    author,
    version,
    about = "External-worker URL pipeline orchestrator",
    long_about = "Starts a detached worker (compose project or single container), \n\
                  submits a list of URLs through a shared store, waits for the \n\
                  completion marker under a deadline and copies the results out."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "URL_PIPELINE_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "compact",
        global = true,
        env = "URL_PIPELINE_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one job: submit URLs, wait for completion, collect results
    Run(RunArgs),

    /// Validate a pipeline configuration file without running
    Validate(ValidateArgs),

    /// Display the effective configuration
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Pipeline configuration file (TOML or JSON); built-in defaults when omitted
    #[arg(short, long, env = "URL_PIPELINE_CONFIG")]
    pub config: Option<PathBuf>,

    /// File with one URL per line (blank lines skipped)
    #[arg(short, long)]
    pub input_file: Option<PathBuf>,

    /// URLs to process, appended after the ones from --input-file
    #[arg(value_name = "URL")]
    pub urls: Vec<String>,

    /// Directory receiving the collected artifacts and run_report.json
    #[arg(short, long, default_value = "output", env = "URL_PIPELINE_OUTPUT")]
    pub output: PathBuf,

    /// Override the completion deadline (seconds)
    #[arg(long, env = "URL_PIPELINE_DEADLINE_SECS")]
    pub deadline_secs: Option<u64>,

    /// Override the completion poll interval (milliseconds)
    #[arg(long, env = "URL_PIPELINE_POLL_INTERVAL_MS")]
    pub poll_interval_ms: Option<u64>,

    /// Override the submission retry budget
    #[arg(long, env = "URL_PIPELINE_RETRY_BUDGET")]
    pub retry_budget: Option<u32>,

    /// Pin the store namespace ("" = store root)
    #[arg(long, env = "URL_PIPELINE_NAMESPACE")]
    pub namespace: Option<String>,

    /// Validate configuration and inputs, print the plan and exit
    #[arg(long)]
    pub dry_run: bool,

    /// Expose Prometheus metrics on this port
    #[arg(long, env = "URL_PIPELINE_METRICS_PORT")]
    pub metrics_port: Option<u16>,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "pipeline.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file; built-in defaults when omitted
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show declared artifacts
    #[arg(long)]
    pub artifacts: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    Pretty,
    /// Compact single-line format
    #[default]
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_args() {
        let cli = Cli::try_parse_from([
            "url-pipeline",
            "-v",
            "run",
            "--input-file",
            "urls.txt",
            "-o",
            "out",
            "--deadline-secs",
            "60",
            "http://a",
            "http://b",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 1);
        let Commands::Run(args) = cli.command else {
            panic!("expected run command");
        };
        assert_eq!(args.urls, ["http://a", "http://b"]);
        assert_eq!(args.output, PathBuf::from("out"));
        assert_eq!(args.deadline_secs, Some(60));
        assert_eq!(args.input_file, Some(PathBuf::from("urls.txt")));
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["url-pipeline", "-q", "-v", "info"]).is_err());
    }
}
