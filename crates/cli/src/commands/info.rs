//! `info` command implementation.

use anyhow::{Context, Result};
use config_loader::ConfigLoader;
use contracts::{PipelineConfig, StoreConfig, WorkerConfig};

use super::load_config;
use crate::cli::InfoArgs;

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;

    if args.json {
        let json = ConfigLoader::to_json(&config).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print!("{}", render_config_info(&config, args.artifacts));
    }

    Ok(())
}

fn render_config_info(config: &PipelineConfig, show_artifacts: bool) -> String {
    let mut out = String::new();
    let mut line = |text: String| {
        out.push_str(&text);
        out.push('\n');
    };

    line("╔══════════════════════════════════════════════════════════════╗".into());
    line("║               URL Pipeline Configuration                     ║".into());
    line("╚══════════════════════════════════════════════════════════════╝\n".into());

    let job = &config.job;
    line("⏱  Job".into());
    line(format!("   ├─ Version: {:?}", config.version));
    line(format!(
        "   ├─ Polling: every {} ms, deadline {} ms ({} probes max)",
        job.poll_interval_ms,
        job.deadline_ms,
        job.poll_policy().max_probes()
    ));
    line(format!(
        "   ├─ Submission: {} attempts, {} ms backoff",
        job.retry_budget, job.retry_backoff_ms
    ));
    line(match job.namespace.as_deref() {
        Some("") => "   └─ Namespace: <root>".into(),
        Some(ns) => format!("   └─ Namespace: {ns}"),
        None => "   └─ Namespace: jobs/<job id>".into(),
    });

    line("\n📂 Layout".into());
    line(format!("   ├─ Input: {}", config.layout.input_key));
    line(format!(
        "   └─ Completion marker: {}",
        config.layout.completion_marker
    ));

    line("\n🗄  Store".into());
    match &config.store {
        StoreConfig::Directory { path } => {
            line(format!("   └─ Directory: {}", path.display()));
        }
        StoreConfig::Container { container, mount } => {
            line(format!("   └─ Container: {container}:{mount}"));
        }
    }

    line("\n🐳 Worker".into());
    match &config.worker {
        WorkerConfig::Compose {
            file,
            project,
            log_tail,
        } => {
            line(format!("   ├─ Compose file: {}", file.display()));
            line(format!("   ├─ Project: {project}"));
            line(format!("   └─ Log tail: {log_tail} lines"));
        }
        WorkerConfig::Container {
            image,
            name,
            volume,
            mount,
            args,
            env,
            log_tail,
        } => {
            line(format!("   ├─ Image: {image}"));
            line(format!("   ├─ Name: {name}"));
            line(format!("   ├─ Volume: {} -> {mount}", volume.display()));
            if !args.is_empty() {
                line(format!("   ├─ Args: {}", args.join(" ")));
            }
            if !env.is_empty() {
                line(format!("   ├─ Env: {} variables", env.len()));
            }
            line(format!("   └─ Log tail: {log_tail} lines"));
        }
    }

    let required = config.artifacts.iter().filter(|a| a.required).count();
    line(format!(
        "\n📦 Artifacts ({} required, {} optional)",
        required,
        config.artifacts.len() - required
    ));
    if show_artifacts {
        for (i, artifact) in config.artifacts.iter().enumerate() {
            let prefix = if i == config.artifacts.len() - 1 {
                "└─"
            } else {
                "├─"
            };
            let kind = if artifact.required { "required" } else { "optional" };
            line(format!(
                "   {prefix} {} <- {} ({kind})",
                artifact.name, artifact.key
            ));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_default_config() {
        let info = render_config_info(&PipelineConfig::default(), true);

        assert!(info.contains("every 5000 ms, deadline 300000 ms (61 probes max)"));
        assert!(info.contains("Namespace: jobs/<job id>"));
        assert!(info.contains("Compose file: docker-compose.yaml"));
        assert!(info.contains("final_report.json <- analysis/final_report.json (required)"));
        assert!(info.contains("1 required, 2 optional"));
    }

    #[test]
    fn test_render_without_artifact_list() {
        let mut config = PipelineConfig::default();
        config.job.namespace = Some(String::new());

        let info = render_config_info(&config, false);
        assert!(info.contains("Namespace: <root>"));
        assert!(!info.contains("analysis/final_report.json"));
    }
}
