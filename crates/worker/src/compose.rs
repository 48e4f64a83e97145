//! Compose worker - multi-container pipeline driven through `docker compose`

use std::path::PathBuf;
use std::sync::Mutex;

use contracts::{Worker, WorkerContext, WorkerError};
use tracing::{info, instrument};

use crate::docker::DockerCli;

/// Compose project settings
#[derive(Debug, Clone)]
pub struct ComposeConfig {
    /// Compose file
    pub file: PathBuf,
    /// Compose project name
    pub project: String,
    /// Log lines captured by `fetch_logs`
    pub log_tail: u32,
}

/// Worker backed by a compose project (`up -d` / `down` / `logs`)
pub struct ComposeWorker {
    name: String,
    docker: DockerCli,
    config: ComposeConfig,
    /// Environment of the last `start`, replayed for `down` and `logs` so
    /// variable interpolation in the compose file stays consistent
    env: Mutex<Vec<(&'static str, String)>>,
}

impl ComposeWorker {
    pub fn new(config: ComposeConfig) -> Self {
        Self::with_cli(DockerCli::new(), config)
    }

    pub fn with_cli(docker: DockerCli, config: ComposeConfig) -> Self {
        Self {
            name: format!("compose:{}", config.project),
            docker,
            config,
            env: Mutex::new(Vec::new()),
        }
    }

    fn compose_args(&self, tail: &[&str]) -> Vec<String> {
        let mut args = vec![
            "compose".to_string(),
            "-f".to_string(),
            self.config.file.display().to_string(),
            "-p".to_string(),
            self.config.project.clone(),
        ];
        args.extend(tail.iter().map(|s| s.to_string()));
        args
    }

    fn env(&self) -> Vec<(&'static str, String)> {
        self.env
            .lock()
            .map(|env| env.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

impl Worker for ComposeWorker {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(name = "compose_worker_start", skip(self, ctx), fields(project = %self.config.project, job_id = %ctx.job_id))]
    async fn start(&self, ctx: &WorkerContext) -> Result<(), WorkerError> {
        let env = ctx.env();
        if let Ok(mut slot) = self.env.lock() {
            *slot = env.clone();
        }

        self.docker
            .run(self.compose_args(&["up", "-d"]), &env, None)
            .await?;

        info!(project = %self.config.project, "Compose project started");
        Ok(())
    }

    #[instrument(name = "compose_worker_stop", skip(self), fields(project = %self.config.project))]
    async fn stop(&self) -> Result<(), WorkerError> {
        let env = self.env();
        self.docker
            .run(
                self.compose_args(&["down", "--remove-orphans"]),
                &env,
                None,
            )
            .await?;

        info!(project = %self.config.project, "Compose project stopped");
        Ok(())
    }

    async fn fetch_logs(&self) -> Result<String, WorkerError> {
        let tail = self.config.log_tail.to_string();
        let env = self.env();
        let output = self
            .docker
            .run(
                self.compose_args(&["logs", "--no-color", "--tail", &tail]),
                &env,
                None,
            )
            .await?;
        Ok(output.stdout_lossy())
    }
}
