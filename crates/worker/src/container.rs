//! Single-container worker driven through `docker run` / `docker rm`

use std::collections::BTreeMap;
use std::path::PathBuf;

use contracts::{Worker, WorkerContext, WorkerError};
use tracing::{debug, info, instrument};

use crate::docker::DockerCli;

/// Detached container settings
#[derive(Debug, Clone)]
pub struct ContainerConfig {
    pub image: String,
    /// Container name, also the handle used by `stop` and `fetch_logs`
    pub name: String,
    /// Host directory (or named volume) holding the shared store
    pub volume: PathBuf,
    /// Mount point of the shared store inside the container
    pub mount: String,
    /// Extra arguments after the image
    pub args: Vec<String>,
    /// Extra environment variables
    pub env: BTreeMap<String, String>,
    pub log_tail: u32,
}

/// Worker running the whole pipeline in one detached container
pub struct ContainerWorker {
    label: String,
    docker: DockerCli,
    config: ContainerConfig,
}

impl ContainerWorker {
    pub fn new(config: ContainerConfig) -> Self {
        Self::with_cli(DockerCli::new(), config)
    }

    pub fn with_cli(docker: DockerCli, config: ContainerConfig) -> Self {
        Self {
            label: format!("container:{}", config.name),
            docker,
            config,
        }
    }

    /// `docker run` argument list for `ctx`
    pub fn run_args(&self, ctx: &WorkerContext) -> Vec<String> {
        let mut args = vec![
            "run".to_string(),
            "-d".to_string(),
            "--name".to_string(),
            self.config.name.clone(),
            "-v".to_string(),
            format!("{}:{}", self.config.volume.display(), self.config.mount),
        ];

        let job_env = ctx.env().into_iter().map(|(k, v)| (k.to_string(), v));
        let extra_env = self.config.env.iter().map(|(k, v)| (k.clone(), v.clone()));
        for (key, value) in job_env.chain(extra_env) {
            args.push("-e".to_string());
            args.push(format!("{key}={value}"));
        }

        args.push(self.config.image.clone());
        args.extend(self.config.args.iter().cloned());
        args
    }
}

impl Worker for ContainerWorker {
    fn name(&self) -> &str {
        &self.label
    }

    #[instrument(name = "container_worker_start", skip(self, ctx), fields(container = %self.config.name, image = %self.config.image))]
    async fn start(&self, ctx: &WorkerContext) -> Result<(), WorkerError> {
        let output = self.docker.run(self.run_args(ctx), &[], None).await?;
        info!(
            container_id = %output.stdout_lossy().trim(),
            "Container started"
        );
        Ok(())
    }

    #[instrument(name = "container_worker_stop", skip(self), fields(container = %self.config.name))]
    async fn stop(&self) -> Result<(), WorkerError> {
        let output = self
            .docker
            .output(["rm", "-f", self.config.name.as_str()], &[], None)
            .await?;

        // A container that never got created is already stopped
        if output.success() || output.stderr.contains("No such container") {
            debug!(status = %output.status, "Container removed");
            return Ok(());
        }

        Err(WorkerError::CommandFailed {
            command: format!("{} rm -f {}", self.docker.program(), self.config.name),
            status: output.status.to_string(),
            stderr: output.stderr,
        })
    }

    async fn fetch_logs(&self) -> Result<String, WorkerError> {
        let tail = self.config.log_tail.to_string();
        let output = self
            .docker
            .run(
                ["logs", "--tail", tail.as_str(), self.config.name.as_str()],
                &[],
                None,
            )
            .await?;

        // `docker logs` replays the container's stderr on its own stderr
        let mut logs = output.stdout_lossy();
        if !output.stderr.is_empty() {
            if !logs.is_empty() && !logs.ends_with('\n') {
                logs.push('\n');
            }
            logs.push_str(&output.stderr);
        }
        Ok(logs)
    }
}
