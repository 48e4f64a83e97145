//! Docker CLI runner
//!
//! Every interaction with the container runtime goes through the `docker`
//! binary; this module owns spawning it, feeding stdin and turning exit
//! statuses into [`WorkerError`]s.

use bytes::Bytes;
use contracts::WorkerError;
use std::ffi::OsStr;
use std::process::{ExitStatus, Stdio};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Raw result of one CLI invocation
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: Bytes,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// stdout as lossy UTF-8
    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }
}

/// Thin async wrapper around the `docker` binary
#[derive(Debug, Clone)]
pub struct DockerCli {
    program: String,
}

impl DockerCli {
    /// Use `docker` from `PATH`
    pub fn new() -> Self {
        Self::with_program("docker")
    }

    /// Use another binary (e.g. `podman`, or a test double)
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Run and return the raw output, whatever the exit status
    pub async fn output<I, S>(
        &self,
        args: I,
        env: &[(&str, String)],
        stdin: Option<Bytes>,
    ) -> Result<CommandOutput, WorkerError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let args: Vec<_> = args
            .into_iter()
            .map(|a| a.as_ref().to_os_string())
            .collect();
        let command_line = self.describe(&args);
        debug!(command = %command_line, "Running container CLI");

        let mut command = Command::new(&self.program);
        command
            .args(&args)
            .envs(env.iter().map(|(k, v)| (*k, v.as_str())))
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|source| WorkerError::Spawn {
            command: command_line.clone(),
            source,
        })?;

        if let (Some(data), Some(mut pipe)) = (stdin, child.stdin.take()) {
            pipe.write_all(&data)
                .await
                .map_err(|source| WorkerError::Spawn {
                    command: command_line.clone(),
                    source,
                })?;
            // Closing stdin lets the child see EOF
            drop(pipe);
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|source| WorkerError::Spawn {
                command: command_line,
                source,
            })?;

        Ok(CommandOutput {
            status: output.status,
            stdout: Bytes::from(output.stdout),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }

    /// Run and require a successful exit
    pub async fn run<I, S>(
        &self,
        args: I,
        env: &[(&str, String)],
        stdin: Option<Bytes>,
    ) -> Result<CommandOutput, WorkerError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let args: Vec<_> = args
            .into_iter()
            .map(|a| a.as_ref().to_os_string())
            .collect();
        let output = self.output(&args, env, stdin).await?;

        if output.success() {
            Ok(output)
        } else {
            Err(WorkerError::CommandFailed {
                command: self.describe(&args),
                status: output.status.to_string(),
                stderr: output.stderr,
            })
        }
    }

    fn describe(&self, args: &[std::ffi::OsString]) -> String {
        let mut line = self.program.clone();
        for arg in args {
            line.push(' ');
            line.push_str(&arg.to_string_lossy());
        }
        line
    }
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_captures_stdout() {
        let cli = DockerCli::with_program("sh");
        let output = cli.run(["-c", "printf hello"], &[], None).await.unwrap();
        assert_eq!(output.stdout_lossy(), "hello");
    }

    #[tokio::test]
    async fn test_run_passes_env_and_stdin() {
        let cli = DockerCli::with_program("sh");
        let output = cli
            .run(
                ["-c", "printf \"$PIPELINE_NAMESPACE:\"; cat"],
                &[("PIPELINE_NAMESPACE", "jobs/a".to_string())],
                Some(Bytes::from_static(b"payload")),
            )
            .await
            .unwrap();
        assert_eq!(output.stdout_lossy(), "jobs/a:payload");
    }

    #[tokio::test]
    async fn test_run_reports_failure() {
        let cli = DockerCli::with_program("sh");
        let err = cli
            .run(["-c", "echo boom >&2; exit 4"], &[], None)
            .await
            .unwrap_err();
        match err {
            WorkerError::CommandFailed { stderr, .. } => assert_eq!(stderr, "boom"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_output_keeps_non_zero_status() {
        let cli = DockerCli::with_program("sh");
        let output = cli.output(["-c", "exit 3"], &[], None).await.unwrap();
        assert_eq!(output.status.code(), Some(3));
    }

    #[tokio::test]
    async fn test_missing_binary() {
        let cli = DockerCli::with_program("definitely-not-a-container-cli");
        let err = cli.run(["ps"], &[], None).await.unwrap_err();
        assert!(matches!(err, WorkerError::Spawn { .. }));
    }
}
