//! ContainerStore - shared store living inside a running container
//!
//! Used when the shared volume is not reachable from the host (e.g. a named
//! volume on a remote daemon). Every operation is a `docker exec` with a
//! small POSIX shell script, the key passed as a positional argument.

use bytes::Bytes;
use contracts::{SharedStore, StoreError, StoreKey, WorkerError};
use tracing::{debug, instrument};

use crate::docker::DockerCli;

/// Write to a sibling temp file, then rename into place
const PUT_SCRIPT: &str =
    r#"mkdir -p "$(dirname "$1")" && cat > "$1.tmp.$$" && mv -f "$1.tmp.$$" "$1""#;
/// Exit code 3 means "absent"
const GET_SCRIPT: &str = r#"if [ -f "$1" ]; then cat "$1"; else exit 3; fi"#;
const EXISTS_SCRIPT: &str = r#"test -f "$1""#;

const ABSENT_STATUS: i32 = 3;

/// Store accessed through `docker exec` into `container`
#[derive(Debug, Clone)]
pub struct ContainerStore {
    name: String,
    docker: DockerCli,
    container: String,
    mount: String,
}

impl ContainerStore {
    pub fn new(container: impl Into<String>, mount: impl Into<String>) -> Self {
        Self::with_cli(DockerCli::new(), container, mount)
    }

    pub fn with_cli(
        docker: DockerCli,
        container: impl Into<String>,
        mount: impl Into<String>,
    ) -> Self {
        let container = container.into();
        let mount = mount.into().trim_end_matches('/').to_string();
        Self {
            name: format!("container:{container}:{mount}"),
            docker,
            container,
            mount,
        }
    }

    /// Path of `key` inside the container
    pub fn path_for(&self, key: &StoreKey) -> String {
        format!("{}/{}", self.mount, key)
    }

    fn exec_args(&self, interactive: bool, script: &str, key: &StoreKey) -> Vec<String> {
        let mut args = vec!["exec".to_string()];
        if interactive {
            args.push("-i".to_string());
        }
        args.extend([
            self.container.clone(),
            "sh".to_string(),
            "-c".to_string(),
            script.to_string(),
            "sh".to_string(),
            self.path_for(key),
        ]);
        args
    }
}

fn unavailable(err: WorkerError) -> StoreError {
    StoreError::Unavailable {
        message: err.to_string(),
    }
}

impl SharedStore for ContainerStore {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "container_store_put",
        skip(self, data),
        fields(store = %self.name, key = %key, bytes = data.len())
    )]
    async fn put(&self, key: &StoreKey, data: Bytes) -> Result<(), StoreError> {
        let output = self
            .docker
            .output(self.exec_args(true, PUT_SCRIPT, key), &[], Some(data))
            .await
            .map_err(unavailable)?;

        if !output.success() {
            return Err(StoreError::write_rejected(key.as_str(), output.stderr));
        }
        debug!("Value written");
        Ok(())
    }

    #[instrument(name = "container_store_get", skip(self), fields(store = %self.name, key = %key))]
    async fn get(&self, key: &StoreKey) -> Result<Option<Bytes>, StoreError> {
        let output = self
            .docker
            .output(self.exec_args(false, GET_SCRIPT, key), &[], None)
            .await
            .map_err(unavailable)?;

        match output.status.code() {
            Some(0) => Ok(Some(output.stdout)),
            Some(ABSENT_STATUS) => Ok(None),
            _ => Err(StoreError::Unavailable {
                message: format!("reading '{key}' exited with {}: {}", output.status, output.stderr),
            }),
        }
    }

    async fn exists(&self, key: &StoreKey) -> bool {
        match self
            .docker
            .output(self.exec_args(false, EXISTS_SCRIPT, key), &[], None)
            .await
        {
            Ok(output) => output.success(),
            Err(e) => {
                debug!(store = %self.name, key = %key, error = %e, "Probe failed");
                false
            }
        }
    }
}
