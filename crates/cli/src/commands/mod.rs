//! Command implementations.

mod info;
mod run;
mod validate;

pub use info::run_info;
pub use run::run_pipeline;
pub use validate::run_validate;

use std::path::Path;

use anyhow::{Context, Result};
use contracts::PipelineConfig;
use tracing::info;

use crate::error::CliError;

/// Load the configuration at `path`, or the built-in defaults when `None`
pub(crate) fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    let Some(path) = path else {
        info!("No configuration file given, using built-in defaults");
        return Ok(PipelineConfig::default());
    };

    info!(config = %path.display(), "Loading configuration");
    if !path.exists() {
        return Err(CliError::ConfigNotFound {
            path: path.to_path_buf(),
        }
        .into());
    }

    config_loader::ConfigLoader::load_from_path(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_config() {
        assert!(load_config(None).is_ok());

        let err = load_config(Some(Path::new("/definitely/missing.toml"))).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CliError>(),
            Some(CliError::ConfigNotFound { .. })
        ));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.toml");
        std::fs::write(&path, "[job]\nretry_budget = 3\n").unwrap();
        assert_eq!(load_config(Some(&path)).unwrap().job.retry_budget, 3);
    }
}
