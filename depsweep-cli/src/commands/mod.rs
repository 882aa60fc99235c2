//! Command handlers -- one module per subcommand

pub mod collect;
pub mod collectors;
pub mod config;

use std::path::{Path, PathBuf};

use depsweep_core::config::DepsweepConfig;
use depsweep_core::error::{ConfigError, DepsweepError};

use crate::error::CliError;

/// Effective configuration and where it came from.
#[derive(Debug)]
pub struct LoadedConfig {
    pub config: DepsweepConfig,
    /// `None` when the file was missing and defaults were used.
    pub source: Option<PathBuf>,
}

/// Load the configuration file, falling back to defaults when it does not exist.
///
/// Environment overrides apply in both cases. Parse and validation errors are
/// returned as-is.
pub async fn load_config(path: &Path) -> Result<LoadedConfig, CliError> {
    match DepsweepConfig::load(path).await {
        Ok(config) => Ok(LoadedConfig {
            config,
            source: Some(path.to_path_buf()),
        }),
        Err(DepsweepError::Config(ConfigError::FileNotFound { .. })) => {
            let mut config = DepsweepConfig::default();
            config.apply_env_overrides();
            config.validate()?;
            Ok(LoadedConfig {
                config,
                source: None,
            })
        }
        Err(e) => Err(e.into()),
    }
}
