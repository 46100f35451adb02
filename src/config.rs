use std::path::{Path, PathBuf};

use crate::{error::ConfigError, media::supervisor::RetryPolicy};

/// Directory holding the configuration store and chain descriptions.
pub const CONFIG_PATH_ENV: &str = "CAM_CONFIG_PATH";
/// Must be non-empty before a simulated chain may be loaded.
pub const PLUGIN_PATH_ENV: &str = "CAMUNITS_PLUGIN_PATH";
pub const DEFAULT_PARAM_FILE: &str = "camera.json";

pub struct AppConfig {
    config_dir: PathBuf,
    param_file: PathBuf,
    retry: RetryPolicy,
}

impl AppConfig {
    /// Resolve paths from the command line first, then the environment.
    /// Without `--param` the store is `<config dir>/camera.json`; with only
    /// `--param` the config dir is the store's directory.
    pub fn resolve(
        config_dir: Option<&Path>,
        param_file: Option<&Path>,
        env_dir: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let env_dir = env_dir.filter(|d| !d.is_empty()).map(PathBuf::from);
        let config_dir = match (config_dir, env_dir, param_file) {
            (Some(dir), _, _) => dir.to_path_buf(),
            (None, Some(dir), _) => dir,
            (None, None, Some(file)) => file
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(".")),
            (None, None, None) => return Err(ConfigError::NoConfigPath(CONFIG_PATH_ENV)),
        };
        let param_file = param_file
            .map(Path::to_path_buf)
            .unwrap_or_else(|| config_dir.join(DEFAULT_PARAM_FILE));

        Ok(Self {
            config_dir,
            param_file,
            retry: RetryPolicy::default(),
        })
    }

    pub fn from_env(
        config_dir: Option<&Path>,
        param_file: Option<&Path>,
    ) -> Result<Self, ConfigError> {
        let env_dir = std::env::var(CONFIG_PATH_ENV).ok();
        Self::resolve(config_dir, param_file, env_dir.as_deref())
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn param_file(&self) -> &Path {
        &self.param_file
    }

    pub fn retry(&self) -> RetryPolicy {
        self.retry
    }
}

pub fn plugin_path_set(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.is_empty())
}
