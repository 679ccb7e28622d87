use std::fs;
use std::path::{Path, PathBuf};

use crate::model::config::AppConfig;

/// Config file looked up in the working directory when no path is given
pub const CONFIG_FILE_NAME: &str = "task-hero.toml";

/// Environment variable overriding `api.base_url`
pub const BASE_URL_ENV: &str = "TASK_HERO_API_BASE_URL";

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse config: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Load configuration.
///
/// An explicit `path` must exist. Without one, `task-hero.toml` in the
/// working directory is used if present, else defaults. Environment
/// overrides are applied last.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let config = match path {
        Some(path) => read_config(path)?,
        None => {
            let default_path = Path::new(CONFIG_FILE_NAME);
            if default_path.exists() {
                read_config(default_path)?
            } else {
                AppConfig::default()
            }
        }
    };
    Ok(apply_env_overrides(config, |key| std::env::var(key).ok()))
}

/// Read and parse a config file.
pub fn read_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let text = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(toml::from_str(&text)?)
}

/// Apply environment overrides using `lookup` to read variables.
pub fn apply_env_overrides(
    mut config: AppConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> AppConfig {
    if let Some(url) = lookup(BASE_URL_ENV).filter(|v| !v.trim().is_empty()) {
        config.api.base_url = url;
    }
    config
}
