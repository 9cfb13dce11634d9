use figment::{
    providers::{Env, Format, Serialized, Toml},
    value::{Uncased, UncasedStr},
    Figment,
};
use std::path::{Path, PathBuf};

use super::{types::Configuration, validate::validate_config, ConfigError};

/// Base name of the configuration file looked up in the search paths.
pub const CONFIG_NAME: &str = "preprocessing";

/// Prefix for environment variable overrides.
pub const ENV_PREFIX: &str = "PREPROCESSING_";

/// Canonical key paths, used to restore camelCase after env var lookup.
const KEYS: &[&str] = &[
    "debug",
    "verbosity",
    "sharedPath",
    "temporal.address",
    "temporal.namespace",
    "temporal.taskQueue",
    "temporal.workflowName",
    "worker.maxConcurrentSessions",
    "worker.historyPath",
    "bagit.checksumAlgorithm",
];

/// A validated configuration and the file it was read from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: Configuration,
    pub path: PathBuf,
}

/// Directories searched when no explicit file is given, in priority order.
pub fn search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(".")];
    if let Some(home) = std::env::var_os("HOME") {
        paths.push(PathBuf::from(home).join(".config"));
    }
    paths.push(PathBuf::from("/etc"));
    paths
}

/// Read, merge and validate the configuration.
///
/// An explicit `config_file` must exist. Otherwise the first
/// `preprocessing.toml` found in [`search_paths`] is used. Values are layered
/// as defaults, then file, then `PREPROCESSING_*` environment variables.
pub fn read_config(config_file: Option<&Path>) -> Result<LoadedConfig, ConfigError> {
    let path = match config_file {
        Some(path) => {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path.display().to_string()));
            }
            path.to_path_buf()
        }
        None => find_config_file(&search_paths())?,
    };

    let config = load_config(&path)?;
    validate_config(&config)?;

    tracing::debug!(path = %path.display(), "configuration loaded");
    Ok(LoadedConfig { config, path })
}

/// Load configuration from a file with environment overrides, without
/// validating it.
pub fn load_config(path: &Path) -> Result<Configuration, ConfigError> {
    Figment::from(Serialized::defaults(Configuration::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Configuration, ConfigError> {
    Figment::from(Serialized::defaults(Configuration::default()))
        .merge(Toml::string(toml_str))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}

fn find_config_file(dirs: &[PathBuf]) -> Result<PathBuf, ConfigError> {
    let file_name = format!("{}.toml", CONFIG_NAME);
    dirs.iter()
        .map(|dir| dir.join(&file_name))
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| ConfigError::NotFound {
            name: CONFIG_NAME.to_string(),
            paths: dirs.to_vec(),
        })
}

/// `PREPROCESSING_TEMPORAL_TASKQUEUE` -> `temporal.taskQueue`.
fn env_provider() -> Env {
    Env::prefixed(ENV_PREFIX).lowercase(false).map(env_key)
}

fn env_key(key: &UncasedStr) -> Uncased<'_> {
    let dotted = key.as_str().to_ascii_lowercase().replace('_', ".");
    let canonical = KEYS
        .iter()
        .find(|k| k.to_ascii_lowercase() == dotted)
        .map(|k| k.to_string())
        .unwrap_or(dotted);
    Uncased::from(canonical)
}
