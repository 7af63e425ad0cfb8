use std::path::{Path, PathBuf};

use crate::error::ConfigError;

use super::types::AppConfig;

pub const RUNNER_BIN_VAR: &str = "STACKLINE_RUNNER_BIN";
pub const STOP_ON_FAILURE_VAR: &str = "STACKLINE_STOP_ON_FAILURE";

/// Get the default stackline data directory: ~/.stackline
pub fn get_stackline_data_dir() -> Result<PathBuf, ConfigError> {
    dirs::home_dir()
        .map(|home| home.join(".stackline"))
        .ok_or(ConfigError::NoHome)
}

pub fn load_default() -> Result<AppConfig, ConfigError> {
    let data_dir = get_stackline_data_dir()?;
    let mut cfg = load_first(&[data_dir.join("config.toml"), PathBuf::from("stackline.toml")])?;
    apply_env_overrides(&mut cfg, |key| std::env::var(key).ok());
    Ok(cfg)
}

/// Load the first existing file of `candidates`, or defaults when none exists.
pub fn load_first(candidates: &[PathBuf]) -> Result<AppConfig, ConfigError> {
    match candidates.iter().find(|p| p.exists()) {
        Some(path) => load_file(path),
        None => Ok(AppConfig::default()),
    }
}

pub fn load_file(path: &Path) -> Result<AppConfig, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str::<AppConfig>(&raw).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Environment variable overrides. Blank values are ignored.
pub fn apply_env_overrides<F>(cfg: &mut AppConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(v) = lookup(RUNNER_BIN_VAR) {
        cfg.runner.binary = v.trim().to_string();
    }
    if let Some(v) = lookup(STOP_ON_FAILURE_VAR) {
        match parse_bool(&v) {
            Some(b) => cfg.execution.stop_on_failure = b,
            None => tracing::warn!("ignoring {}={:?}: expected true or false", STOP_ON_FAILURE_VAR, v),
        }
    }
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
