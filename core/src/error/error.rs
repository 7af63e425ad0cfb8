use std::path::PathBuf;

use thiserror::Error;

use super::plan::PlanError;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("invalid plan: {0}")]
    Plan(#[from] PlanError),
    #[error("project source error: {0}")]
    Source(String),
    #[error("{failed} stack operation(s) failed")]
    StacksFailed { failed: usize },
    #[error("interrupted")]
    Interrupted,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Errors raised while reading the project file or the application config.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to open {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },
    #[error("invalid project entry: {0}")]
    Invalid(String),
    #[error("cannot determine home directory")]
    NoHome,
}
