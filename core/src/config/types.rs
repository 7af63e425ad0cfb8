use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub execution: ExecutionConfig,

    #[serde(default)]
    pub runner: RunnerConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_enabled")]
    pub enabled: bool,

    /// If true, log to stderr.
    #[serde(default = "default_logging_console")]
    pub console: bool,

    /// If true, log to a file under `directory` (or OS temp dir if unset).
    #[serde(default = "default_logging_file")]
    pub file: bool,

    /// EnvFilter string, e.g. "info" or "stackline_core=debug".
    #[serde(default = "default_logging_level")]
    pub level: String,

    #[serde(default)]
    pub directory: Option<String>,
}

fn default_logging_enabled() -> bool {
    true
}

fn default_logging_console() -> bool {
    true
}

fn default_logging_file() -> bool {
    false
}

fn default_logging_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_logging_enabled(),
            console: default_logging_console(),
            file: default_logging_file(),
            level: default_logging_level(),
            directory: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Stop after the first stage with a failed stack.
    #[serde(default)]
    pub stop_on_failure: bool,

    /// Draw progress bars in text mode.
    #[serde(default)]
    pub progress_bar: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Infrastructure CLI to invoke.
    #[serde(default = "default_runner_binary")]
    pub binary: String,

    /// Appended to every `up`/`destroy` invocation.
    #[serde(default)]
    pub extra_args: Vec<String>,
}

fn default_runner_binary() -> String {
    "pulumi".to_string()
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            binary: default_runner_binary(),
            extra_args: Vec::new(),
        }
    }
}
