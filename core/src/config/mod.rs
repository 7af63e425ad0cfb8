mod load;
mod types;

pub use load::{
    apply_env_overrides, get_stackline_data_dir, load_default, load_file, load_first,
    RUNNER_BIN_VAR, STOP_ON_FAILURE_VAR,
};
pub use types::{AppConfig, ExecutionConfig, LoggingConfig, RunnerConfig};
