#[allow(clippy::module_inception)]
pub mod error;
pub mod plan;
pub mod runner;

pub use error::{CliError, ConfigError};
pub use plan::{ErrorCode, PlanError};
pub use runner::RunnerError;
