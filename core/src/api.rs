//! Stable re-exports for consumers (`cli`, `plugins`, and external crates).
//!
//! Prefer importing from `stackline_core::api` instead of reaching into internal modules.

pub use crate::config::{
    load_default, AppConfig, ExecutionConfig, LoggingConfig, RunnerConfig,
};
pub use crate::error::{CliError, ConfigError, ErrorCode, PlanError, RunnerError};
pub use crate::executor::{
    build_plan, remediation_targets, scan_resource_ids, Direction, ExecutionEngine,
    ExecutionEngineBuilder, ExecutionOpts, ExecutionPlan, ExecutionResult, OperationSummary,
    OutputRenderer, ProgressMode, ProgressSink, RenderEvent, SinkOutput, StackEnv, StackGraph,
    StackHandle, StackRunner, StackTarget, UnitContext, UnitFailure, VertexId,
};
pub use crate::preview::{preview, render_preview};
pub use crate::project::{
    load_projects, parse_projects, Project, ProjectSet, ProjectSource, StackDefinition,
};
pub use crate::validation::validate_dependencies;
