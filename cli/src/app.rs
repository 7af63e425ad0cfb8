use std::sync::Arc;

use stackline_core::config::AppConfig;
use stackline_core::error::{CliError, ErrorCode, RunnerError};
use stackline_core::executor::types::{
    Direction, ExecutionOpts, ExecutionResult, ProgressMode,
};
use stackline_core::executor::{build_plan, ExecutionEngine};
use stackline_core::preview::render_preview;
use stackline_core::project::{load_projects, ProjectSource};
use stackline_plugins::factory::{build_renderer, build_runner};
use stackline_plugins::source::materialize;
use tokio_util::sync::CancellationToken;

use crate::commands::cli::{CommonArgs, Commands};
use crate::error_file::append_failures;

/// Run `deploy` or `destroy` and return the process exit code.
///
/// `interrupt` is cancelled on Ctrl-C. The engine gets a child token, so a
/// fatal runner error stops the run without looking like an interrupt.
pub async fn run(
    cmd: Commands,
    cfg: AppConfig,
    interrupt: CancellationToken,
) -> Result<i32, CliError> {
    let direction = cmd.direction();
    let common = cmd.common();

    let projects = load_projects(&common.config)?;
    let (set, plan) = build_plan(&projects)?;
    if common.preview {
        print!("{}", render_preview(&plan, direction));
        return Ok(ErrorCode::Success.as_i32());
    }

    let source = ProjectSource::from_flags(
        common.path.as_deref(),
        common.git_url.as_deref(),
        &common.git_branch,
    );
    let root = materialize(&source)
        .await
        .map_err(|e| CliError::Source(format!("{e:#}")))?;

    let opts = execution_opts(common, &cfg, root.path());
    let strict = opts.stop_on_failure;
    tracing::info!(
        operation = direction.operation(),
        projects = set.len(),
        stacks = plan.total_vertices(),
        stages = plan.len(),
        root = %root.path().display(),
        strict,
        "starting"
    );

    let engine = ExecutionEngine::builder(build_runner(&cfg))
        .opts(opts.clone())
        .renderer(build_renderer(opts.progress_mode))
        .cancellation_token(interrupt.child_token())
        .build();
    let result = engine.run_plan(Arc::new(set), &plan, direction).await;

    if let Some(path) = cmd.error_file() {
        append_failures(path, &result.failures);
    }

    outcome(&result, strict, interrupt.is_cancelled())
}

fn execution_opts(common: &CommonArgs, cfg: &AppConfig, root: &std::path::Path) -> ExecutionOpts {
    let progress_mode = ProgressMode::from_json_flag(common.json);
    ExecutionOpts {
        org: common.org.clone(),
        source_root: root.to_path_buf(),
        progress_mode,
        stop_on_failure: common.stop_on_failure || cfg.execution.stop_on_failure,
        progress_bar: cfg.execution.progress_bar && atty::is(atty::Stream::Stdout),
    }
}

/// Map a finished run to an exit code.
///
/// Unit failures only fail the process in strict mode, or when the runner
/// itself could not be started.
pub fn outcome(result: &ExecutionResult, strict: bool, interrupted: bool) -> Result<i32, CliError> {
    if interrupted {
        return Err(CliError::Interrupted);
    }
    let fatal = result
        .failures
        .iter()
        .any(|f| matches!(f.error, RunnerError::Spawn(_)));
    if !result.failures.is_empty() && (strict || fatal) {
        return Err(CliError::StacksFailed {
            failed: result.failures.len(),
        });
    }
    if !result.failures.is_empty() {
        tracing::warn!(
            failed = result.failures.len(),
            operation = result.direction.operation(),
            "finished with failures"
        );
    } else if result.direction == Direction::Teardown {
        tracing::info!("all stacks destroyed");
    }
    Ok(ErrorCode::Success.as_i32())
}

pub fn exit_code_for_error(e: &CliError) -> i32 {
    let code = match e {
        CliError::Config(_) => ErrorCode::ConfigError,
        CliError::Plan(p) => p.error_code(),
        CliError::Source(_) | CliError::Io(_) => ErrorCode::IoError,
        CliError::StacksFailed { .. } => ErrorCode::StackFailure,
        CliError::Interrupted => ErrorCode::Interrupted,
        CliError::Anyhow(_) => ErrorCode::Internal,
    };
    code.as_i32()
}
