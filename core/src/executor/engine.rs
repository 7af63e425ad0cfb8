use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::error::{PlanError, RunnerError};
use crate::project::{Project, ProjectSet};

use super::context::UnitContext;
use super::env::EnvScope;
use super::output::emit;
use super::plan::{build_plan, ExecutionPlan};
use super::progress::ProgressMonitor;
use super::report::remediation_targets;
use super::scheduler::execute_stage_parallel;
use super::traits::{
    OutputRenderer, ProgressSink, RenderEvent, SinkOutput, StackRunner, StackTarget,
};
use super::types::{
    Direction, ExecutionOpts, ExecutionResult, OperationSummary, ProgressMode, UnitFailure,
    VertexId,
};

/// Drives a plan stage by stage against a [`StackRunner`].
///
/// Stages run strictly one after another; every vertex of a stage runs as its
/// own task. A failed unit never stops its siblings. Whether later stages run
/// after a failure is decided by [`ExecutionOpts::stop_on_failure`].
pub struct ExecutionEngine {
    runner: Arc<dyn StackRunner>,
    opts: ExecutionOpts,
    renderer: Option<Arc<dyn OutputRenderer>>,
    sink_output: SinkOutput,
    cancel: CancellationToken,
}

pub struct ExecutionEngineBuilder {
    runner: Arc<dyn StackRunner>,
    opts: ExecutionOpts,
    renderer: Option<Arc<dyn OutputRenderer>>,
    sink_output: SinkOutput,
    cancel: CancellationToken,
}

impl ExecutionEngineBuilder {
    pub fn new(runner: Arc<dyn StackRunner>) -> Self {
        Self {
            runner,
            opts: ExecutionOpts::default(),
            renderer: None,
            sink_output: SinkOutput::default(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn opts(mut self, opts: ExecutionOpts) -> Self {
        self.opts = opts;
        self
    }

    pub fn renderer(mut self, renderer: Arc<dyn OutputRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Where runner progress goes. Defaults to stdout.
    pub fn sink_output(mut self, output: SinkOutput) -> Self {
        self.sink_output = output;
        self
    }

    /// Share a token with the caller so the run can be cancelled from outside.
    pub fn cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn build(self) -> ExecutionEngine {
        ExecutionEngine {
            runner: self.runner,
            opts: self.opts,
            renderer: self.renderer,
            sink_output: self.sink_output,
            cancel: self.cancel,
        }
    }
}

impl ExecutionEngine {
    pub fn new(runner: Arc<dyn StackRunner>, opts: ExecutionOpts) -> Self {
        ExecutionEngineBuilder::new(runner).opts(opts).build()
    }

    pub fn builder(runner: Arc<dyn StackRunner>) -> ExecutionEngineBuilder {
        ExecutionEngineBuilder::new(runner)
    }

    pub fn opts(&self) -> &ExecutionOpts {
        &self.opts
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Build the plan for `projects` and run it.
    ///
    /// Plan errors are returned before any runner call is made. Unit failures
    /// never surface as `Err`; they are collected in the result.
    pub async fn execute(
        &self,
        projects: &[Project],
        direction: Direction,
    ) -> Result<ExecutionResult, PlanError> {
        let (set, plan) = build_plan(projects)?;
        Ok(self.run_plan(Arc::new(set), &plan, direction).await)
    }

    /// Run a prepared plan. `apply` walks the stages forward, `teardown`
    /// walks them backward.
    pub async fn run_plan(
        &self,
        projects: Arc<ProjectSet>,
        plan: &ExecutionPlan,
        direction: Direction,
    ) -> ExecutionResult {
        let start = Instant::now();
        let run_id: Arc<str> = Arc::from(Uuid::new_v4().to_string());
        let stages: Vec<Vec<VertexId>> = plan
            .stages(direction)
            .into_iter()
            .map(<[VertexId]>::to_vec)
            .collect();
        let total = plan.total_vertices();
        let total_stages = stages.len();

        emit(
            self.renderer.as_ref(),
            RenderEvent::RunStart {
                run_id: run_id.to_string(),
                direction,
                total_vertices: total,
                total_stages,
            },
        );
        emit(
            self.renderer.as_ref(),
            RenderEvent::Plan {
                run_id: run_id.to_string(),
                direction,
                stages: stages
                    .iter()
                    .map(|stage| stage.iter().map(ToString::to_string).collect())
                    .collect(),
            },
        );

        let bars = self.opts.progress_bar && self.opts.progress_mode == ProgressMode::Plain;
        let shared = Arc::new(UnitShared {
            runner: self.runner.clone(),
            projects,
            opts: self.opts.clone(),
            renderer: self.renderer.clone(),
            sink_output: self.sink_output.clone(),
            cancel: self.cancel.clone(),
            progress: Mutex::new(ProgressMonitor::new(total, direction, bars)),
            completed: Mutex::new(BTreeSet::new()),
            failures: Mutex::new(Vec::new()),
            run_id: run_id.clone(),
            direction,
        });

        let mut skipped = Vec::new();
        let mut stages_run = 0;
        let mut halted = false;

        for (index, vertices) in stages.iter().enumerate() {
            let stage = index + 1;

            if !halted && self.cancel.is_cancelled() {
                tracing::warn!(run_id = %run_id, stage, "run cancelled, skipping remaining stages");
                halted = true;
            }
            if halted {
                skipped.extend(vertices.iter().cloned());
                continue;
            }

            stages_run += 1;
            emit(
                self.renderer.as_ref(),
                RenderEvent::StageStart {
                    run_id: run_id.to_string(),
                    stage,
                    total_stages,
                    vertices: vertices.iter().map(ToString::to_string).collect(),
                },
            );
            lock(&shared.progress).update_stage(stage, total_stages);

            let failed_before = lock(&shared.failures).len();
            let outcomes = execute_stage_parallel(vertices, |vertex| {
                run_unit(shared.clone(), stage, vertex)
            })
            .await;

            // Units record their own outcome; a panic is the one case that
            // reaches here unrecorded.
            for (vertex, outcome) in outcomes {
                if let Err(error @ RunnerError::Panicked(_)) = outcome {
                    let unit = UnitContext::new(run_id.clone(), direction, stage, vertex);
                    tracing::error!(vertex = %unit.vertex, error = %error, "unit panicked");
                    shared.record(&unit, 0, Err(error));
                }
            }

            let failed = lock(&shared.failures).len() - failed_before;
            emit(
                self.renderer.as_ref(),
                RenderEvent::StageEnd {
                    run_id: run_id.to_string(),
                    stage,
                    failed,
                },
            );

            if failed > 0 && self.opts.stop_on_failure {
                tracing::warn!(
                    run_id = %run_id,
                    stage,
                    failed,
                    "stopping after failed stage"
                );
                halted = true;
            }
        }

        let completed: Vec<VertexId> = lock(&shared.completed).iter().cloned().collect();
        let mut failures = std::mem::take(&mut *lock(&shared.failures));
        failures.sort_by(|a, b| (a.stage, &a.vertex).cmp(&(b.stage, &b.vertex)));

        let remediation = match direction {
            Direction::Teardown => remediation_targets(&failures),
            Direction::Apply => Vec::new(),
        };

        let result = ExecutionResult {
            run_id: run_id.to_string(),
            direction,
            total,
            completed,
            failures,
            skipped,
            stages_run,
            duration_ms: start.elapsed().as_millis() as u64,
            remediation,
        };

        lock(&shared.progress).finish(result.is_success());
        emit(
            self.renderer.as_ref(),
            RenderEvent::RunEnd {
                run_id: run_id.to_string(),
                result: result.clone(),
            },
        );

        result
    }
}

/// State every unit of a run reads or updates.
struct UnitShared {
    runner: Arc<dyn StackRunner>,
    projects: Arc<ProjectSet>,
    opts: ExecutionOpts,
    renderer: Option<Arc<dyn OutputRenderer>>,
    sink_output: SinkOutput,
    cancel: CancellationToken,
    progress: Mutex<ProgressMonitor>,
    completed: Mutex<BTreeSet<VertexId>>,
    failures: Mutex<Vec<UnitFailure>>,
    run_id: Arc<str>,
    direction: Direction,
}

impl UnitShared {
    async fn operate(&self, unit: &UnitContext) -> Result<OperationSummary, RunnerError> {
        let vertex = &unit.vertex;
        let (project, stack) = self
            .projects
            .stack(&vertex.project, &vertex.stack)
            .ok_or_else(|| RunnerError::Resolve {
                stack: vertex.to_string(),
                message: "no such project or stack in the project set".to_string(),
            })?;

        let target = StackTarget::new(
            self.opts.org(),
            stack.name.clone(),
            project.work_dir(&self.opts.source_root),
        );
        let overrides = stack.effective_env(project.aws_profile.as_deref());

        let handle = self.runner.resolve_or_create(&target).await?;
        let scope = EnvScope::acquire(handle.env(), &overrides);
        tracing::debug!(
            stack = handle.name(),
            work_dir = %handle.work_dir().display(),
            overrides = ?scope.keys().collect::<Vec<_>>(),
            "stack resolved"
        );

        let sink = ProgressSink::new(
            self.opts.progress_mode,
            unit.clone(),
            self.sink_output.clone(),
        );
        let result = match unit.direction {
            Direction::Apply => self.runner.apply(&handle, &sink).await,
            Direction::Teardown => self.runner.teardown(&handle, &sink).await,
        };

        drop(scope);
        result
    }

    fn record(
        &self,
        unit: &UnitContext,
        duration_ms: u64,
        outcome: Result<OperationSummary, RunnerError>,
    ) {
        emit(
            self.renderer.as_ref(),
            RenderEvent::UnitComplete {
                run_id: self.run_id.to_string(),
                stage: unit.stage,
                vertex: unit.vertex.clone(),
                duration_ms,
                error: outcome.as_ref().err().map(ToString::to_string),
            },
        );
        lock(&self.progress).complete_unit(&unit.vertex, outcome.is_ok(), duration_ms);

        match outcome {
            Ok(summary) => {
                tracing::info!(duration_ms, changes = ?summary.changes, "{} succeeded", unit.direction.operation());
                lock(&self.completed).insert(unit.vertex.clone());
            }
            Err(error) => {
                match &error {
                    RunnerError::Cancelled => tracing::warn!("unit cancelled"),
                    e if e.is_fatal() => {
                        tracing::error!(error = %e, "runner unusable, cancelling run");
                        self.cancel.cancel();
                    }
                    e => tracing::error!(error = %e, "{} failed", unit.direction.operation()),
                }
                lock(&self.failures).push(UnitFailure {
                    vertex: unit.vertex.clone(),
                    stage: unit.stage,
                    error,
                });
            }
        }
    }
}

async fn run_unit(
    shared: Arc<UnitShared>,
    stage: usize,
    vertex: VertexId,
) -> Result<(), RunnerError> {
    let unit = UnitContext::new(shared.run_id.clone(), shared.direction, stage, vertex);
    let span = unit.span();

    async move {
        emit(
            shared.renderer.as_ref(),
            RenderEvent::UnitStart {
                run_id: shared.run_id.to_string(),
                stage,
                vertex: unit.vertex.clone(),
            },
        );
        lock(&shared.progress).start_unit(&unit.vertex);

        let started = Instant::now();
        let outcome = tokio::select! {
            biased;
            _ = shared.cancel.cancelled() => Err(RunnerError::Cancelled),
            res = shared.operate(&unit) => res,
        };
        let duration_ms = started.elapsed().as_millis() as u64;

        let status = outcome.as_ref().map(|_| ()).map_err(Clone::clone);
        shared.record(&unit, duration_ms, outcome);
        status
    }
    .instrument(span)
    .await
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
