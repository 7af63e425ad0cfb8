use super::traits::{OutputRenderer, RenderEvent};
use std::sync::Arc;

/// Send a run event to the renderer, or to the log when none is installed.
pub(crate) fn emit(renderer: Option<&Arc<dyn OutputRenderer>>, event: RenderEvent) {
    match renderer {
        Some(renderer) => renderer.render(&event),
        None => log_event(&event),
    }
}

fn log_event(event: &RenderEvent) {
    match event {
        RenderEvent::RunStart {
            run_id,
            direction,
            total_vertices,
            total_stages,
        } => {
            tracing::info!(
                run_id = %run_id,
                operation = direction.operation(),
                stacks = total_vertices,
                stages = total_stages,
                "run started"
            );
        }
        RenderEvent::Plan {
            run_id, stages, ..
        } => {
            for (i, stage) in stages.iter().enumerate() {
                tracing::info!(run_id = %run_id, "stage {}: {}", i + 1, stage.join(", "));
            }
        }
        RenderEvent::StageStart {
            stage,
            total_stages,
            vertices,
            ..
        } => {
            tracing::info!("stage {}/{} ({} stacks)", stage, total_stages, vertices.len());
        }
        RenderEvent::UnitStart { vertex, .. } => {
            tracing::debug!(vertex = %vertex, "unit started");
        }
        RenderEvent::UnitComplete {
            vertex,
            duration_ms,
            error,
            ..
        } => match error {
            Some(error) => tracing::debug!(vertex = %vertex, duration_ms, error = %error, "unit failed"),
            None => tracing::debug!(vertex = %vertex, duration_ms, "unit succeeded"),
        },
        RenderEvent::StageEnd { stage, failed, .. } => {
            if *failed > 0 {
                tracing::warn!("stage {} finished with {} failed", stage, failed);
            } else {
                tracing::info!("stage {} finished", stage);
            }
        }
        RenderEvent::RunEnd { run_id, result } => {
            tracing::info!(
                run_id = %run_id,
                completed = result.completed.len(),
                failed = result.failures.len(),
                skipped = result.skipped.len(),
                duration_ms = result.duration_ms,
                "run finished"
            );
        }
    }
}
