use stackline_core::executor::traits::{OutputRenderer, RenderEvent};
use stackline_core::executor::types::ExecutionResult;

pub struct TextRenderer;

impl TextRenderer {
    pub fn new() -> Self {
        Self
    }

    fn format_event(&self, event: &RenderEvent) -> String {
        match event {
            RenderEvent::RunStart {
                run_id,
                direction,
                total_vertices,
                total_stages,
            } => format!(
                "{} START {} (stacks: {}, stages: {})",
                direction.title().to_uppercase(),
                run_id,
                total_vertices,
                total_stages
            ),
            RenderEvent::Plan {
                direction, stages, ..
            } => {
                let mut out = format!("{} plan:", direction.title());
                for (idx, stage) in stages.iter().enumerate() {
                    out.push_str(&format!("\n  stage {}: {}", idx + 1, stage.join(", ")));
                }
                out
            }
            RenderEvent::StageStart {
                stage,
                total_stages,
                vertices,
                ..
            } => format!(
                "STAGE {}/{} ({} stacks)",
                stage,
                total_stages,
                vertices.len()
            ),
            RenderEvent::UnitStart { stage, vertex, .. } => {
                format!("  START {} (stage {})", vertex, stage)
            }
            RenderEvent::UnitComplete {
                vertex,
                duration_ms,
                error,
                ..
            } => match error {
                Some(error) => format!("  FAILED {} ({}ms): {}", vertex, duration_ms, error),
                None => format!("  OK {} ({}ms)", vertex, duration_ms),
            },
            RenderEvent::StageEnd { stage, failed, .. } => {
                if *failed == 0 {
                    format!("STAGE {} done", stage)
                } else {
                    format!("STAGE {} done ({} failed)", stage, failed)
                }
            }
            RenderEvent::RunEnd { run_id, result } => format_summary(run_id, result),
        }
    }
}

impl Default for TextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

fn format_summary(run_id: &str, result: &ExecutionResult) -> String {
    let mut out = format!(
        "{} END {} (completed {}, failed {}, skipped {}, duration {}ms)",
        result.direction.title().to_uppercase(),
        run_id,
        result.completed.len(),
        result.failures.len(),
        result.skipped.len(),
        result.duration_ms
    );

    if !result.failures.is_empty() {
        out.push_str("\nFailed stacks:");
        for failure in &result.failures {
            out.push_str(&format!(
                "\n  {} (stage {}): {}",
                failure.vertex, failure.stage, failure.error
            ));
        }
    }
    if !result.skipped.is_empty() {
        let skipped: Vec<String> = result.skipped.iter().map(ToString::to_string).collect();
        out.push_str(&format!("\nSkipped: {}", skipped.join(", ")));
    }
    if !result.remediation.is_empty() {
        out.push_str("\nResources needing manual cleanup:");
        for urn in &result.remediation {
            out.push_str(&format!("\n  {urn}"));
        }
    }
    out
}

impl OutputRenderer for TextRenderer {
    fn name(&self) -> &str {
        "text-renderer"
    }

    fn format(&self) -> &str {
        "text"
    }

    fn render(&self, event: &RenderEvent) {
        println!("{}", self.format_event(event));
    }
}
