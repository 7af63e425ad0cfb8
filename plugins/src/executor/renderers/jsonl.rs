use chrono::Local;
use serde_json::{json, Value};
use stackline_core::executor::traits::{OutputRenderer, RenderEvent};

pub struct JsonlRenderer {
    pretty_print: bool,
}

impl JsonlRenderer {
    pub fn new(pretty_print: bool) -> Self {
        Self { pretty_print }
    }

    fn event_to_json(&self, event: &RenderEvent) -> Value {
        let ts = Local::now().to_rfc3339();
        match event {
            RenderEvent::RunStart {
                run_id,
                direction,
                total_vertices,
                total_stages,
            } => json!({
                "v": 1,
                "event_type": "run.start",
                "ts": ts,
                "run_id": run_id,
                "operation": direction.operation(),
                "metadata": {
                    "total_stacks": total_vertices,
                    "total_stages": total_stages,
                }
            }),
            RenderEvent::Plan {
                run_id,
                direction,
                stages,
            } => {
                let total_stacks: usize = stages.iter().map(|s| s.len()).sum();
                json!({
                    "v": 1,
                    "event_type": "run.plan",
                    "ts": ts,
                    "run_id": run_id,
                    "operation": direction.operation(),
                    "metadata": {
                        "stages": stages,
                        "total_stacks": total_stacks,
                    }
                })
            }
            RenderEvent::StageStart {
                run_id,
                stage,
                total_stages,
                vertices,
            } => json!({
                "v": 1,
                "event_type": "stage.start",
                "ts": ts,
                "run_id": run_id,
                "stage": stage,
                "metadata": {
                    "total_stages": total_stages,
                    "stacks": vertices,
                }
            }),
            RenderEvent::UnitStart {
                run_id,
                stage,
                vertex,
            } => json!({
                "v": 1,
                "event_type": "stack.start",
                "ts": ts,
                "run_id": run_id,
                "stage": stage,
                "project": vertex.project,
                "stack": vertex.stack,
            }),
            RenderEvent::UnitComplete {
                run_id,
                stage,
                vertex,
                duration_ms,
                error,
            } => json!({
                "v": 1,
                "event_type": "stack.end",
                "ts": ts,
                "run_id": run_id,
                "stage": stage,
                "project": vertex.project,
                "stack": vertex.stack,
                "error": error,
                "metadata": {
                    "duration_ms": duration_ms,
                    "success": error.is_none(),
                }
            }),
            RenderEvent::StageEnd {
                run_id,
                stage,
                failed,
            } => json!({
                "v": 1,
                "event_type": "stage.end",
                "ts": ts,
                "run_id": run_id,
                "stage": stage,
                "metadata": {
                    "failed": failed,
                }
            }),
            RenderEvent::RunEnd { run_id, result } => json!({
                "v": 1,
                "event_type": "run.end",
                "ts": ts,
                "run_id": run_id,
                "operation": result.direction.operation(),
                "metadata": {
                    "total_stacks": result.total,
                    "completed": result.completed,
                    "failures": result.failures,
                    "skipped": result.skipped,
                    "stages_run": result.stages_run,
                    "duration_ms": result.duration_ms,
                    "remediation": result.remediation,
                    "success": result.is_success(),
                }
            }),
        }
    }
}

impl OutputRenderer for JsonlRenderer {
    fn name(&self) -> &str {
        "jsonl-renderer"
    }

    fn format(&self) -> &str {
        "jsonl"
    }

    fn render(&self, event: &RenderEvent) {
        let value = self.event_to_json(event);
        if self.pretty_print {
            println!("{}", serde_json::to_string_pretty(&value).unwrap_or_else(|_| "{}".into()));
        } else {
            println!("{}", serde_json::to_string(&value).unwrap_or_else(|_| "{}".into()));
        }
    }
}
