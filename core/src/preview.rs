use std::fmt::Write;

use crate::error::PlanError;
use crate::executor::{build_plan, Direction, ExecutionPlan};
use crate::project::Project;

/// Build the plan for `projects` and render it without executing anything.
pub fn preview(projects: &[Project], direction: Direction) -> Result<String, PlanError> {
    let (_, plan) = build_plan(projects)?;
    Ok(render_preview(&plan, direction))
}

/// Render stages in the order `direction` would run them.
pub fn render_preview(plan: &ExecutionPlan, direction: Direction) -> String {
    let mut out = String::with_capacity(plan.total_vertices() * 24 + 32);
    let _ = writeln!(out, "\n{} Plan:", direction.title());
    for (i, stage) in plan.stages(direction).iter().enumerate() {
        let _ = writeln!(out, "Stage {}:", i + 1);
        for vertex in stage.iter() {
            let _ = writeln!(out, "  {vertex}");
        }
        out.push('\n');
    }
    out
}
