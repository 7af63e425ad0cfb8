use crate::executor::types::{Direction, ExecutionResult, VertexId};

/// Output renderer plugin (controls user-facing run output)
pub trait OutputRenderer: Send + Sync {
    fn name(&self) -> &str;
    fn format(&self) -> &str;
    fn render(&self, event: &RenderEvent);
}

/// Run lifecycle events, in emission order
#[derive(Debug, Clone)]
pub enum RenderEvent {
    RunStart {
        run_id: String,
        direction: Direction,
        total_vertices: usize,
        total_stages: usize,
    },
    Plan {
        run_id: String,
        direction: Direction,
        /// Stages in execution order
        stages: Vec<Vec<String>>,
    },
    StageStart {
        run_id: String,
        stage: usize,
        total_stages: usize,
        vertices: Vec<String>,
    },
    UnitStart {
        run_id: String,
        stage: usize,
        vertex: VertexId,
    },
    UnitComplete {
        run_id: String,
        stage: usize,
        vertex: VertexId,
        duration_ms: u64,
        error: Option<String>,
    },
    StageEnd {
        run_id: String,
        stage: usize,
        failed: usize,
    },
    RunEnd {
        run_id: String,
        result: ExecutionResult,
    },
}
