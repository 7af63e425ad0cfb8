use std::sync::Arc;

use serde_json::{json, Value};

use super::types::{Direction, VertexId};

/// Log context for one unit of work.
///
/// Built by the engine for every vertex it launches and handed to the unit
/// and its progress sink; carries the fields that tag every log line and
/// progress record the unit produces.
#[derive(Debug, Clone)]
pub struct UnitContext {
    pub run_id: Arc<str>,
    pub direction: Direction,
    /// 1-based stage number in execution order
    pub stage: usize,
    pub vertex: VertexId,
}

impl UnitContext {
    pub fn new(run_id: Arc<str>, direction: Direction, stage: usize, vertex: VertexId) -> Self {
        Self {
            run_id,
            direction,
            stage,
            vertex,
        }
    }

    pub fn span(&self) -> tracing::Span {
        tracing::info_span!(
            "unit",
            run_id = %self.run_id,
            operation = self.direction.operation(),
            stage = self.stage,
            project = %self.vertex.project,
            stack = %self.vertex.stack,
        )
    }

    /// Context fields as a JSON object, for structured progress records.
    pub fn fields(&self) -> Value {
        json!({
            "run_id": &*self.run_id,
            "operation": self.direction.operation(),
            "stage": self.stage,
            "project": self.vertex.project,
            "stack": self.vertex.stack,
        })
    }
}
