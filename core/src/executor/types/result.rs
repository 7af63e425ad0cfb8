use serde::Serialize;

use crate::error::RunnerError;

use super::vertex::{Direction, VertexId};

/// Result of executing a plan in one direction.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    pub run_id: String,

    pub direction: Direction,

    /// Total number of vertices in the plan
    pub total: usize,

    /// Vertices whose operation succeeded, sorted by (project, stack)
    pub completed: Vec<VertexId>,

    /// Vertices whose operation failed, in stage order
    pub failures: Vec<UnitFailure>,

    /// Vertices never started because the run stopped early
    pub skipped: Vec<VertexId>,

    /// Number of stages that actually ran
    pub stages_run: usize,

    pub duration_ms: u64,

    /// Resource identifiers needing manual cleanup (teardown only)
    pub remediation: Vec<String>,
}

impl ExecutionResult {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && self.skipped.is_empty()
    }
}

/// A failed unit of work.
#[derive(Debug, Clone, Serialize)]
pub struct UnitFailure {
    pub vertex: VertexId,
    pub stage: usize,
    #[serde(serialize_with = "serialize_error")]
    pub error: RunnerError,
}

fn serialize_error<S: serde::Serializer>(err: &RunnerError, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(err)
}

/// Outcome reported by a runner for a successful operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationSummary {
    /// Backend-reported resource changes, e.g. `create` → 3.
    pub changes: Vec<(String, u64)>,
    pub duration_ms: u64,
}
