//! Dependency-ordered, stage-parallel execution of stack operations.
//!
//! # Architecture
//!
//! ```text
//! Vec<Project>
//!   ↓
//! validate_dependencies() + ProjectSet::from_projects()
//!   ↓
//! StackGraph::from_project_set() → { vertices, edges, reverse_edges }
//!   ↓
//! ExecutionPlan::from_graph() → Vec<Vec<VertexId>> (stages)
//!   ↓
//! ExecutionEngine::run_plan() → ExecutionResult
//! ```
//!
//! Teardown reuses the same plan and walks its stages in reverse.

mod context;
mod engine;
mod env;
mod graph;
mod output;
mod plan;
mod progress;
mod report;
mod scheduler;
pub mod traits;
pub mod types;

pub use context::UnitContext;
pub use engine::{ExecutionEngine, ExecutionEngineBuilder};
pub use env::{EnvScope, StackEnv};
pub use graph::StackGraph;
pub use plan::{build_plan, ExecutionPlan};
pub use progress::ProgressMonitor;
pub use report::{remediation_targets, scan_resource_ids};
pub use scheduler::execute_stage_parallel;
pub use traits::{
    OutputRenderer, ProgressSink, RenderEvent, SinkOutput, StackHandle, StackRunner, StackTarget,
};
pub use types::{
    Direction, ExecutionOpts, ExecutionResult, OperationSummary, ProgressMode, UnitFailure,
    VertexId,
};
