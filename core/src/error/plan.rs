use thiserror::Error;

use crate::executor::types::VertexId;

/// Process exit codes, grouped by failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ErrorCode {
    Success = 0,
    StackFailure = 1,
    InvalidPlan = 2,
    ConfigError = 11,
    IoError = 20,
    Internal = 50,
    Interrupted = 130,
}

impl ErrorCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

/// Structural errors raised before anything is executed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error("duplicate vertex: {0}")]
    DuplicateVertex(VertexId),

    #[error("project {project:?} depends on missing project {dependency:?}")]
    MissingDependency { project: String, dependency: String },

    #[error("dependency cycle detected: {path} (unschedulable: {})", .unschedulable.join(", "))]
    Cycle {
        path: String,
        unschedulable: Vec<String>,
    },
}

impl PlanError {
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::DuplicateVertex(_) | Self::MissingDependency { .. } | Self::Cycle { .. } => {
                ErrorCode::InvalidPlan
            }
        }
    }
}
