use thiserror::Error;

/// Failure of a single stack operation. Recorded per vertex, never fatal to
/// the run on its own.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RunnerError {
    #[error("failed to select stack {stack}: {message}")]
    Resolve { stack: String, message: String },

    #[error("{message}")]
    Operation {
        message: String,
        /// Resource identifiers reported by the backend, when it has them.
        resources: Vec<String>,
    },

    #[error("failed to start runner: {0}")]
    Spawn(String),

    #[error("cancelled")]
    Cancelled,

    #[error("unit panicked: {0}")]
    Panicked(String),
}

impl RunnerError {
    pub fn operation(message: impl Into<String>) -> Self {
        Self::Operation {
            message: message.into(),
            resources: Vec::new(),
        }
    }

    /// A fatal error means no further unit can make progress with this runner.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Spawn(_))
    }

    pub fn resources(&self) -> &[String] {
        match self {
            Self::Operation { resources, .. } => resources,
            _ => &[],
        }
    }
}
