use std::fmt;

use serde::{Serialize, Serializer};

/// Scheduling unit: one stack of one project.
///
/// Ordering is by project name, then stack name; every group the scheduler
/// emits is sorted with this ordering.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VertexId {
    pub project: String,
    pub stack: String,
}

impl VertexId {
    pub fn new(project: impl Into<String>, stack: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            stack: stack.into(),
        }
    }

    /// Parse the `project:stack` form. Project names never contain `:`,
    /// so the first separator splits the id.
    pub fn parse(id: &str) -> Option<Self> {
        let (project, stack) = id.split_once(':')?;
        if project.is_empty() || stack.is_empty() {
            return None;
        }
        Some(Self::new(project, stack))
    }
}

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.project, self.stack)
    }
}

impl Serialize for VertexId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Direction of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Apply,
    Teardown,
}

impl Direction {
    /// Verb used in log fields and run events.
    pub fn operation(self) -> &'static str {
        match self {
            Self::Apply => "deploy",
            Self::Teardown => "destroy",
        }
    }

    /// Heading used by the preview renderer.
    pub fn title(self) -> &'static str {
        match self {
            Self::Apply => "Deploy",
            Self::Teardown => "Destroy",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.operation())
    }
}
