use std::path::Path;

use crate::error::ConfigError;

use super::types::{Project, ProjectsFile};

/// Read and decode the project file at `path`.
pub fn load_projects(path: &Path) -> Result<Vec<Project>, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let projects = parse_projects(&raw).map_err(|e| match e {
        ConfigError::Parse { message, .. } => ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        },
        other => other,
    })?;
    tracing::debug!(path = %path.display(), projects = projects.len(), "loaded project file");
    Ok(projects)
}

pub fn parse_projects(raw: &str) -> Result<Vec<Project>, ConfigError> {
    let file: ProjectsFile = serde_yaml::from_str(raw).map_err(|e| ConfigError::Parse {
        path: Default::default(),
        message: e.to_string(),
    })?;

    for project in &file.projects {
        if project.name.trim().is_empty() {
            return Err(ConfigError::Invalid("project with an empty name".into()));
        }
        if project.name.contains(':') {
            return Err(ConfigError::Invalid(format!(
                "project name {:?} must not contain ':'",
                project.name
            )));
        }
        if let Some(stack) = project.stacks.iter().find(|s| s.name.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!(
                "project {:?} has a stack with an empty name ({:?})",
                project.name, stack.name
            )));
        }
    }

    Ok(file.projects)
}
