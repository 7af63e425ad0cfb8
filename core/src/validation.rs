use std::collections::HashSet;

use crate::error::PlanError;
use crate::project::Project;

/// Check that every declared dependency names a project in the list.
///
/// Runs over raw entries, before any merge or graph construction.
pub fn validate_dependencies(projects: &[Project]) -> Result<(), PlanError> {
    let names: HashSet<&str> = projects.iter().map(|p| p.name.as_str()).collect();

    for project in projects {
        for dep in &project.depends_on {
            if !names.contains(dep.as_str()) {
                return Err(PlanError::MissingDependency {
                    project: project.name.clone(),
                    dependency: dep.clone(),
                });
            }
        }
    }

    Ok(())
}
