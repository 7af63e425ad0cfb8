use std::collections::{BTreeMap, BTreeSet};

use super::types::{Project, StackDefinition};

/// Projects normalized by name.
///
/// Entries sharing a name are unioned: stacks by stack name, dependencies by
/// project name. Where two entries define the same stack, env maps are merged
/// and the first-seen value wins on conflicting keys; `dir` and `aws_profile`
/// keep the first non-empty value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectSet {
    projects: BTreeMap<String, Project>,
}

impl ProjectSet {
    pub fn from_projects(projects: &[Project]) -> Self {
        let mut merged: BTreeMap<String, Project> = BTreeMap::new();
        let mut deps: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

        for project in projects {
            let target = merged.entry(project.name.clone()).or_insert_with(|| Project {
                name: project.name.clone(),
                ..Project::default()
            });

            for stack in &project.stacks {
                merge_stack(&mut target.stacks, stack);
            }

            if target.dir.is_none() {
                target.dir = project.dir.clone();
            }
            if target.aws_profile.is_none() {
                target.aws_profile = project.aws_profile.clone();
            }

            deps.entry(project.name.clone())
                .or_default()
                .extend(project.depends_on.iter().cloned());
        }

        for (name, project) in merged.iter_mut() {
            project.depends_on = deps.remove(name).unwrap_or_default().into_iter().collect();
        }

        Self { projects: merged }
    }

    pub fn get(&self, name: &str) -> Option<&Project> {
        self.projects.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.projects.contains_key(name)
    }

    /// Projects in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Project> {
        self.projects.values()
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    pub fn stack(&self, project: &str, stack: &str) -> Option<(&Project, &StackDefinition)> {
        let project = self.get(project)?;
        let stack = project.stack(stack)?;
        Some((project, stack))
    }
}

fn merge_stack(stacks: &mut Vec<StackDefinition>, incoming: &StackDefinition) {
    match stacks.iter_mut().find(|s| s.name == incoming.name) {
        Some(existing) => {
            for (key, value) in &incoming.env {
                existing
                    .env
                    .entry(key.clone())
                    .or_insert_with(|| value.clone());
            }
            if existing.aws_profile.is_none() {
                existing.aws_profile = incoming.aws_profile.clone();
            }
        }
        None => stacks.push(incoming.clone()),
    }
}
