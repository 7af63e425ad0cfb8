use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::error::PlanError;
use crate::project::{Project, ProjectSet};
use crate::validation::validate_dependencies;

use super::graph::{format_cycle_path, StackGraph};
use super::types::{Direction, VertexId};

/// Ordered execution groups. Every vertex of the graph appears in exactly one
/// group, and for every edge `A -> B` the group of `A` comes before the group
/// of `B`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionPlan {
    groups: Vec<Vec<VertexId>>,
}

impl ExecutionPlan {
    /// Level the graph into stages using Kahn's algorithm.
    ///
    /// Each stage holds every vertex whose dependencies all sit in earlier
    /// stages, which gives the fewest stages and the widest fan-out.
    ///
    /// # Algorithm
    ///
    /// 1. Calculate in-degree for all vertices
    /// 2. Collect all vertices with in-degree 0 (first stage)
    /// 3. Remove these vertices and update in-degrees
    /// 4. Repeat until all vertices processed; leftovers mean a cycle
    ///
    /// # Time Complexity
    ///
    /// O((V + E) log V)
    pub fn from_graph(graph: &StackGraph) -> Result<Self, PlanError> {
        let mut in_degree: BTreeMap<&VertexId, usize> = graph
            .vertices()
            .map(|v| (v, graph.dependencies(v).count()))
            .collect();

        let mut groups: Vec<Vec<VertexId>> = Vec::new();
        let mut current: BTreeSet<&VertexId> = in_degree
            .iter()
            .filter(|(_, &degree)| degree == 0)
            .map(|(v, _)| *v)
            .collect();
        let mut processed = 0;

        while !current.is_empty() {
            processed += current.len();

            let mut next = BTreeSet::new();
            for vertex in &current {
                for dependent in graph.dependents(vertex) {
                    if let Some(degree) = in_degree.get_mut(dependent) {
                        *degree -= 1;
                        if *degree == 0 {
                            next.insert(dependent);
                        }
                    }
                }
            }

            // BTreeSet iteration is already (project, stack) order
            groups.push(current.into_iter().cloned().collect());
            current = next;
        }

        if processed != graph.len() {
            let placed: BTreeSet<&VertexId> = groups.iter().flatten().collect();
            let remaining: BTreeSet<VertexId> = graph
                .vertices()
                .filter(|v| !placed.contains(v))
                .cloned()
                .collect();
            let path = graph
                .find_cycle(&remaining)
                .map(|cycle| format_cycle_path(&cycle))
                .unwrap_or_else(|| "unable to complete topological sort".to_string());
            return Err(PlanError::Cycle {
                path,
                unschedulable: remaining.iter().map(ToString::to_string).collect(),
            });
        }

        Ok(Self { groups })
    }

    /// Groups in apply order.
    pub fn groups(&self) -> &[Vec<VertexId>] {
        &self.groups
    }

    /// Groups in the order `direction` executes them: forward for apply,
    /// reversed for teardown.
    pub fn stages(&self, direction: Direction) -> Vec<&[VertexId]> {
        let groups = self.groups.iter().map(Vec::as_slice);
        match direction {
            Direction::Apply => groups.collect(),
            Direction::Teardown => groups.rev().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn total_vertices(&self) -> usize {
        self.groups.iter().map(Vec::len).sum()
    }

    /// Apply-order group index of `vertex`.
    pub fn group_of(&self, vertex: &VertexId) -> Option<usize> {
        self.groups.iter().position(|g| g.contains(vertex))
    }

    pub fn to_strings(&self) -> Vec<Vec<String>> {
        self.groups
            .iter()
            .map(|g| g.iter().map(ToString::to_string).collect())
            .collect()
    }
}

/// Pre-flight validation, merge, graph build and leveling in one step.
pub fn build_plan(projects: &[Project]) -> Result<(ProjectSet, ExecutionPlan), PlanError> {
    validate_dependencies(projects)?;
    let set = ProjectSet::from_projects(projects);
    let graph = StackGraph::from_project_set(&set)?;
    let plan = ExecutionPlan::from_graph(&graph)?;
    Ok((set, plan))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn plan_of(projects: &[Project]) -> Result<Vec<Vec<String>>, PlanError> {
        let (_, plan) = build_plan(projects)?;
        Ok(plan.to_strings())
    }

    #[test]
    fn linear_dependency_gives_two_stages() {
        let groups = plan_of(&[
            Project::new("net").with_stacks(["prod"]),
            Project::new("app").with_stacks(["prod"]).depends_on(["net"]),
        ])
        .unwrap();
        assert_eq!(groups, vec![vec!["net:prod"], vec!["app:prod"]]);
    }

    #[test]
    fn unrelated_stack_runs_in_first_stage() {
        let groups = plan_of(&[
            Project::new("a").with_stacks(["s1", "s2"]),
            Project::new("b").with_stacks(["s1"]).depends_on(["a"]),
        ])
        .unwrap();
        assert_eq!(groups, vec![vec!["a:s1", "a:s2"], vec!["b:s1"]]);
    }

    #[test]
    fn cycle_is_an_error_not_a_partial_schedule() {
        let err = plan_of(&[
            Project::new("a").with_stacks(["s"]).depends_on(["b"]),
            Project::new("b").with_stacks(["s"]).depends_on(["a"]),
        ])
        .unwrap_err();

        match err {
            PlanError::Cycle {
                path,
                unschedulable,
            } => {
                assert_eq!(path, "a:s -> b:s -> a:s");
                assert_eq!(unschedulable, vec!["a:s", "b:s"]);
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn cycle_on_one_stack_does_not_hide_behind_others() {
        let err = plan_of(&[
            Project::new("a").with_stacks(["s", "t"]).depends_on(["b"]),
            Project::new("b").with_stacks(["s"]).depends_on(["c"]),
            Project::new("c").with_stacks(["s", "t"]).depends_on(["a"]),
        ])
        .unwrap_err();
        assert!(matches!(err, PlanError::Cycle { .. }));
    }

    #[test]
    fn cycle_across_disjoint_stacks_is_not_a_cycle() {
        // a depends on b and b on a, but they share no stack name
        let groups = plan_of(&[
            Project::new("a").with_stacks(["x"]).depends_on(["b"]),
            Project::new("b").with_stacks(["y"]).depends_on(["a"]),
        ])
        .unwrap();
        assert_eq!(groups, vec![vec!["a:x", "b:y"]]);
    }

    #[test]
    fn missing_dependency_fails_before_graph_build() {
        let err = plan_of(&[Project::new("a").with_stacks(["s"]).depends_on(["ghost"])]).unwrap_err();
        assert_eq!(
            err,
            PlanError::MissingDependency {
                project: "a".into(),
                dependency: "ghost".into()
            }
        );
    }

    #[test]
    fn diamond_levels_by_longest_path() {
        let groups = plan_of(&[
            Project::new("base").with_stacks(["prod"]),
            Project::new("left").with_stacks(["prod"]).depends_on(["base"]),
            Project::new("right").with_stacks(["prod"]).depends_on(["base"]),
            Project::new("top")
                .with_stacks(["prod"])
                .depends_on(["left", "right", "base"]),
        ])
        .unwrap();
        assert_eq!(
            groups,
            vec![
                vec!["base:prod"],
                vec!["left:prod", "right:prod"],
                vec!["top:prod"],
            ]
        );
    }

    #[test]
    fn teardown_stages_are_reversed() {
        let (_, plan) = build_plan(&[
            Project::new("net").with_stacks(["prod"]),
            Project::new("app").with_stacks(["prod"]).depends_on(["net"]),
        ])
        .unwrap();

        let teardown: Vec<Vec<String>> = plan
            .stages(Direction::Teardown)
            .iter()
            .map(|g| g.iter().map(ToString::to_string).collect())
            .collect();
        assert_eq!(teardown, vec![vec!["app:prod"], vec!["net:prod"]]);
    }

    #[test]
    fn empty_input_gives_empty_plan() {
        let (_, plan) = build_plan(&[]).unwrap();
        assert!(plan.is_empty());
        assert_eq!(plan.total_vertices(), 0);
    }
}
