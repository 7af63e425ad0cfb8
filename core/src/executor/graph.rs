use std::collections::{BTreeMap, BTreeSet};

use crate::error::PlanError;
use crate::project::{Project, ProjectSet};

use super::types::VertexId;

/// Stack dependency graph (DAG once validated).
///
/// Vertices are `(project, stack)` pairs; an edge `D:S -> P:S` exists when
/// project `P` depends on project `D` and both declare stack `S`.
#[derive(Debug, Clone, Default)]
pub struct StackGraph {
    /// All vertices, in sort order
    vertices: BTreeSet<VertexId>,

    /// Dependency edges: vertex -> vertices it waits for
    edges: BTreeMap<VertexId, BTreeSet<VertexId>>,

    /// Reverse edges: vertex -> vertices waiting for it
    reverse_edges: BTreeMap<VertexId, BTreeSet<VertexId>>,
}

impl StackGraph {
    /// Merge duplicate project entries and build the graph.
    pub fn from_projects(projects: &[Project]) -> Result<Self, PlanError> {
        Self::from_project_set(&ProjectSet::from_projects(projects))
    }

    pub fn from_project_set(projects: &ProjectSet) -> Result<Self, PlanError> {
        let mut graph = Self::default();

        // Add all vertices first
        for project in projects.iter() {
            for stack in &project.stacks {
                graph.add_vertex(VertexId::new(&project.name, &stack.name))?;
            }
        }

        // Edges only between identically-named stacks. A dependency that
        // shares no stack names with its dependent yields no edges.
        for project in projects.iter() {
            for dep_name in &project.depends_on {
                let Some(dep) = projects.get(dep_name) else {
                    continue;
                };
                for stack in &project.stacks {
                    if dep.declares_stack(&stack.name) {
                        graph.add_edge(
                            VertexId::new(&dep.name, &stack.name),
                            VertexId::new(&project.name, &stack.name),
                        );
                    }
                }
            }
        }

        tracing::debug!(
            vertices = graph.vertices.len(),
            edges = graph.edge_count(),
            "built stack graph"
        );

        Ok(graph)
    }

    fn add_vertex(&mut self, vertex: VertexId) -> Result<(), PlanError> {
        if !self.vertices.insert(vertex.clone()) {
            return Err(PlanError::DuplicateVertex(vertex));
        }
        self.edges.entry(vertex).or_default();
        Ok(())
    }

    fn add_edge(&mut self, from: VertexId, to: VertexId) {
        self.reverse_edges
            .entry(from.clone())
            .or_default()
            .insert(to.clone());
        self.edges.entry(to).or_default().insert(from);
    }

    pub fn vertices(&self) -> impl Iterator<Item = &VertexId> {
        self.vertices.iter()
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn contains(&self, vertex: &VertexId) -> bool {
        self.vertices.contains(vertex)
    }

    /// Vertices that must finish before `vertex` starts.
    pub fn dependencies(&self, vertex: &VertexId) -> impl Iterator<Item = &VertexId> {
        self.edges.get(vertex).into_iter().flatten()
    }

    /// Vertices waiting on `vertex`.
    pub fn dependents(&self, vertex: &VertexId) -> impl Iterator<Item = &VertexId> {
        self.reverse_edges.get(vertex).into_iter().flatten()
    }

    /// All edges as `(from, to)` pairs, sorted.
    pub fn edges(&self) -> Vec<(VertexId, VertexId)> {
        let mut out: Vec<(VertexId, VertexId)> = self
            .edges
            .iter()
            .flat_map(|(to, froms)| froms.iter().map(move |from| (from.clone(), to.clone())))
            .collect();
        out.sort();
        out
    }

    pub fn edge_count(&self) -> usize {
        self.edges.values().map(BTreeSet::len).sum()
    }

    /// Find one dependency cycle among `candidates` using DFS.
    ///
    /// # Time Complexity
    ///
    /// O(V + E) over the candidate subgraph
    pub(crate) fn find_cycle(&self, candidates: &BTreeSet<VertexId>) -> Option<Vec<VertexId>> {
        let mut visited = BTreeSet::new();
        let mut stack = Vec::new();

        for vertex in candidates {
            if !visited.contains(vertex)
                && self.dfs_cycle(vertex, candidates, &mut visited, &mut stack)
            {
                return Some(stack);
            }
        }

        None
    }

    fn dfs_cycle(
        &self,
        node: &VertexId,
        candidates: &BTreeSet<VertexId>,
        visited: &mut BTreeSet<VertexId>,
        stack: &mut Vec<VertexId>,
    ) -> bool {
        visited.insert(node.clone());
        stack.push(node.clone());

        for dep in self.dependencies(node) {
            if !candidates.contains(dep) {
                continue;
            }

            // Dependency already on the current path closes a cycle
            if let Some(pos) = stack.iter().position(|x| x == dep) {
                stack.push(dep.clone());
                *stack = stack[pos..].to_vec();
                return true;
            }

            if !visited.contains(dep) && self.dfs_cycle(dep, candidates, visited, stack) {
                return true;
            }
        }

        stack.pop();
        false
    }
}

pub(crate) fn format_cycle_path(path: &[VertexId]) -> String {
    path.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn v(project: &str, stack: &str) -> VertexId {
        VertexId::new(project, stack)
    }

    #[test]
    fn one_vertex_per_project_stack() {
        let graph = StackGraph::from_projects(&[
            Project::new("net").with_stacks(["prod", "dev"]),
            Project::new("app").with_stacks(["prod"]),
        ])
        .unwrap();

        let vertices: Vec<String> = graph.vertices().map(ToString::to_string).collect();
        assert_eq!(vertices, vec!["app:prod", "net:dev", "net:prod"]);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn edges_join_matching_stacks_only() {
        let graph = StackGraph::from_projects(&[
            Project::new("d").with_stacks(["x"]),
            Project::new("p").with_stacks(["x", "y"]).depends_on(["d"]),
        ])
        .unwrap();

        assert_eq!(graph.edges(), vec![(v("d", "x"), v("p", "x"))]);
        assert_eq!(graph.dependencies(&v("p", "y")).count(), 0);
        assert_eq!(
            graph.dependents(&v("d", "x")).cloned().collect::<Vec<_>>(),
            vec![v("p", "x")]
        );
    }

    #[test]
    fn dependency_without_shared_stacks_adds_no_edges() {
        let graph = StackGraph::from_projects(&[
            Project::new("d").with_stacks(["staging"]),
            Project::new("p").with_stacks(["prod"]).depends_on(["d"]),
        ])
        .unwrap();

        assert_eq!(graph.len(), 2);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn merged_duplicates_contribute_edges() {
        let graph = StackGraph::from_projects(&[
            Project::new("net").with_stacks(["prod"]),
            Project::new("db").with_stacks(["prod"]),
            Project::new("app").with_stacks(["prod"]).depends_on(["net"]),
            Project::new("app").with_stacks(["prod"]).depends_on(["db"]),
        ])
        .unwrap();

        assert_eq!(
            graph.edges(),
            vec![
                (v("db", "prod"), v("app", "prod")),
                (v("net", "prod"), v("app", "prod")),
            ]
        );
    }

    #[test]
    fn duplicate_vertex_is_rejected() {
        let mut graph = StackGraph::default();
        graph.add_vertex(v("a", "s")).unwrap();
        assert_eq!(
            graph.add_vertex(v("a", "s")),
            Err(PlanError::DuplicateVertex(v("a", "s")))
        );
    }

    #[test]
    fn finds_cycle_path() {
        let graph = StackGraph::from_projects(&[
            Project::new("a").with_stacks(["s"]).depends_on(["b"]),
            Project::new("b").with_stacks(["s"]).depends_on(["a"]),
        ])
        .unwrap();

        let all: BTreeSet<VertexId> = graph.vertices().cloned().collect();
        let cycle = graph.find_cycle(&all).unwrap();
        assert_eq!(format_cycle_path(&cycle), "a:s -> b:s -> a:s");
    }
}
