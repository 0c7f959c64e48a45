//! Resource dependency graph
//!
//! Edges point from a resource to the resources that must exist before it.
//! The provisioning engine resolves creation order itself; the graph lets
//! the compiler reject cycles and lets synthesis emit explicit `DependsOn`
//! entries for edges that no property reference already implies.

use super::{CompileError, CompileResult};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResourceGraph {
    edges: BTreeMap<String, BTreeSet<String>>,
}

impl ResourceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_resource(&mut self, logical_id: &str) -> CompileResult<()> {
        if self.edges.contains_key(logical_id) {
            return Err(CompileError::DuplicateDefinition {
                kind: "resource".to_string(),
                name: logical_id.to_string(),
            });
        }
        self.edges.insert(logical_id.to_string(), BTreeSet::new());
        Ok(())
    }

    /// Record that `dependent` must be created after `dependency`.
    pub fn add_dependency(&mut self, dependent: &str, dependency: &str) -> CompileResult<()> {
        if !self.edges.contains_key(dependency) {
            return Err(CompileError::UndefinedReference {
                kind: "resource".to_string(),
                name: dependency.to_string(),
            });
        }
        if dependent == dependency {
            return Err(CompileError::CircularDependency {
                cycle: format!("{} -> {}", dependent, dependency),
            });
        }
        match self.edges.get_mut(dependent) {
            Some(deps) => {
                deps.insert(dependency.to_string());
                Ok(())
            }
            None => Err(CompileError::UndefinedReference {
                kind: "resource".to_string(),
                name: dependent.to_string(),
            }),
        }
    }

    pub fn contains(&self, logical_id: &str) -> bool {
        self.edges.contains_key(logical_id)
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Direct dependencies of a resource, in name order.
    pub fn dependencies(&self, logical_id: &str) -> impl Iterator<Item = &str> {
        self.edges
            .get(logical_id)
            .into_iter()
            .flat_map(|deps| deps.iter().map(String::as_str))
    }

    /// Creation order: every resource after all of its dependencies.
    /// Ties are broken by logical id so the order is stable.
    pub fn topological_order(&self) -> CompileResult<Vec<String>> {
        let mut remaining: BTreeMap<&str, usize> = self
            .edges
            .iter()
            .map(|(id, deps)| (id.as_str(), deps.len()))
            .collect();
        let mut dependents: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for (id, deps) in &self.edges {
            for dep in deps {
                dependents.entry(dep.as_str()).or_default().push(id.as_str());
            }
        }

        let mut ready: BTreeSet<&str> = remaining
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(id, _)| *id)
            .collect();
        let mut order = Vec::with_capacity(self.edges.len());

        while let Some(id) = ready.pop_first() {
            remaining.remove(id);
            order.push(id.to_string());
            for dependent in dependents.get(id).into_iter().flatten() {
                if let Some(count) = remaining.get_mut(dependent) {
                    *count -= 1;
                    if *count == 0 {
                        ready.insert(*dependent);
                    }
                }
            }
        }

        if !remaining.is_empty() {
            let stuck: Vec<&str> = remaining.keys().copied().collect();
            return Err(CompileError::CircularDependency {
                cycle: stuck.join(" -> "),
            });
        }

        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(nodes: &[&str], edges: &[(&str, &str)]) -> ResourceGraph {
        let mut graph = ResourceGraph::new();
        for node in nodes {
            graph.add_resource(node).unwrap();
        }
        for (from, to) in edges {
            graph.add_dependency(from, to).unwrap();
        }
        graph
    }

    #[test]
    fn test_order_respects_dependencies() {
        let graph = graph(
            &["Pipe", "Policy", "Queue", "Role", "Table"],
            &[
                ("Policy", "Role"),
                ("Policy", "Table"),
                ("Policy", "Queue"),
                ("Pipe", "Policy"),
                ("Pipe", "Role"),
            ],
        );
        let order = graph.topological_order().unwrap();
        assert_eq!(order, vec!["Queue", "Role", "Table", "Policy", "Pipe"]);
    }

    #[test]
    fn test_cycle_detected() {
        let graph = graph(&["A", "B", "C"], &[("A", "B"), ("B", "A"), ("C", "A")]);
        match graph.topological_order() {
            Err(CompileError::CircularDependency { cycle }) => {
                assert!(cycle.contains('A'));
                assert!(cycle.contains('B'));
            }
            other => panic!("expected cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_self_edge_rejected() {
        let mut graph = graph(&["A"], &[]);
        assert!(matches!(
            graph.add_dependency("A", "A"),
            Err(CompileError::CircularDependency { .. })
        ));
    }

    #[test]
    fn test_unknown_and_duplicate_nodes() {
        let mut graph = graph(&["A"], &[]);
        assert!(matches!(
            graph.add_dependency("A", "Missing"),
            Err(CompileError::UndefinedReference { .. })
        ));
        assert!(matches!(
            graph.add_resource("A"),
            Err(CompileError::DuplicateDefinition { .. })
        ));
        assert_eq!(graph.dependencies("A").count(), 0);
    }
}
