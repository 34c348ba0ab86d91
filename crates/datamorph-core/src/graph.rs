//! # Inheritance Graph
//!
//! The "implements" graph of a conceptual or physical model.
//!
//! All data structures use `BTreeMap` for deterministic ordering: the
//! topological order, the ancestor closure and the reported cycle members
//! are functions of the input alone.

use crate::DataModelError;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

// =============================================================================
// GRAPH IMPLEMENTATION
// =============================================================================

/// Parent edges between nodes.
///
/// Parents that are never added as nodes themselves (e.g. platform-provided
/// bases) are treated as roots.
#[derive(Debug, Clone)]
pub struct InheritanceGraph<N> {
    /// node -> parents, in declaration order, deduplicated
    parents: BTreeMap<N, Vec<N>>,
}

impl<N> Default for InheritanceGraph<N> {
    fn default() -> Self {
        Self {
            parents: BTreeMap::new(),
        }
    }
}

impl<N: Ord + Clone + fmt::Display> InheritanceGraph<N> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `node` with its direct parents. Adding the same node twice merges
    /// the parent lists.
    pub fn add_node(&mut self, node: N, parents: impl IntoIterator<Item = N>) {
        let parents: Vec<N> = parents.into_iter().collect();
        for parent in &parents {
            self.parents.entry(parent.clone()).or_default();
        }
        let entry = self.parents.entry(node).or_default();
        for parent in parents {
            if !entry.contains(&parent) {
                entry.push(parent);
            }
        }
    }

    pub fn nodes(&self) -> impl Iterator<Item = &N> {
        self.parents.keys()
    }

    #[must_use]
    pub fn contains(&self, node: &N) -> bool {
        self.parents.contains_key(node)
    }

    /// Direct parents of `node`, in declaration order.
    #[must_use]
    pub fn parents_of(&self, node: &N) -> &[N] {
        self.parents.get(node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Direct children of `node`, in node order.
    #[must_use]
    pub fn children_of(&self, node: &N) -> Vec<N> {
        self.parents
            .iter()
            .filter(|(_, parents)| parents.contains(node))
            .map(|(child, _)| child.clone())
            .collect()
    }

    /// Kahn's algorithm: every node appears after all of its parents.
    ///
    /// Ties are broken by node order. Nodes left over when the queue drains
    /// sit on or behind a cycle and are reported in the error.
    pub fn topological_order(&self) -> Result<Vec<N>, DataModelError> {
        let mut pending: BTreeMap<&N, usize> = self
            .parents
            .iter()
            .map(|(node, parents)| (node, parents.len()))
            .collect();

        let mut children: BTreeMap<&N, Vec<&N>> = BTreeMap::new();
        for (node, parents) in &self.parents {
            for parent in parents {
                children.entry(parent).or_default().push(node);
            }
        }

        let mut ready: BTreeSet<&N> = pending
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(node, _)| *node)
            .collect();
        let mut order = Vec::with_capacity(self.parents.len());

        while let Some(node) = ready.pop_first() {
            pending.remove(node);
            order.push(node.clone());
            for &child in children.get(node).into_iter().flatten() {
                if let Some(count) = pending.get_mut(child) {
                    *count = count.saturating_sub(1);
                    if *count == 0 {
                        ready.insert(child);
                    }
                }
            }
        }

        if !pending.is_empty() {
            return Err(DataModelError::InheritanceCycle {
                members: pending.keys().map(ToString::to_string).collect(),
            });
        }
        Ok(order)
    }

    /// Ancestor closure of every node, nearest ancestor first.
    ///
    /// Nodes are processed in topological order and each parent's own
    /// closure is unioned into the child's, so an ancestor's distance is the
    /// length of its shortest path. Equal distances keep discovery order.
    pub fn ancestor_closure(&self) -> Result<BTreeMap<N, Vec<N>>, DataModelError> {
        let order = self.topological_order()?;
        let mut closure: BTreeMap<N, Vec<(N, usize)>> = BTreeMap::new();

        for node in order {
            let mut found: Vec<(N, usize)> = Vec::new();
            let mut position: BTreeMap<N, usize> = BTreeMap::new();
            let mut record = |ancestor: &N, distance: usize| match position.get(ancestor) {
                Some(&at) => {
                    if let Some(slot) = found.get_mut(at) {
                        slot.1 = slot.1.min(distance);
                    }
                }
                None => {
                    position.insert(ancestor.clone(), found.len());
                    found.push((ancestor.clone(), distance));
                }
            };

            let parents = self.parents_of(&node);
            for parent in parents {
                record(parent, 1);
            }
            for parent in parents {
                for (ancestor, distance) in closure.get(parent).into_iter().flatten() {
                    record(ancestor, distance.saturating_add(1));
                }
            }

            found.sort_by_key(|(_, distance)| *distance);
            closure.insert(node, found);
        }

        Ok(closure
            .into_iter()
            .map(|(node, ancestors)| (node, ancestors.into_iter().map(|(a, _)| a).collect()))
            .collect())
    }

    /// Ancestors of a single node, nearest first. Unknown nodes have none.
    pub fn ancestors_of(&self, node: &N) -> Result<Vec<N>, DataModelError> {
        let mut closure = self.ancestor_closure()?;
        Ok(closure.remove(node).unwrap_or_default())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn graph(edges: &[(&str, &[&str])]) -> InheritanceGraph<String> {
        let mut graph = InheritanceGraph::new();
        for (node, parents) in edges {
            graph.add_node(node.to_string(), parents.iter().map(|p| p.to_string()));
        }
        graph
    }

    #[test]
    fn chain_closure() {
        let graph = graph(&[("C", &["P"]), ("P", &["G"]), ("G", &[])]);
        assert_eq!(
            graph.ancestors_of(&"C".to_string()).expect("acyclic"),
            vec!["P".to_string(), "G".to_string()]
        );
        assert!(graph.ancestors_of(&"G".to_string()).expect("acyclic").is_empty());
    }

    #[test]
    fn topological_order_puts_parents_first() {
        let graph = graph(&[("C", &["P"]), ("P", &["G"])]);
        let order = graph.topological_order().expect("acyclic");
        assert_eq!(order, vec!["G".to_string(), "P".to_string(), "C".to_string()]);
    }

    #[test]
    fn diamond_orders_nearest_first() {
        let graph = graph(&[("D", &["B", "C"]), ("B", &["A"]), ("C", &["A"])]);
        let ancestors = graph.ancestors_of(&"D".to_string()).expect("acyclic");
        assert_eq!(
            ancestors,
            vec!["B".to_string(), "C".to_string(), "A".to_string()]
        );
    }

    #[test]
    fn shortcut_keeps_shortest_distance() {
        // D -> B -> A and D -> A directly: A is a direct parent.
        let graph = graph(&[("D", &["B", "A"]), ("B", &["A"])]);
        let ancestors = graph.ancestors_of(&"D".to_string()).expect("acyclic");
        assert_eq!(ancestors, vec!["B".to_string(), "A".to_string()]);
    }

    #[test]
    fn cycle_is_an_error() {
        let graph = graph(&[("A", &["B"]), ("B", &["C"]), ("C", &["A"]), ("X", &[])]);
        match graph.topological_order() {
            Err(DataModelError::InheritanceCycle { members }) => {
                assert_eq!(members, vec!["A", "B", "C"]);
            }
            other => panic!("expected cycle, got {:?}", other),
        }
        assert!(graph.ancestor_closure().is_err());
    }

    #[test]
    fn self_parent_is_a_cycle() {
        let graph = graph(&[("A", &["A"])]);
        assert!(graph.topological_order().is_err());
    }

    #[test]
    fn undeclared_parent_becomes_root() {
        let graph = graph(&[("Pump", &["cdf:Asset"])]);
        assert!(graph.contains(&"cdf:Asset".to_string()));
        assert_eq!(graph.children_of(&"cdf:Asset".to_string()), vec!["Pump".to_string()]);
    }
}
