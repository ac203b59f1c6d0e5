//! Run-scoped node registry
//!
//! Owns every node created during a run, keyed by target identity, so a
//! target reachable from several roots is only traversed once.

use crate::graph::node::{Node, NodeId};
use crate::project::TargetId;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Default)]
pub struct NodeRegistry {
    nodes: Vec<Node>,
    index: HashMap<TargetId, NodeId>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn find(&self, target: &TargetId) -> Option<NodeId> {
        self.index.get(target).copied()
    }

    /// Register a node; an already registered target returns the existing id
    pub fn insert(&mut self, node: Node) -> NodeId {
        if let Some(id) = self.find(&node.target) {
            return id;
        }
        let id = NodeId(self.nodes.len());
        self.index.insert(node.target.clone(), id);
        self.nodes.push(node);
        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    /// Wire `node -> dependency` in both directions, skipping duplicates
    pub fn add_dependency(&mut self, node: NodeId, dependency: NodeId) {
        if node == dependency {
            return;
        }
        if !self.nodes[node.0].dependencies.contains(&dependency) {
            self.nodes[node.0].dependencies.push(dependency);
        }
        if !self.nodes[dependency.0].dependents.contains(&node) {
            self.nodes[dependency.0].dependents.push(node);
        }
    }

    /// Direct and transitive dependents, nearest first, without duplicates
    pub fn all_dependents(&self, id: NodeId) -> Vec<NodeId> {
        self.walk(id, |node| &node.dependents)
    }

    /// `id` followed by its transitive dependencies, depth first
    pub fn closure(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = vec![id];
        let mut seen = HashSet::from([id]);
        let mut stack: Vec<NodeId> = self.node(id).dependencies.iter().rev().copied().collect();

        while let Some(next) = stack.pop() {
            if !seen.insert(next) {
                continue;
            }
            result.push(next);
            stack.extend(self.node(next).dependencies.iter().rev().copied());
        }
        result
    }

    fn walk(&self, id: NodeId, edges: impl Fn(&Node) -> &Vec<NodeId>) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut seen = HashSet::from([id]);
        let mut queue: std::collections::VecDeque<NodeId> =
            edges(self.node(id)).iter().copied().collect();

        while let Some(next) = queue.pop_front() {
            if !seen.insert(next) {
                continue;
            }
            result.push(next);
            queue.extend(edges(self.node(next)).iter().copied());
        }
        result
    }
}
