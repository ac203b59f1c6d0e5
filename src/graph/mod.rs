//! Dependency graphs over build targets
//!
//! A run owns one [`NodeRegistry`]; each [`Graph`] is a view onto the
//! registry: the dependency closure of one root target.

mod builder;
mod evaluator;
mod fingerprint;
mod node;
mod registry;
mod resolver;

pub use builder::GraphBuilder;
pub use evaluator::RebuildEvaluator;
pub use fingerprint::{FingerprintCalculator, TOOL_FINGERPRINT};
pub use node::{Node, NodeId, RebuildState};
pub use registry::NodeRegistry;
pub use resolver::TargetResolver;

use crate::settings::SettingsContainer;
use std::fmt::Write;

/// Dependency closure of a root node
#[derive(Debug, Clone)]
pub struct Graph {
    nodes: Vec<NodeId>,
    root: NodeId,
    /// Settings of the target consuming the root's product
    pub dependent_settings: Option<SettingsContainer>,
}

impl Graph {
    pub fn new(root: NodeId) -> Self {
        Self {
            nodes: vec![root],
            root,
            dependent_settings: None,
        }
    }

    /// Node ids, root first
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains(&id)
    }

    pub fn add(&mut self, id: NodeId) {
        if !self.contains(id) {
            self.nodes.push(id);
        }
    }

    pub fn node_by_name(&self, registry: &NodeRegistry, name: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .copied()
            .find(|id| registry.node(*id).name == name)
    }

    /// Human-readable dump of every node
    pub fn render(&self, registry: &NodeRegistry) -> String {
        let names = |ids: &[NodeId]| {
            ids.iter()
                .map(|id| registry.node(*id).name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        };

        let mut out = String::new();
        for id in &self.nodes {
            let node = registry.node(*id);
            let _ = writeln!(out, "{}{}", node.name, if *id == self.root { " (root)" } else { "" });
            let _ = writeln!(out, "  product: {} ({})", node.product_file_name(), node.product_kind);
            let _ = writeln!(out, "  sha: {}", node.sha.as_deref().unwrap_or("<none>"));
            let _ = writeln!(out, "  state: {}", node.state);
            let _ = writeln!(out, "  dependencies: {}", names(node.dependencies()));
            let _ = writeln!(out, "  dependents: {}", names(node.dependents()));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::model::product_types;
    use crate::project::{ProductReference, Target, TargetId};

    fn node(name: &str) -> Node {
        let target = Target {
            uuid: name.into(),
            name: name.into(),
            platform: "ios".into(),
            product_type: product_types::STATIC_LIBRARY.into(),
            product: ProductReference {
                uuid: format!("{}-product", name),
                name: None,
                path: format!("lib{}.a", name),
            },
            aggregate: false,
            dependencies: vec![],
            phases: vec![],
            configurations: vec![],
        };
        Node::new(TargetId::new("/w/Pods.json", name), &target)
    }

    #[test]
    fn render_lists_every_node() {
        let mut registry = NodeRegistry::new();
        let app = registry.insert(node("Feature"));
        let core = registry.insert(node("Core"));
        registry.add_dependency(app, core);
        registry.node_mut(core).sha = Some("abc".into());
        registry.node_mut(core).state = RebuildState::ExistsInCache;

        let mut graph = Graph::new(app);
        graph.add(core);
        graph.add(core);
        assert_eq!(graph.len(), 2);

        let rendered = graph.render(&registry);
        assert!(rendered.contains("Feature (root)"));
        assert!(rendered.contains("  product: libCore.a (static library)"));
        assert!(rendered.contains("  sha: abc"));
        assert!(rendered.contains("  state: exists_in_cache"));
        assert!(rendered.contains("  dependents: Feature"));
        assert!(rendered.contains("  sha: <none>"));
    }
}
