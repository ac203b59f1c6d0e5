//! Rebuild decisions
//!
//! Walks a graph bottom-up with an explicit stack. A node is finalized only
//! after all of its dependencies: it waits for rebuild when any dependency
//! does or when the store has no artifact for its fingerprint, and exists in
//! cache otherwise.

use crate::cache::ArtifactStore;
use crate::error::CacheResult;
use crate::graph::node::{NodeId, RebuildState};
use crate::graph::registry::NodeRegistry;
use tracing::debug;

pub struct RebuildEvaluator<'a> {
    store: &'a dyn ArtifactStore,
}

impl<'a> RebuildEvaluator<'a> {
    pub fn new(store: &'a dyn ArtifactStore) -> Self {
        Self { store }
    }

    /// Decide the state of `root` and everything below it
    pub fn evaluate(&self, registry: &mut NodeRegistry, root: NodeId) -> CacheResult<()> {
        let mut stack = vec![root];

        while let Some(&current) = stack.last() {
            match registry.node(current).state {
                RebuildState::EvaluatingDependencies => {
                    let state = self.decide(registry, current)?;
                    debug!("{} -> {}", registry.node(current).name, state);
                    registry.node_mut(current).state = state;
                    stack.pop();
                }
                RebuildState::Unknown => {
                    registry.node_mut(current).state = RebuildState::EvaluatingDependencies;
                    stack.extend(
                        registry
                            .node(current)
                            .dependencies()
                            .iter()
                            .filter(|dependency| {
                                registry.node(**dependency).state == RebuildState::Unknown
                            }),
                    );
                }
                _ => {
                    stack.pop();
                }
            }
        }
        Ok(())
    }

    fn decide(&self, registry: &NodeRegistry, id: NodeId) -> CacheResult<RebuildState> {
        let node = registry.node(id);
        let has_uncached_dependency = node
            .dependencies()
            .iter()
            .any(|dependency| registry.node(*dependency).is_waiting_for_rebuild());

        if has_uncached_dependency || self.store.cached_artifact_path(node)?.is_none() {
            Ok(RebuildState::WaitingForRebuild)
        } else {
            Ok(RebuildState::ExistsInCache)
        }
    }
}
