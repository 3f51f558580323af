//! The dependency graph proper.
//!
//! Nodes are object handles; edges record which objects were built from
//! which. The graph is deliberately storage-agnostic: it never sees an
//! object, only handles, so the repository crate can drive it without a
//! circular dependency.
//!
//! # Invariants
//!
//! - Edges are mirrored: `b` lists `a` as a precedent exactly when `a`
//!   lists `b` as a dependent. [`DependencyGraph::validate`] checks this.
//! - A node never appears among its own precedents.
//! - Detached nodes with no remaining edges are pruned immediately; a
//!   detached node survives only while someone still observes it.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::mem;

use depot_types::Handle;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{GraphError, GraphResult};
use crate::node::{DependencyNode, NodeState};

/// Bidirectional observer graph over object handles.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DependencyGraph {
    nodes: HashMap<Handle, DependencyNode>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes, placeholders included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &Handle) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn node(&self, id: &Handle) -> Option<&DependencyNode> {
        self.nodes.get(id)
    }

    /// Handles this node was built from. Empty when the node is unknown.
    pub fn precedents_of(&self, id: &Handle) -> Vec<Handle> {
        let Some(node) = self.nodes.get(id) else {
            return Vec::new();
        };
        node.precedents.iter().cloned().collect()
    }

    /// Handles built from this node. Empty when the node is unknown.
    pub fn dependents_of(&self, id: &Handle) -> Vec<Handle> {
        let Some(node) = self.nodes.get(id) else {
            return Vec::new();
        };
        node.dependents.iter().cloned().collect()
    }

    pub fn state_of(&self, id: &Handle) -> Option<NodeState> {
        self.nodes.get(id).map(|node| node.state)
    }

    // ---------------------------------------------------------------
    // Mutation
    // ---------------------------------------------------------------

    /// Point `id` at a new precedent set, replacing any previous wiring.
    ///
    /// Precedents that do not exist yet get detached placeholder nodes, so
    /// forward references are recorded rather than lost. Edges to dropped
    /// precedents are removed and orphaned placeholders pruned.
    pub fn wire(&mut self, id: &Handle, precedents: &BTreeSet<Handle>) -> GraphResult<()> {
        if precedents.contains(id) {
            return Err(GraphError::SelfObservation(id.clone()));
        }
        let old = self
            .nodes
            .get(id)
            .map(|node| node.precedents.clone())
            .unwrap_or_default();
        let dropped: Vec<Handle> = old.difference(precedents).cloned().collect();
        let added: Vec<Handle> = precedents.difference(&old).cloned().collect();

        for precedent in &added {
            self.nodes
                .entry(precedent.clone())
                .or_insert_with(|| DependencyNode::detached(precedent.clone()))
                .dependents
                .insert(id.clone());
        }
        let node = self
            .nodes
            .entry(id.clone())
            .or_insert_with(|| DependencyNode::detached(id.clone()));
        node.precedents = precedents.clone();
        node.state = NodeState::Wired;

        for precedent in &dropped {
            if let Some(node) = self.nodes.get_mut(precedent) {
                node.dependents.remove(id);
            }
            self.prune_if_orphan(precedent);
        }
        debug!(node = %id, precedents = precedents.len(), "wired graph node");
        Ok(())
    }

    /// Drop `id`'s outgoing edges and mark it detached.
    ///
    /// The node itself survives as a placeholder while other objects still
    /// observe it; only an edgeless detached node is removed. Unknown
    /// handles are ignored.
    pub fn detach(&mut self, id: &Handle) {
        let Some(node) = self.nodes.get_mut(id) else {
            return;
        };
        node.state = NodeState::Detached;
        let old = mem::take(&mut node.precedents);
        for precedent in &old {
            if let Some(node) = self.nodes.get_mut(precedent) {
                node.dependents.remove(id);
            }
            self.prune_if_orphan(precedent);
        }
        self.prune_if_orphan(id);
        debug!(node = %id, "detached graph node");
    }

    fn prune_if_orphan(&mut self, id: &Handle) {
        let orphaned = self
            .nodes
            .get(id)
            .is_some_and(|node| node.state == NodeState::Detached && !node.has_edges());
        if orphaned {
            self.nodes.remove(id);
        }
    }

    /// Update the lifecycle state of a known node.
    pub fn set_state(&mut self, id: &Handle, state: NodeState) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.state = state;
        }
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    // ---------------------------------------------------------------
    // Traversal
    // ---------------------------------------------------------------

    /// Depth-first notification order for everything downstream of `start`.
    ///
    /// Each transitive dependent appears exactly once, in the order it
    /// should be rebuilt. `start` itself is excluded. Shared dependents
    /// (diamonds) are visited on the first path that reaches them, and a
    /// cyclic graph terminates because visited nodes are never re-entered.
    ///
    /// The walk keeps its own stack, so chain depth is bounded by memory,
    /// not the thread stack.
    pub fn propagation_order(&self, start: &Handle) -> Vec<Handle> {
        let mut visited = HashSet::new();
        visited.insert(start.clone());
        let mut order = Vec::new();
        let Some(node) = self.nodes.get(start) else {
            return order;
        };
        // Dependents go on in reverse so the smallest handle pops first.
        // Visited is checked at pop time: a node discovered early but
        // reached again on a deeper path keeps its deeper position.
        let mut stack: Vec<&Handle> = node.dependents.iter().rev().collect();
        while let Some(id) = stack.pop() {
            if !visited.insert(id.clone()) {
                continue;
            }
            order.push(id.clone());
            if let Some(node) = self.nodes.get(id) {
                for dependent in node.dependents.iter().rev() {
                    if !visited.contains(dependent) {
                        stack.push(dependent);
                    }
                }
            }
        }
        order
    }

    // ---------------------------------------------------------------
    // Integrity and persistence
    // ---------------------------------------------------------------

    /// Check that every edge has its mirror image.
    pub fn validate(&self) -> GraphResult<()> {
        for node in self.nodes.values() {
            for precedent in &node.precedents {
                let mirrored = self
                    .nodes
                    .get(precedent)
                    .is_some_and(|p| p.dependents.contains(&node.id));
                if !mirrored {
                    return Err(GraphError::MissingInverse {
                        node: node.id.clone(),
                        precedent: precedent.clone(),
                    });
                }
            }
            for dependent in &node.dependents {
                let mirrored = self
                    .nodes
                    .get(dependent)
                    .is_some_and(|d| d.precedents.contains(&node.id));
                if !mirrored {
                    return Err(GraphError::StaleDependent {
                        node: node.id.clone(),
                        dependent: dependent.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> GraphResult<Vec<u8>> {
        bincode::serialize(self).map_err(|e| GraphError::Serialization(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> GraphResult<Self> {
        bincode::deserialize(bytes).map_err(|e| GraphError::Serialization(e.to_string()))
    }
}
