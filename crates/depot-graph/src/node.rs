use std::collections::BTreeSet;
use std::fmt;

use depot_types::Handle;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a graph node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeState {
    /// Referenced by someone else's edge but not backed by a live object.
    #[default]
    Detached,
    /// Backed by a live repository entry.
    Wired,
    /// Being rebuilt during change propagation.
    Notifying,
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Detached => "detached",
            Self::Wired => "wired",
            Self::Notifying => "notifying",
        };
        f.write_str(label)
    }
}

/// One object's edges in the dependency graph.
///
/// `precedents` are the objects this one was built from; `dependents` are
/// the objects built from this one. The graph keeps the two directions
/// mirror images of each other.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DependencyNode {
    pub id: Handle,
    pub precedents: BTreeSet<Handle>,
    pub dependents: BTreeSet<Handle>,
    pub state: NodeState,
}

impl DependencyNode {
    /// A placeholder node carrying no edges of its own.
    pub fn detached(id: Handle) -> Self {
        Self {
            id,
            precedents: BTreeSet::new(),
            dependents: BTreeSet::new(),
            state: NodeState::Detached,
        }
    }

    /// Returns `true` while any edge in either direction remains.
    pub fn has_edges(&self) -> bool {
        !self.precedents.is_empty() || !self.dependents.is_empty()
    }
}
