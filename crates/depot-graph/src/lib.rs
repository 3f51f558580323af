//! Observer dependency graph for the depot object repository.
//!
//! Tracks which objects were built from which, in both directions, and
//! answers the one question change propagation needs: given that this
//! object changed, who must be rebuilt, in what order, each exactly once.
//!
//! # Key Types
//!
//! - [`DependencyGraph`]: the mirrored edge store with wiring, detachment,
//!   and depth-first propagation ordering.
//! - [`DependencyNode`]: one handle's edges plus its lifecycle state.
//! - [`GraphError`]: self-observation and integrity failures.

pub mod error;
pub mod graph;
pub mod node;

pub use error::{GraphError, GraphResult};
pub use graph::DependencyGraph;
pub use node::{DependencyNode, NodeState};
