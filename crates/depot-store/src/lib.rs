//! The depot object repository.
//!
//! Objects go in under case-insensitive handles; the repository remembers
//! how each was built, wires an observer graph from that record, and
//! rebuilds dependents depth-first whenever a precedent is overwritten.
//!
//! # Key Types
//!
//! - [`Repository`]: the store itself, safe to share across threads.
//! - [`ManagedObject`] / [`ObjectRef`]: what a stored object must provide.
//! - [`Group`] and [`Range`]: the built-in classes.
//! - [`StoreError`]: everything that can go wrong, one enum.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use depot_store::{Range, Repository};
//!
//! let repo = Repository::new();
//! let grid = Range::new("Grid", vec![vec![1.0, 2.0]])?;
//! repo.store("Grid", Arc::new(grid))?;
//!
//! let fetched: Range = repo.retrieve_as("GRID")?;
//! assert_eq!(fetched.values(), &[vec![1.0, 2.0]]);
//! # Ok::<(), depot_store::StoreError>(())
//! ```

pub mod builtin;
pub mod entry;
pub mod error;
pub mod object;
pub mod repository;

pub use builtin::{
    Group, Range, GROUP_CLASS, GROUP_MEMBERS_PROPERTY, RANGE_CLASS, RANGE_VALUES_PROPERTY,
};
pub use entry::RepositoryEntry;
pub use error::{StoreError, StoreResult};
pub use object::{FromObject, ManagedObject, ObjectRef};
pub use repository::{Precedents, Repository, MAX_EXPANSION_DEPTH};
