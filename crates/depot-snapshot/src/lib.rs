//! Serialization for the depot object repository.
//!
//! Snapshots travel as JSON arrays of object records. Saving pulls the
//! records straight from stored snapshots; loading replays them through the
//! ordinary store path so dependencies rewire and dependents renotify as if
//! each object had been stored by hand.
//!
//! # Key Types
//!
//! - [`SerializationFactory`]: class creator registry plus the save/load
//!   front ends (writer/string/file/directory).
//! - [`ObjectRecord`]: the wire shape of one object.
//! - [`LoadReport`]: what landed and what was skipped, per record.
//! - [`SnapshotError`]: save and load failures.

pub mod error;
pub mod factory;
pub mod record;

pub use error::{SnapshotError, SnapshotResult};
pub use factory::{Creator, LoadReport, RecordFailure, SerializationFactory};
pub use record::ObjectRecord;
