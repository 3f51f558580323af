//! Value object snapshots for the depot object repository.
//!
//! A value object records everything needed to rebuild a stored object:
//! identifier, class name, permanence, and the full set of named
//! constructor arguments. It is also where precedent handles are mined
//! from, which makes it the sole input to dependency wiring.
//!
//! # Key Types
//!
//! - [`ValueObject`]: the snapshot itself.
//! - [`ValueError`]: property lookup and coercion failures.

pub mod error;
pub mod value_object;

pub use error::{ValueError, ValueResult};
pub use value_object::{
    ValueObject, PROP_CLASS_NAME, PROP_OBJECT_ID, PROP_PERMANENT,
};
