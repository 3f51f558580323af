//! The trait a type implements to live in the repository.

use std::sync::Arc;

use depot_types::Handle;
use depot_values::ValueObject;

use crate::error::{StoreError, StoreResult};
use crate::repository::Precedents;

/// Shared, immutable reference to a stored object.
pub type ObjectRef = Arc<dyn ManagedObject>;

/// A live object the repository can store, interrogate, and rebuild.
///
/// Implementations are immutable once constructed. Change flows through the
/// repository: overwriting a precedent triggers [`rebuild`](Self::rebuild)
/// on every dependent, which returns a fresh instance derived from the
/// object's own value object and the current precedent objects.
///
/// The two `Option` methods are capabilities. Typed retrieval asks for a
/// capability, never for a concrete Rust type, so any implementation that
/// exposes member handles can be retrieved as a group, whatever its class.
pub trait ManagedObject: Send + Sync {
    /// The class this object was registered under.
    fn class_name(&self) -> &str {
        self.value_object().class_name()
    }

    /// The snapshot this object was built from.
    fn value_object(&self) -> &ValueObject;

    /// Construct a replacement for this object after a precedent changed.
    fn rebuild(
        &self,
        value_object: &ValueObject,
        precedents: &Precedents<'_>,
    ) -> StoreResult<ObjectRef>;

    /// Member handles, for objects that act as containers of other objects.
    fn member_handles(&self) -> Option<&[Handle]> {
        None
    }

    /// Numeric grid contents, for objects that act as value ranges.
    fn matrix_values(&self) -> Option<&[Vec<f64>]> {
        None
    }
}

/// Conversion from a stored object into a typed view.
///
/// Implementations check a capability on the object and build the typed
/// value from it, reporting [`StoreError::TypeMismatch`] when the
/// capability is absent.
pub trait FromObject: Sized {
    fn from_object(object: &ObjectRef) -> StoreResult<Self>;
}

pub(crate) fn type_mismatch(object: &ObjectRef, wanted: &'static str) -> StoreError {
    StoreError::TypeMismatch {
        handle: object.value_object().object_id().to_string(),
        wanted,
        found: object.class_name().to_string(),
    }
}
