//! One stored object together with its bookkeeping.

use std::fmt;

use depot_types::Timestamp;
use depot_values::ValueObject;

use crate::object::ObjectRef;

/// A repository slot: the live object, its snapshot, and its history.
///
/// The snapshot kept here always describes the object currently in the
/// slot. Every replacement path resynchronizes the two.
pub struct RepositoryEntry {
    object: ObjectRef,
    value_object: ValueObject,
    created_at: Timestamp,
    updated_at: Timestamp,
    update_count: u64,
    permanent: bool,
}

impl RepositoryEntry {
    pub(crate) fn new(object: ObjectRef, value_object: ValueObject) -> Self {
        let now = Timestamp::now();
        let permanent = value_object.is_permanent();
        Self {
            object,
            value_object,
            created_at: now,
            updated_at: now,
            update_count: 0,
            permanent,
        }
    }

    pub fn object(&self) -> &ObjectRef {
        &self.object
    }

    pub fn value_object(&self) -> &ValueObject {
        &self.value_object
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    /// How many times this slot has been overwritten or rebuilt.
    pub fn update_count(&self) -> u64 {
        self.update_count
    }

    pub fn is_permanent(&self) -> bool {
        self.permanent
    }

    /// Overwrite the slot with a caller-provided object and snapshot.
    ///
    /// The creation stamp survives; the update stamp and count move.
    pub(crate) fn replace(&mut self, object: ObjectRef, value_object: ValueObject) {
        self.permanent = value_object.is_permanent();
        self.object = object;
        self.value_object = value_object;
        self.updated_at = Timestamp::now();
        self.update_count += 1;
    }

    /// Install a rebuilt object, taking the snapshot from the object itself.
    pub(crate) fn replace_object(&mut self, object: ObjectRef) {
        let value_object = object.value_object().clone();
        self.replace(object, value_object);
    }

    /// Swap in an edited snapshot without touching stamps or count.
    pub(crate) fn set_value_object(&mut self, value_object: ValueObject) {
        self.permanent = value_object.is_permanent();
        self.value_object = value_object;
    }
}

impl fmt::Debug for RepositoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepositoryEntry")
            .field("object_id", &self.value_object.object_id())
            .field("class_name", &self.value_object.class_name())
            .field("update_count", &self.update_count)
            .field("permanent", &self.permanent)
            .finish_non_exhaustive()
    }
}
