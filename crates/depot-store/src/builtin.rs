//! Built-in object classes.
//!
//! Two classes ship with the repository and are always recreatable from a
//! snapshot: [`Group`], a named collection of other objects' handles, and
//! [`Range`], a rectangular grid of floats. Groups participate in precedent
//! expansion (a group handle stands for its members); ranges are leaves.

use std::sync::Arc;

use depot_types::{Handle, PropertyValue};
use depot_values::ValueObject;

use crate::error::StoreResult;
use crate::object::{type_mismatch, FromObject, ManagedObject, ObjectRef};
use crate::repository::Precedents;

pub const GROUP_CLASS: &str = "Group";
pub const GROUP_MEMBERS_PROPERTY: &str = "Members";
pub const RANGE_CLASS: &str = "Range";
pub const RANGE_VALUES_PROPERTY: &str = "Values";

/// A named collection of object handles.
///
/// Member handles land in the group's system properties, so a stored group
/// observes its members and is renotified when any of them changes.
#[derive(Clone, Debug)]
pub struct Group {
    value_object: ValueObject,
    members: Vec<Handle>,
}

impl Group {
    pub fn new(object_id: impl Into<String>, members: Vec<Handle>) -> Self {
        let member_ids: Vec<String> = members
            .iter()
            .map(|handle| handle.as_str().to_string())
            .collect();
        let value_object = ValueObject::new(object_id, GROUP_CLASS, false)
            .with_property(GROUP_MEMBERS_PROPERTY, member_ids);
        Self {
            value_object,
            members,
        }
    }

    /// Recreate a group from its snapshot.
    pub fn from_value_object(value_object: &ValueObject) -> StoreResult<Self> {
        let members = value_object
            .get_property(GROUP_MEMBERS_PROPERTY)?
            .as_string_list()?
            .into_iter()
            .map(Handle::new)
            .collect();
        Ok(Self {
            value_object: value_object.clone(),
            members,
        })
    }

    pub fn members(&self) -> &[Handle] {
        &self.members
    }
}

impl ManagedObject for Group {
    fn value_object(&self) -> &ValueObject {
        &self.value_object
    }

    fn rebuild(
        &self,
        value_object: &ValueObject,
        _precedents: &Precedents<'_>,
    ) -> StoreResult<ObjectRef> {
        Ok(Arc::new(Self::from_value_object(value_object)?))
    }

    fn member_handles(&self) -> Option<&[Handle]> {
        Some(&self.members)
    }
}

impl FromObject for Group {
    fn from_object(object: &ObjectRef) -> StoreResult<Self> {
        let Some(members) = object.member_handles() else {
            return Err(type_mismatch(object, "a group"));
        };
        Ok(Self {
            value_object: object.value_object().clone(),
            members: members.to_vec(),
        })
    }
}

/// A rectangular grid of floats.
#[derive(Clone, Debug)]
pub struct Range {
    value_object: ValueObject,
    values: Vec<Vec<f64>>,
}

impl Range {
    /// Build a range, rejecting ragged input.
    pub fn new(object_id: impl Into<String>, values: Vec<Vec<f64>>) -> StoreResult<Self> {
        let cells = PropertyValue::float_matrix(values.clone())?;
        let value_object = ValueObject::new(object_id, RANGE_CLASS, false)
            .with_property(RANGE_VALUES_PROPERTY, cells);
        Ok(Self {
            value_object,
            values,
        })
    }

    /// Recreate a range from its snapshot.
    pub fn from_value_object(value_object: &ValueObject) -> StoreResult<Self> {
        let values = value_object
            .get_property(RANGE_VALUES_PROPERTY)?
            .as_float_matrix()?;
        Ok(Self {
            value_object: value_object.clone(),
            values,
        })
    }

    pub fn values(&self) -> &[Vec<f64>] {
        &self.values
    }
}

impl ManagedObject for Range {
    fn value_object(&self) -> &ValueObject {
        &self.value_object
    }

    fn rebuild(
        &self,
        value_object: &ValueObject,
        _precedents: &Precedents<'_>,
    ) -> StoreResult<ObjectRef> {
        Ok(Arc::new(Self::from_value_object(value_object)?))
    }

    fn matrix_values(&self) -> Option<&[Vec<f64>]> {
        Some(&self.values)
    }
}

impl FromObject for Range {
    fn from_object(object: &ObjectRef) -> StoreResult<Self> {
        let Some(values) = object.matrix_values() else {
            return Err(type_mismatch(object, "a range"));
        };
        Ok(Self {
            value_object: object.value_object().clone(),
            values: values.to_vec(),
        })
    }
}
