//! Value object snapshots.
//!
//! A [`ValueObject`] is the serializable record of how an object was built:
//! its identifier, its class, its permanence flag, and every constructor
//! argument by name. The live object it describes may hold caches, file
//! handles, or other unserializable state; the value object holds none of
//! that, which is what makes save and reload possible.
//!
//! # Invariants
//!
//! - `precedent_ids` always reflects the current system properties. Every
//!   mutation that can change a system property rescans.
//! - Property name matching is case-insensitive for system and pseudo
//!   properties. User properties keep and match their exact spelling.
//! - Empty strings and numeric literals never count as precedent handles.

use std::collections::{BTreeMap, BTreeSet};

use depot_types::{is_numeric_literal, Handle, PropertyValue};
use tracing::debug;

use crate::error::{ValueError, ValueResult};

/// Pseudo property exposing the object identifier.
pub const PROP_OBJECT_ID: &str = "ObjectId";
/// Pseudo property exposing the class name.
pub const PROP_CLASS_NAME: &str = "ClassName";
/// Pseudo property exposing the permanence flag.
pub const PROP_PERMANENT: &str = "Permanent";

/// Serializable description of a stored object.
#[derive(Clone, Debug)]
pub struct ValueObject {
    object_id: String,
    class_name: String,
    permanent: bool,
    system_properties: Vec<(String, PropertyValue)>,
    user_properties: BTreeMap<String, PropertyValue>,
    precedent_ids: BTreeSet<Handle>,
}

impl ValueObject {
    /// Start a snapshot with no properties.
    pub fn new(
        object_id: impl Into<String>,
        class_name: impl Into<String>,
        permanent: bool,
    ) -> Self {
        Self {
            object_id: object_id.into(),
            class_name: class_name.into(),
            permanent,
            system_properties: Vec::new(),
            user_properties: BTreeMap::new(),
            precedent_ids: BTreeSet::new(),
        }
    }

    /// Add or replace a system (constructor) property, builder style.
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        let name = name.into();
        let value = value.into();
        match self
            .system_properties
            .iter_mut()
            .find(|(existing, _)| name_matches(existing, &name))
        {
            Some(slot) => slot.1 = value,
            None => self.system_properties.push((name, value)),
        }
        self.refresh_precedents();
        self
    }

    /// Rebuild a snapshot from its stored pieces, rescanning precedents.
    pub fn from_parts(
        object_id: impl Into<String>,
        class_name: impl Into<String>,
        permanent: bool,
        system_properties: Vec<(String, PropertyValue)>,
        user_properties: BTreeMap<String, PropertyValue>,
    ) -> Self {
        let mut vo = Self {
            object_id: object_id.into(),
            class_name: class_name.into(),
            permanent,
            system_properties,
            user_properties,
            precedent_ids: BTreeSet::new(),
        };
        vo.refresh_precedents();
        vo
    }

    // ---------------------------------------------------------------
    // Accessors
    // ---------------------------------------------------------------

    pub fn object_id(&self) -> &str {
        &self.object_id
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn is_permanent(&self) -> bool {
        self.permanent
    }

    /// The object identifier as a [`Handle`].
    pub fn handle(&self) -> Handle {
        Handle::new(self.object_id.clone())
    }

    /// Constructor properties in insertion order.
    pub fn system_properties(&self) -> &[(String, PropertyValue)] {
        &self.system_properties
    }

    /// Post-construction annotations, sorted by name.
    pub fn user_properties(&self) -> &BTreeMap<String, PropertyValue> {
        &self.user_properties
    }

    /// Handles of the objects this snapshot was built from.
    pub fn precedent_ids(&self) -> &BTreeSet<Handle> {
        &self.precedent_ids
    }

    // ---------------------------------------------------------------
    // Property interrogation
    // ---------------------------------------------------------------

    /// Look up a property by name.
    ///
    /// User properties match by exact spelling; the pseudo properties
    /// (`ObjectId`, `ClassName`, `Permanent`) and system properties match
    /// case-insensitively.
    pub fn get_property(&self, name: &str) -> ValueResult<PropertyValue> {
        if let Some(value) = self.user_properties.get(name) {
            return Ok(value.clone());
        }
        if name_matches(name, PROP_OBJECT_ID) {
            return Ok(PropertyValue::from(self.object_id.clone()));
        }
        if name_matches(name, PROP_CLASS_NAME) {
            return Ok(PropertyValue::from(self.class_name.clone()));
        }
        if name_matches(name, PROP_PERMANENT) {
            return Ok(PropertyValue::from(self.permanent));
        }
        if let Some((_, value)) = self
            .system_properties
            .iter()
            .find(|(existing, _)| name_matches(existing, name))
        {
            return Ok(value.clone());
        }
        Err(ValueError::UnknownProperty {
            object_id: self.object_id.clone(),
            name: name.to_string(),
        })
    }

    /// Returns `true` if [`get_property`](Self::get_property) would succeed.
    pub fn has_property(&self, name: &str) -> bool {
        self.get_property(name).is_ok()
    }

    /// Every retrievable property name: pseudo, system, then user.
    pub fn property_names(&self) -> Vec<String> {
        let mut names = vec![
            PROP_OBJECT_ID.to_string(),
            PROP_CLASS_NAME.to_string(),
            PROP_PERMANENT.to_string(),
        ];
        names.extend(self.system_properties.iter().map(|(name, _)| name.clone()));
        names.extend(self.user_properties.keys().cloned());
        names
    }

    /// Set a property by name.
    ///
    /// The pseudo properties mutate the corresponding field and require a
    /// value of the matching shape. A name matching an existing system
    /// property updates it in place. Any other name becomes a user property
    /// under its exact spelling.
    pub fn set_property(
        &mut self,
        name: &str,
        value: impl Into<PropertyValue>,
    ) -> ValueResult<()> {
        let value = value.into();
        if name_matches(name, PROP_OBJECT_ID) {
            self.object_id = value.as_str()?.to_string();
        } else if name_matches(name, PROP_CLASS_NAME) {
            self.class_name = value.as_str()?.to_string();
        } else if name_matches(name, PROP_PERMANENT) {
            self.permanent = value.as_bool()?;
        } else if let Some(slot) = self
            .system_properties
            .iter_mut()
            .find(|(existing, _)| name_matches(existing, name))
        {
            slot.1 = value;
            self.refresh_precedents();
        } else {
            self.user_properties.insert(name.to_string(), value);
        }
        debug!(object = %self.object_id, property = name, "set value object property");
        Ok(())
    }

    fn refresh_precedents(&mut self) {
        let mut found = BTreeSet::new();
        for (_, value) in &self.system_properties {
            collect_handles(value, &mut found);
        }
        self.precedent_ids = found;
    }
}

/// Pull every handle-shaped string out of `value`, recursively.
fn collect_handles(value: &PropertyValue, found: &mut BTreeSet<Handle>) {
    match value {
        PropertyValue::Str(s) if !s.is_empty() && !is_numeric_literal(s) => {
            found.insert(Handle::new(s.clone()));
        }
        PropertyValue::List(items) => {
            for item in items {
                collect_handles(item, found);
            }
        }
        PropertyValue::Matrix(rows) => {
            for row in rows {
                for cell in row {
                    collect_handles(cell, found);
                }
            }
        }
        _ => {}
    }
}

fn name_matches(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curve() -> ValueObject {
        ValueObject::new("EurCurve", "Curve", false)
            .with_property("Quotes", vec!["Quote1".to_string(), "Quote2".to_string()])
            .with_property("Spread", 0.25)
    }

    // ----------------------------------------------------------
    // Pseudo and system properties
    // ----------------------------------------------------------

    #[test]
    fn pseudo_properties_reflect_identity() {
        let vo = curve();
        assert_eq!(
            vo.get_property("ObjectId").unwrap(),
            PropertyValue::from("EurCurve")
        );
        assert_eq!(
            vo.get_property("classname").unwrap(),
            PropertyValue::from("Curve")
        );
        assert_eq!(
            vo.get_property("PERMANENT").unwrap(),
            PropertyValue::Bool(false)
        );
    }

    #[test]
    fn system_properties_match_case_insensitively() {
        let vo = curve();
        assert_eq!(vo.get_property("spread").unwrap(), PropertyValue::Float(0.25));
        assert_eq!(vo.get_property("SPREAD").unwrap(), PropertyValue::Float(0.25));
    }

    #[test]
    fn unknown_property_is_an_error() {
        let vo = curve();
        let err = vo.get_property("Volatility").unwrap_err();
        assert_eq!(
            err,
            ValueError::UnknownProperty {
                object_id: "EurCurve".into(),
                name: "Volatility".into(),
            }
        );
        assert!(!vo.has_property("Volatility"));
        assert!(vo.has_property("Spread"));
    }

    #[test]
    fn with_property_replaces_case_insensitively() {
        let vo = curve().with_property("SPREAD", 0.5);
        assert_eq!(vo.get_property("Spread").unwrap(), PropertyValue::Float(0.5));
        assert_eq!(vo.system_properties().len(), 2);
    }

    #[test]
    fn property_names_cover_all_layers() {
        let mut vo = curve();
        vo.set_property("Note", "checked").unwrap();
        let names = vo.property_names();
        assert_eq!(
            names,
            vec!["ObjectId", "ClassName", "Permanent", "Quotes", "Spread", "Note"]
        );
    }

    // ----------------------------------------------------------
    // Mutation
    // ----------------------------------------------------------

    #[test]
    fn set_property_updates_pseudo_fields() {
        let mut vo = curve();
        vo.set_property("objectid", "UsdCurve").unwrap();
        vo.set_property("Permanent", true).unwrap();
        assert_eq!(vo.object_id(), "UsdCurve");
        assert!(vo.is_permanent());
        assert_eq!(vo.handle(), Handle::new("usdcurve"));
    }

    #[test]
    fn set_property_rejects_wrong_shapes_for_pseudo_fields() {
        let mut vo = curve();
        assert!(vo.set_property("ObjectId", 42i64).is_err());
        assert!(vo.set_property("Permanent", "yes").is_err());
        // Nothing changed.
        assert_eq!(vo.object_id(), "EurCurve");
        assert!(!vo.is_permanent());
    }

    #[test]
    fn set_property_creates_user_properties_with_exact_spelling() {
        let mut vo = curve();
        vo.set_property("Total", 12.5).unwrap();
        assert_eq!(vo.get_property("Total").unwrap(), PropertyValue::Float(12.5));
        // User properties do not fold case.
        assert!(vo.get_property("total").is_err());
    }

    // ----------------------------------------------------------
    // Precedent extraction
    // ----------------------------------------------------------

    #[test]
    fn precedents_come_from_system_strings() {
        let vo = curve();
        let expected: Vec<Handle> = vec![Handle::new("Quote1"), Handle::new("Quote2")];
        let got: Vec<Handle> = vo.precedent_ids().iter().cloned().collect();
        assert_eq!(got, expected);
    }

    #[test]
    fn numeric_and_empty_strings_are_not_precedents() {
        let vo = ValueObject::new("x", "Widget", false)
            .with_property("Label", "")
            .with_property("Rate", "3.5")
            .with_property("Source", "Feed1");
        let got: Vec<Handle> = vo.precedent_ids().iter().cloned().collect();
        assert_eq!(got, vec![Handle::new("Feed1")]);
    }

    #[test]
    fn non_finite_float_spellings_still_count_as_handles() {
        let vo = ValueObject::new("x", "Widget", false)
            .with_property("First", "inf")
            .with_property("Second", "NaN");
        let got: Vec<Handle> = vo.precedent_ids().iter().cloned().collect();
        assert_eq!(got, vec![Handle::new("inf"), Handle::new("NaN")]);
    }

    #[test]
    fn user_properties_never_contribute_precedents() {
        let mut vo = ValueObject::new("x", "Widget", false);
        vo.set_property("Comment", "LooksLikeAHandle").unwrap();
        assert!(vo.precedent_ids().is_empty());
    }

    #[test]
    fn precedents_found_inside_matrices() {
        let cells = PropertyValue::matrix(vec![
            vec![PropertyValue::from("Leg1"), PropertyValue::from("1.5")],
            vec![PropertyValue::from("Leg2"), PropertyValue::Empty],
        ])
        .unwrap();
        let vo = ValueObject::new("Swap", "Swap", false).with_property("Legs", cells);
        let got: Vec<Handle> = vo.precedent_ids().iter().cloned().collect();
        assert_eq!(got, vec![Handle::new("Leg1"), Handle::new("Leg2")]);
    }

    #[test]
    fn updating_a_system_property_rescans_precedents() {
        let mut vo = ValueObject::new("B", "Widget", false).with_property("Source", "A");
        assert!(vo.precedent_ids().contains(&Handle::new("a")));
        vo.set_property("Source", "C").unwrap();
        let got: Vec<Handle> = vo.precedent_ids().iter().cloned().collect();
        assert_eq!(got, vec![Handle::new("C")]);
    }

    #[test]
    fn from_parts_rescans_precedents() {
        let vo = ValueObject::from_parts(
            "B",
            "Widget",
            true,
            vec![("Source".to_string(), PropertyValue::from("A"))],
            BTreeMap::new(),
        );
        assert!(vo.is_permanent());
        assert!(vo.precedent_ids().contains(&Handle::new("A")));
    }

    #[test]
    fn duplicate_spellings_collapse_to_one_precedent() {
        let vo = ValueObject::new("x", "Widget", false)
            .with_property("First", "feed1")
            .with_property("Second", "FEED1");
        assert_eq!(vo.precedent_ids().len(), 1);
    }
}
