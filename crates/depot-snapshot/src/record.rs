//! The wire shape of one saved object.

use std::collections::BTreeMap;

use depot_types::PropertyValue;
use depot_values::ValueObject;
use serde::{Deserialize, Serialize};

/// One object as it appears in a records file.
///
/// Only the snapshot travels: identity, class, permanence, and properties.
/// Timestamps, update counts, and graph edges are repository state and are
/// reconstructed on load.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObjectRecord {
    pub object_id: String,
    pub class_name: String,
    #[serde(default)]
    pub permanent: bool,
    #[serde(default)]
    pub system_properties: Vec<(String, PropertyValue)>,
    #[serde(default)]
    pub user_properties: BTreeMap<String, PropertyValue>,
}

impl ObjectRecord {
    pub fn from_value_object(vo: &ValueObject) -> Self {
        Self {
            object_id: vo.object_id().to_string(),
            class_name: vo.class_name().to_string(),
            permanent: vo.is_permanent(),
            system_properties: vo.system_properties().to_vec(),
            user_properties: vo.user_properties().clone(),
        }
    }

    /// Rehydrate the snapshot, rescanning precedent handles.
    pub fn into_value_object(self) -> ValueObject {
        ValueObject::from_parts(
            self.object_id,
            self.class_name,
            self.permanent,
            self.system_properties,
            self.user_properties,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depot_types::Handle;

    #[test]
    fn snapshot_survives_the_record_round_trip() {
        let mut vo = ValueObject::new("EurCurve", "Curve", true)
            .with_property("Quotes", vec!["Q1".to_string(), "Q2".to_string()]);
        vo.set_property("Note", "bootstrapped").unwrap();

        let record = ObjectRecord::from_value_object(&vo);
        let restored = record.into_value_object();

        assert_eq!(restored.object_id(), "EurCurve");
        assert_eq!(restored.class_name(), "Curve");
        assert!(restored.is_permanent());
        assert_eq!(
            restored.get_property("Quotes").unwrap(),
            vo.get_property("Quotes").unwrap()
        );
        assert_eq!(
            restored.get_property("Note").unwrap(),
            PropertyValue::from("bootstrapped")
        );
        assert!(restored.precedent_ids().contains(&Handle::new("q1")));
    }

    #[test]
    fn minimal_records_deserialize_with_defaults() {
        let record: ObjectRecord =
            serde_json::from_str(r#"{ "object_id": "X", "class_name": "Widget" }"#).unwrap();
        assert!(!record.permanent);
        assert!(record.system_properties.is_empty());
        assert!(record.user_properties.is_empty());
    }
}
