//! Entities and the property API they expose

use crate::error::Result;
use crate::tree::{PropertyTree, SystemValues};
use crate::types::{EntityId, PropertyPath, PropertyValue, SystemName};
use serde::{Deserialize, Serialize};

/// A modeled object (resource, deployment, ...) with per-system properties
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    #[serde(rename = "type")]
    pub entity_type: String,
    pub name: String,
    #[serde(default)]
    pub properties: PropertyTree,
}

impl Entity {
    pub fn new(id: impl Into<EntityId>, entity_type: &str, name: &str) -> Self {
        Self {
            id: id.into(),
            entity_type: entity_type.to_string(),
            name: name.to_string(),
            properties: PropertyTree::new(),
        }
    }

    /// Builder-style baseline property setter
    pub fn with_property(mut self, path: PropertyPath, value: impl Into<PropertyValue>) -> Self {
        self.properties
            .set(path, value.into(), SystemName::baseline());
        self
    }

    pub fn get_property(&self, path: &PropertyPath, system: &SystemName) -> Option<&PropertyValue> {
        self.properties.get(path, system)
    }

    pub fn resolve_property(&self, path: &PropertyPath, system: &SystemName) -> Result<&PropertyValue> {
        self.properties.resolve(path, system)
    }

    pub fn set_property(&mut self, path: PropertyPath, value: PropertyValue, system: SystemName) {
        self.properties.set(path, value, system);
    }

    pub fn get_property_for_all_systems(&self, path: &PropertyPath) -> SystemValues {
        self.properties.get_for_all_systems(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_json_shape() {
        let entity = Entity::new("e1", "k8sNamespace", "prod")
            .with_property("metadata.name".parse().unwrap(), "prod");
        let json = serde_json::to_value(&entity).unwrap();
        assert_eq!(json["type"], "k8sNamespace");
        assert_eq!(json["properties"]["metadata.name"]["baseline"], "prod");

        let back: Entity = serde_json::from_value(json).unwrap();
        assert_eq!(back, entity);
    }

    #[test]
    fn test_properties_default_when_missing() {
        let entity: Entity =
            serde_json::from_str(r#"{"id": "e2", "type": "dockerImage", "name": "web"}"#).unwrap();
        assert!(entity.properties.is_empty());
    }
}
