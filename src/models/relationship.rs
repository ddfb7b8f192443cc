//! Relationship entities.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use crate::error::AppError;
use crate::models::field::{EntityKind, ModelSchema};
use crate::models::instance::{ModelInstance, PropertyMap};
use crate::models::node::NodeModel;

/// A relationship instance between two nodes.
///
/// The endpoints are shared, never mutated: `start` always owns the
/// outgoing arrow.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipModel {
    instance: ModelInstance,
    start: Arc<NodeModel>,
    end: Arc<NodeModel>,
}

impl RelationshipModel {
    pub fn new(
        schema: &'static ModelSchema,
        start: Arc<NodeModel>,
        end: Arc<NodeModel>,
        props: &PropertyMap,
    ) -> Result<Self, AppError> {
        if schema.kind() != EntityKind::Relationship {
            return Err(AppError::Configuration(format!(
                "{} is not a relationship type",
                schema.label()
            )));
        }
        Ok(Self {
            instance: ModelInstance::from_properties(schema, props)?,
            start,
            end,
        })
    }

    /// A new relationship between the same endpoints built from `props`.
    pub fn with_properties(&self, props: &PropertyMap) -> Result<Self, AppError> {
        Self::new(
            self.schema(),
            Arc::clone(&self.start),
            Arc::clone(&self.end),
            props,
        )
    }

    pub fn instance(&self) -> &ModelInstance {
        &self.instance
    }

    pub fn start_node(&self) -> &NodeModel {
        &self.start
    }

    pub fn end_node(&self) -> &NodeModel {
        &self.end
    }
}

impl Deref for RelationshipModel {
    type Target = ModelInstance;

    fn deref(&self) -> &Self::Target {
        &self.instance
    }
}

impl DerefMut for RelationshipModel {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.instance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::field::FieldSchema;
    use once_cell::sync::Lazy;
    use serde_json::json;

    static CITY: Lazy<ModelSchema> =
        Lazy::new(|| ModelSchema::node("City").field(FieldSchema::string("name").primary()));

    static ROAD: Lazy<ModelSchema> = Lazy::new(|| {
        ModelSchema::relationship("ROAD")
            .unique()
            .field(FieldSchema::integer("km"))
    });

    fn city(name: &str) -> Arc<NodeModel> {
        let mut props = PropertyMap::new();
        props.insert("name".to_string(), json!(name));
        Arc::new(NodeModel::new(&CITY, &props).unwrap())
    }

    fn km(value: i64) -> PropertyMap {
        let mut props = PropertyMap::new();
        props.insert("km".to_string(), json!(value));
        props
    }

    #[test]
    fn test_with_properties_keeps_endpoints() {
        let road = RelationshipModel::new(&ROAD, city("Oslo"), city("Bergen"), &km(460)).unwrap();
        let updated = road.with_properties(&km(463)).unwrap();

        assert_eq!(updated.get_i64("km"), Some(463));
        assert_eq!(road.get_i64("km"), Some(460));
        assert!(Arc::ptr_eq(&road.start, &updated.start));
        assert_eq!(updated.end_node().get_str("name"), Some("Bergen"));
    }

    #[test]
    fn test_unique_flag_in_property_info() {
        let road = RelationshipModel::new(&ROAD, city("A"), city("B"), &km(1)).unwrap();
        let info = road.property_info();

        assert!(info.unique);
        assert_eq!(info.primary, None);
    }

    #[test]
    fn test_node_schema_is_rejected() {
        assert!(RelationshipModel::new(&CITY, city("A"), city("B"), &PropertyMap::new()).is_err());
    }
}
