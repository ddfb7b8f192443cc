//! Node entities.

use std::collections::HashMap;
use std::ops::{Deref, DerefMut};

use serde_json::Value as JsonValue;

use crate::error::AppError;
use crate::models::field::{EntityKind, FieldKind, FieldSchema, ModelSchema};
use crate::models::instance::{ModelInstance, PropertyMap};
use crate::models::relationship::RelationshipModel;

/// A node instance with lazily loaded relations.
///
/// Field access goes through [`ModelInstance`] via `Deref`.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeModel {
    instance: ModelInstance,
    relations: HashMap<String, Vec<RelationshipModel>>,
}

impl NodeModel {
    pub fn new(schema: &'static ModelSchema, props: &PropertyMap) -> Result<Self, AppError> {
        if schema.kind() != EntityKind::Node {
            return Err(AppError::Configuration(format!(
                "{} is not a node type",
                schema.label()
            )));
        }
        Ok(Self {
            instance: ModelInstance::from_properties(schema, props)?,
            relations: HashMap::new(),
        })
    }

    /// A new node of the same type built from `props`.
    pub fn with_properties(&self, props: &PropertyMap) -> Result<Self, AppError> {
        Self::new(self.schema(), props)
    }

    pub fn instance(&self) -> &ModelInstance {
        &self.instance
    }

    /// Primary field name and value, when both exist.
    pub fn primary_key(&self) -> Option<(&'static str, &JsonValue)> {
        let field = self.schema().primary_field()?;
        let value = self.get(field.name())?;
        Some((field.name(), value))
    }

    /// Like [`primary_key`](Self::primary_key), but says what is missing.
    pub fn require_primary_key(&self) -> Result<(&'static str, &JsonValue), AppError> {
        let schema = self.schema();
        let Some(field) = schema.primary_field() else {
            return Err(AppError::Configuration(format!(
                "{} declares no primary field",
                schema.label()
            )));
        };
        let value = self.get(field.name()).ok_or_else(|| AppError::MissingField {
            entity: schema.label().to_string(),
            field: field.name().to_string(),
        })?;
        Ok((field.name(), value))
    }

    /// Primary field and the value the stored node is matched on.
    ///
    /// This is the loaded value, so a node whose key was changed in memory
    /// is still found under its old key.
    pub fn stored_key(&self) -> Result<(&'static str, &JsonValue), AppError> {
        let (field, current) = self.require_primary_key()?;
        Ok((field, self.loaded_value(field).unwrap_or(current)))
    }

    /// The schema entry of a relation field.
    pub fn relation_field(&self, name: &str) -> Result<&'static FieldSchema, AppError> {
        let schema = self.schema();
        match schema.field_named(name) {
            Some(field) if field.kind() == FieldKind::Relation => Ok(field),
            Some(_) => Err(AppError::Configuration(format!(
                "{}.{} is not a relation",
                schema.label(),
                name
            ))),
            None => Err(AppError::UnknownField {
                entity: schema.label().to_string(),
                field: name.to_string(),
            }),
        }
    }

    /// Cached relationships of a relation field, if loaded.
    pub fn relation(&self, name: &str) -> Option<&[RelationshipModel]> {
        self.relations.get(name).map(Vec::as_slice)
    }

    pub fn is_relation_loaded(&self, name: &str) -> bool {
        self.relations.contains_key(name)
    }

    /// Stores loaded relationships for a relation field.
    pub fn set_relation(
        &mut self,
        name: &str,
        relationships: Vec<RelationshipModel>,
    ) -> Result<(), AppError> {
        self.relation_field(name)?;
        self.relations.insert(name.to_string(), relationships);
        Ok(())
    }

    /// A copy of this node without any loaded relations.
    pub(crate) fn detached(&self) -> Self {
        Self {
            instance: self.instance.clone(),
            relations: HashMap::new(),
        }
    }
}

impl Deref for NodeModel {
    type Target = ModelInstance;

    fn deref(&self) -> &Self::Target {
        &self.instance
    }
}

impl DerefMut for NodeModel {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.instance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::field::{Direction, FieldSchema};
    use once_cell::sync::Lazy;
    use serde_json::json;

    static USER: Lazy<ModelSchema> = Lazy::new(|| {
        ModelSchema::node("User")
            .field(FieldSchema::string("email").primary())
            .field(FieldSchema::string("name").default("anon"))
            .field(FieldSchema::relation(
                "follows",
                Direction::Outgoing,
                follows,
                user,
            ))
    });

    static FOLLOWS: Lazy<ModelSchema> = Lazy::new(|| ModelSchema::relationship("FOLLOWS"));

    fn user() -> &'static ModelSchema {
        &USER
    }

    fn follows() -> &'static ModelSchema {
        &FOLLOWS
    }

    fn alice() -> NodeModel {
        let mut props = PropertyMap::new();
        props.insert("email".to_string(), json!("a@x"));
        NodeModel::new(user(), &props).unwrap()
    }

    #[test]
    fn test_primary_key() {
        let node = alice();
        assert_eq!(node.primary_key(), Some(("email", &json!("a@x"))));
        assert_eq!(node.get_str("name"), Some("anon"));
    }

    #[test]
    fn test_relation_field_is_not_a_value() {
        let node = alice();
        assert_eq!(node.get("follows"), None);
        assert!(!node.is_relation_loaded("follows"));
        assert!(node.relation("follows").is_none());
    }

    #[test]
    fn test_set_relation() {
        let mut node = alice();
        node.set_relation("follows", Vec::new()).unwrap();

        assert!(node.is_relation_loaded("follows"));
        assert_eq!(node.relation("follows").map(|r| r.len()), Some(0));
        assert!(matches!(
            node.set_relation("name", Vec::new()),
            Err(AppError::Configuration(_))
        ));
        assert!(matches!(
            node.set_relation("missing", Vec::new()),
            Err(AppError::UnknownField { .. })
        ));
    }

    #[test]
    fn test_stored_key_uses_loaded_value() {
        let mut node = alice();
        node.set("email", "b@x").unwrap();

        assert_eq!(node.primary_key(), Some(("email", &json!("b@x"))));
        assert_eq!(node.stored_key().unwrap(), ("email", &json!("a@x")));
    }

    static DOUBLE: Lazy<ModelSchema> = Lazy::new(|| {
        ModelSchema::node("Double")
            .field(FieldSchema::string("a").primary())
            .field(FieldSchema::string("b").primary())
    });

    #[test]
    fn test_two_primary_fields_are_rejected() {
        let mut props = PropertyMap::new();
        props.insert("a".to_string(), json!("x"));
        props.insert("b".to_string(), json!("y"));

        assert!(matches!(
            NodeModel::new(&DOUBLE, &props),
            Err(AppError::Configuration(_))
        ));
    }

    #[test]
    fn test_relationship_schema_is_rejected() {
        assert!(NodeModel::new(follows(), &PropertyMap::new()).is_err());
    }

    #[test]
    fn test_with_properties_builds_new_instance() {
        let node = alice();
        let mut props = PropertyMap::new();
        props.insert("email".to_string(), json!("b@x"));
        props.insert("db_id".to_string(), json!(9));

        let other = node.with_properties(&props).unwrap();
        assert_eq!(other.get_str("email"), Some("b@x"));
        assert_eq!(other.database_id(), Some(9));
        assert_eq!(node.get_str("email"), Some("a@x"));
    }
}
