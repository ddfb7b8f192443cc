//! Entity metadata and runtime model instances.

mod field;
mod instance;
mod node;
mod relationship;

pub use field::{
    Direction, EntityKind, FieldKind, FieldSchema, ModelSchema, RelationTarget, SchemaRef,
};
pub use instance::{ModelInstance, PropertyInfo, PropertyMap, DB_ID_KEY};
pub use node::NodeModel;
pub use relationship::RelationshipModel;
