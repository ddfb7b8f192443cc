//! Static field descriptors for node and relationship types.

use std::collections::HashSet;

use serde_json::Value as JsonValue;

use crate::error::AppError;

/// Resolves a schema lazily so model types can reference each other.
pub type SchemaRef = fn() -> &'static ModelSchema;

/// The kind of a persisted field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    String,
    Integer,
    Float,
    Boolean,
    /// Structured value stored as JSON text.
    Json,
    /// Assigned from a database-side counter on creation.
    AutoIncrement,
    /// Unix seconds, set when the instance is first built.
    CreatedOn,
    /// Unix seconds, refreshed whenever the instance is modified.
    ModifiedOn,
    /// Carries no value; names a traversal to related nodes.
    Relation,
}

impl FieldKind {
    /// Whether the field is stored on the entity itself.
    pub fn has_value(&self) -> bool {
        !matches!(self, FieldKind::Relation)
    }

    pub fn is_timestamp(&self) -> bool {
        matches!(self, FieldKind::CreatedOn | FieldKind::ModifiedOn)
    }
}

/// Traversal direction of a relation field, seen from the owning node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// `(owner)-[r]->(other)`
    Outgoing,
    /// `(owner)<-[r]-(other)`
    Incoming,
}

impl Direction {
    /// Renders `(n)-[r:TYPE]->(other:Label)` or its incoming mirror.
    pub fn pattern(&self, rel_type: &str, other_label: &str) -> String {
        match self {
            Direction::Outgoing => format!("(n)-[r:{}]->(other:{})", rel_type, other_label),
            Direction::Incoming => format!("(n)<-[r:{}]-(other:{})", rel_type, other_label),
        }
    }
}

/// Relationship type and related node type of a relation field.
#[derive(Debug, Clone, Copy)]
pub struct RelationTarget {
    pub direction: Direction,
    pub carrier: SchemaRef,
    pub related: SchemaRef,
}

/// Description of one declared field.
#[derive(Debug, Clone)]
pub struct FieldSchema {
    name: String,
    kind: FieldKind,
    primary: bool,
    unique: bool,
    default: Option<JsonValue>,
    relation: Option<RelationTarget>,
}

impl FieldSchema {
    fn with_kind(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            primary: false,
            unique: false,
            default: None,
            relation: None,
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::with_kind(name, FieldKind::String)
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::with_kind(name, FieldKind::Integer)
    }

    pub fn float(name: impl Into<String>) -> Self {
        Self::with_kind(name, FieldKind::Float)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::with_kind(name, FieldKind::Boolean)
    }

    pub fn json(name: impl Into<String>) -> Self {
        Self::with_kind(name, FieldKind::Json)
    }

    pub fn auto_increment(name: impl Into<String>) -> Self {
        Self::with_kind(name, FieldKind::AutoIncrement)
    }

    pub fn created_on(name: impl Into<String>) -> Self {
        Self::with_kind(name, FieldKind::CreatedOn)
    }

    pub fn modified_on(name: impl Into<String>) -> Self {
        Self::with_kind(name, FieldKind::ModifiedOn)
    }

    /// A relation field traversing `carrier` relationships to `related` nodes.
    pub fn relation(
        name: impl Into<String>,
        direction: Direction,
        carrier: SchemaRef,
        related: SchemaRef,
    ) -> Self {
        let mut field = Self::with_kind(name, FieldKind::Relation);
        field.relation = Some(RelationTarget {
            direction,
            carrier,
            related,
        });
        field
    }

    /// Marks this field as the primary key.
    pub fn primary(mut self) -> Self {
        self.primary = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Sets the value used when a property map omits this field.
    ///
    /// `JsonValue::Null` is a real default, distinct from having none.
    pub fn default(mut self, value: impl Into<JsonValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn is_primary(&self) -> bool {
        self.primary
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }

    pub fn default_value(&self) -> Option<&JsonValue> {
        self.default.as_ref()
    }

    pub fn relation_target(&self) -> Option<&RelationTarget> {
        self.relation.as_ref()
    }
}

/// Whether a schema describes nodes or relationships.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Node,
    Relationship,
}

/// Ordered field table of one model type.
///
/// # Example
///
/// ```ignore
/// static SESSION: Lazy<ModelSchema> = Lazy::new(|| {
///     ModelSchema::node("Session")
///         .field(FieldSchema::auto_increment("id").primary())
///         .field(FieldSchema::string("key"))
///         .field(FieldSchema::relation("replays", Direction::Outgoing, has_replay, replay))
/// });
/// ```
#[derive(Debug, Clone)]
pub struct ModelSchema {
    kind: EntityKind,
    label: String,
    unique: bool,
    fields: Vec<FieldSchema>,
}

impl ModelSchema {
    /// Starts a schema for nodes carrying `label`.
    pub fn node(label: impl Into<String>) -> Self {
        Self {
            kind: EntityKind::Node,
            label: label.into(),
            unique: false,
            fields: Vec::new(),
        }
    }

    /// Starts a schema for relationships of type `rel_type`.
    pub fn relationship(rel_type: impl Into<String>) -> Self {
        Self {
            kind: EntityKind::Relationship,
            label: rel_type.into(),
            unique: false,
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, field: FieldSchema) -> Self {
        self.fields.push(field);
        self
    }

    /// Declares the type globally unique.
    ///
    /// For relationships this means at most one edge of the type between
    /// the same pair of nodes.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }

    pub fn fields(&self) -> &[FieldSchema] {
        &self.fields
    }

    pub fn field_named(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// The declared primary field, falling back to the auto-increment field.
    pub fn primary_field(&self) -> Option<&FieldSchema> {
        self.fields
            .iter()
            .find(|f| f.primary)
            .or_else(|| self.auto_increment_field())
    }

    pub fn auto_increment_field(&self) -> Option<&FieldSchema> {
        self.fields
            .iter()
            .find(|f| f.kind == FieldKind::AutoIncrement)
    }

    pub fn modified_field(&self) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.kind == FieldKind::ModifiedOn)
    }

    pub fn relation_fields(&self) -> impl Iterator<Item = &FieldSchema> {
        self.fields.iter().filter(|f| f.kind == FieldKind::Relation)
    }

    /// Checks the field table for declaration mistakes.
    pub fn validate(&self) -> Result<(), AppError> {
        let mut seen = HashSet::new();
        for field in &self.fields {
            if !seen.insert(field.name.as_str()) {
                return Err(self.misconfigured(format!("field '{}' declared twice", field.name)));
            }
        }

        let primaries = self.fields.iter().filter(|f| f.primary).count();
        if primaries > 1 {
            return Err(self.misconfigured("more than one primary field".to_string()));
        }

        let counters = self
            .fields
            .iter()
            .filter(|f| f.kind == FieldKind::AutoIncrement)
            .count();
        if counters > 1 {
            return Err(self.misconfigured("more than one auto-increment field".to_string()));
        }

        if let Some(field) = self
            .fields
            .iter()
            .find(|f| f.kind == FieldKind::Relation && f.primary)
        {
            return Err(self.misconfigured(format!(
                "relation field '{}' cannot be primary",
                field.name
            )));
        }

        if self.kind == EntityKind::Relationship {
            if primaries > 0 {
                return Err(self.misconfigured("relationships have no primary field".to_string()));
            }
            if self.relation_fields().next().is_some() {
                return Err(self.misconfigured(
                    "relation fields are only allowed on nodes".to_string(),
                ));
            }
        }

        Ok(())
    }

    fn misconfigured(&self, reason: String) -> AppError {
        AppError::Configuration(format!("{}: {}", self.label, reason))
    }
}
