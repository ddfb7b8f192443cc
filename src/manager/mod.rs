//! Object-graph mapper operations.
//!
//! [`Manager`] turns model instances into statements, runs them through a
//! [`BatchExecutor`] and rebuilds instances from the returned properties.
//! Input instances are never mutated; every write returns a fresh instance.

pub mod statements;

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value as JsonValue;

use crate::error::AppError;
use crate::execution::{Batch, BatchExecutor};
use crate::graph::{CypherDriver, RecordSet, Row};
use crate::models::{
    Direction, FieldKind, ModelSchema, NodeModel, PropertyMap, RelationshipModel,
};

pub use statements::OrderBy;
use statements::Endpoint;

/// Maps model instances to and from the graph.
pub struct Manager<D: CypherDriver> {
    executor: BatchExecutor<D>,
}

impl<D: CypherDriver> Manager<D> {
    pub fn new(executor: BatchExecutor<D>) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &BatchExecutor<D> {
        &self.executor
    }

    // ------------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------------

    /// Finds one node by a single-field equality match.
    ///
    /// Returns `Ok(None)` when nothing matches.
    pub async fn fetch_object_by_key(
        &self,
        schema: &'static ModelSchema,
        key: &str,
        value: impl Into<JsonValue>,
    ) -> Result<Option<NodeModel>, AppError> {
        let records = self
            .executor
            .execute_statement(statements::fetch_by_key(schema.label(), key, value.into()))
            .await?;

        match records.first() {
            Some(row) => Ok(Some(node_from_row(schema, row, "info")?)),
            None => Ok(None),
        }
    }

    /// Finds every node whose `key` is in `values`, keyed by that value.
    ///
    /// String keys are used as-is; other values by their JSON text.
    pub async fn fetch_objects_by_keys(
        &self,
        schema: &'static ModelSchema,
        key: &str,
        values: Vec<JsonValue>,
    ) -> Result<HashMap<String, NodeModel>, AppError> {
        if values.is_empty() {
            return Ok(HashMap::new());
        }

        let records = self
            .executor
            .execute_statement(statements::fetch_by_keys(schema.label(), key, values))
            .await?;

        let mut found = HashMap::with_capacity(records.len());
        for row in records.rows() {
            let node = node_from_row(schema, row, "info")?;
            if let Some(value) = node.get(key) {
                found.insert(key_string(value), node);
            }
        }
        Ok(found)
    }

    /// Lists nodes of a label, optionally ordered and capped.
    pub async fn fetch_objects_by_label(
        &self,
        schema: &'static ModelSchema,
        order_by: &[OrderBy],
        limit: Option<u64>,
    ) -> Result<Vec<NodeModel>, AppError> {
        self.fetch_objects_by_label_and_props(schema, &PropertyMap::new(), order_by, limit)
            .await
    }

    /// Lists nodes of a label whose properties equal every entry of `props`.
    pub async fn fetch_objects_by_label_and_props(
        &self,
        schema: &'static ModelSchema,
        props: &PropertyMap,
        order_by: &[OrderBy],
        limit: Option<u64>,
    ) -> Result<Vec<NodeModel>, AppError> {
        for field in props.keys().chain(order_by.iter().map(|o| &o.field)) {
            match schema.field_named(field) {
                Some(f) if f.kind() == FieldKind::Relation => {
                    return Err(AppError::Configuration(format!(
                        "{}.{} is a relation and cannot be filtered or ordered on",
                        schema.label(),
                        field
                    )));
                }
                Some(_) => {}
                None => {
                    return Err(AppError::UnknownField {
                        entity: schema.label().to_string(),
                        field: field.clone(),
                    });
                }
            }
        }

        let records = self
            .executor
            .execute_statement(statements::fetch_by_label(
                schema.label(),
                props,
                order_by,
                limit,
            ))
            .await?;

        records
            .rows()
            .iter()
            .map(|row| node_from_row(schema, row, "info"))
            .collect()
    }

    // ------------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------------

    /// Creates a node and returns it as stored.
    ///
    /// Types with an auto-increment field get their id from the per-type
    /// counter; others must carry a primary key value.
    ///
    /// # Errors
    ///
    /// - [`AppError::Configuration`] if the type has neither an
    ///   auto-increment nor a primary field.
    /// - [`AppError::ConstraintViolation`] if the database rejects the node
    ///   on a uniqueness constraint.
    pub async fn create_node(&self, node: &NodeModel) -> Result<NodeModel, AppError> {
        let label = node.label();
        let info = node.property_info();

        let statement = if let Some(field) = info.auto_increment {
            statements::create_auto_increment(label, field, info.props)
        } else {
            let Some(primary) = info.primary else {
                return Err(AppError::Configuration(format!(
                    "{}: primary field must be defined if no auto-increment field exists",
                    label
                )));
            };
            let id = info
                .props
                .get(primary)
                .cloned()
                .ok_or_else(|| AppError::MissingField {
                    entity: label.to_string(),
                    field: primary.to_string(),
                })?;
            statements::create_with_primary(label, primary, id, info.props)
        };

        let records = self
            .executor
            .execute_statement(statement)
            .await
            .map_err(AppError::classify_constraint)?;

        let created = node.with_properties(&first_info(&records, label)?)?;
        tracing::debug!(label, db_id = ?created.database_id(), "Created node");
        Ok(created)
    }

    /// Links the endpoints of `rel` and returns the stored relationship.
    ///
    /// Unique relationship types reuse an existing edge between the same
    /// nodes and leave its properties untouched.
    pub async fn create_relationship(
        &self,
        rel: &RelationshipModel,
    ) -> Result<RelationshipModel, AppError> {
        let (from, to) = endpoints(rel)?;
        let info = rel.property_info();

        let records = self
            .executor
            .execute_statement(statements::create_relationship(
                &from,
                &to,
                rel.label(),
                info.unique,
                info.props,
            ))
            .await
            .map_err(AppError::classify_constraint)?;

        rel.with_properties(&first_info(&records, rel.label())?)
    }

    /// Writes the modified fields of `node`.
    ///
    /// Returns `node` unchanged when nothing was modified.
    pub async fn save_node(&self, node: NodeModel) -> Result<NodeModel, AppError> {
        let modified = node.modified_properties();
        if modified.is_empty() {
            return Ok(node);
        }

        let (key, id) = node.stored_key()?;
        let records = self
            .executor
            .execute_statement(statements::save_node(node.label(), key, id.clone(), modified))
            .await
            .map_err(AppError::classify_constraint)?;

        node.with_properties(&first_info(&records, node.label())?)
    }

    /// Writes the modified fields of `rel`.
    ///
    /// Returns `rel` unchanged when nothing was modified.
    pub async fn save_relationship(
        &self,
        rel: RelationshipModel,
    ) -> Result<RelationshipModel, AppError> {
        let modified = rel.modified_properties();
        if modified.is_empty() {
            return Ok(rel);
        }

        let rel_id = require_database_id(&rel)?;
        let (from, to) = endpoints(&rel)?;
        let records = self
            .executor
            .execute_statement(statements::save_relationship(
                &from,
                &to,
                rel.label(),
                rel_id,
                modified,
            ))
            .await
            .map_err(AppError::classify_constraint)?;

        rel.with_properties(&first_info(&records, rel.label())?)
    }

    /// Deletes a node and all its relationships. Missing nodes are ignored.
    pub async fn delete_node(&self, node: &NodeModel) -> Result<(), AppError> {
        let (key, id) = node.stored_key()?;
        self.executor
            .execute_statement(statements::delete_node(node.label(), key, id.clone()))
            .await?;
        Ok(())
    }

    /// Deletes one relationship. Missing relationships are ignored.
    pub async fn delete_relationship(&self, rel: &RelationshipModel) -> Result<(), AppError> {
        let rel_id = require_database_id(rel)?;
        let (from, to) = endpoints(rel)?;
        self.executor
            .execute_statement(statements::delete_relationship(
                &from,
                &to,
                rel.label(),
                rel_id,
            ))
            .await?;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Relations
    // ------------------------------------------------------------------------

    /// Loads the named relation fields of `node` in a single batch.
    ///
    /// Every requested name is present in the result, with an empty list
    /// when nothing is related.
    pub async fn load_relations_for_node(
        &self,
        node: &NodeModel,
        names: &[&str],
    ) -> Result<HashMap<String, Vec<RelationshipModel>>, AppError> {
        let mut grouped = HashMap::with_capacity(names.len());
        if names.is_empty() {
            return Ok(grouped);
        }

        let (key, id) = node.stored_key()?;
        let owner = Endpoint {
            label: node.label(),
            key,
            value: id,
        };

        let mut targets = Vec::with_capacity(names.len());
        let mut batch = Batch::new();
        for name in names {
            let field = node.relation_field(name)?;
            let Some(target) = field.relation_target() else {
                return Err(AppError::Configuration(format!(
                    "{}.{} has no related type",
                    node.label(),
                    name
                )));
            };
            let carrier = (target.carrier)();
            let related = (target.related)();
            batch.push(statements::load_relation(
                &owner,
                target.direction,
                carrier.label(),
                related.label(),
            ));
            targets.push((*name, target.direction, carrier, related));
        }

        let results = self.executor.execute(batch).await?;

        let this = Arc::new(node.detached());
        for ((name, direction, carrier, related), outcome) in
            targets.into_iter().zip(results.into_outcomes())
        {
            let records = outcome.map_err(AppError::Query)?;
            let mut relationships = Vec::with_capacity(records.len());

            for row in records.rows() {
                let other = Arc::new(node_from_row(related, row, "rel_node")?);
                let (start, end) = match direction {
                    Direction::Outgoing => (Arc::clone(&this), other),
                    Direction::Incoming => (other, Arc::clone(&this)),
                };
                relationships.push(RelationshipModel::new(
                    carrier,
                    start,
                    end,
                    &row.get_map("rel_rel")?,
                )?);
            }

            grouped.insert(name.to_string(), relationships);
        }

        Ok(grouped)
    }

    /// Loads relation fields and stores them on `node`.
    pub async fn load_relations(&self, node: &mut NodeModel, names: &[&str]) -> Result<(), AppError> {
        let loaded = self.load_relations_for_node(node, names).await?;
        for (name, relationships) in loaded {
            node.set_relation(&name, relationships)?;
        }
        Ok(())
    }

    /// Returns a relation field, loading it first if needed.
    pub async fn relation<'n>(
        &self,
        node: &'n mut NodeModel,
        name: &str,
    ) -> Result<&'n [RelationshipModel], AppError> {
        if !node.is_relation_loaded(name) {
            self.load_relations(node, &[name]).await?;
        }
        node.relation(name)
            .ok_or_else(|| AppError::NotFound(format!("{}.{}", node.label(), name)))
    }
}

fn node_from_row(
    schema: &'static ModelSchema,
    row: &Row,
    column: &str,
) -> Result<NodeModel, AppError> {
    NodeModel::new(schema, &row.get_map(column)?)
}

/// The `info` map of the first row of a write statement.
fn first_info(records: &RecordSet, label: &str) -> Result<PropertyMap, AppError> {
    match records.first() {
        Some(row) => row.get_map("info"),
        None => Err(AppError::NotFound(format!(
            "{}: statement matched nothing",
            label
        ))),
    }
}

fn key_string(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn endpoints(rel: &RelationshipModel) -> Result<(Endpoint<'_>, Endpoint<'_>), AppError> {
    let start = rel.start_node();
    let end = rel.end_node();
    let (start_key, start_id) = start.stored_key()?;
    let (end_key, end_id) = end.stored_key()?;

    Ok((
        Endpoint {
            label: start.label(),
            key: start_key,
            value: start_id,
        },
        Endpoint {
            label: end.label(),
            key: end_key,
            value: end_id,
        },
    ))
}

fn require_database_id(rel: &RelationshipModel) -> Result<i64, AppError> {
    rel.database_id().ok_or_else(|| {
        AppError::Configuration(format!(
            "{} relationship has not been stored yet",
            rel.label()
        ))
    })
}
