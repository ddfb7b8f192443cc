//! Cypher synthesis for mapper operations.
//!
//! Labels, relationship types and field names come from static schemas and
//! are interpolated; every value is passed as a parameter.

use serde_json::Value as JsonValue;

use crate::graph::Statement;
use crate::models::{Direction, PropertyMap};

/// Label of the per-entity counter nodes used for auto-increment ids.
pub const COUNTER_LABEL: &str = "OgmCounter";

/// Projection returning a node's properties and database id as `info`.
const RETURN_NODE: &str = "RETURN n{.*, db_id: id(n)} AS info";

const RETURN_REL: &str = "RETURN r{.*, db_id: id(r)} AS info";

/// One `ORDER BY` entry.
///
/// The direction is rendered verbatim; an invalid one is reported by the
/// database as a syntax error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub direction: String,
}

impl OrderBy {
    pub fn new(field: impl Into<String>, direction: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: direction.into(),
        }
    }

    pub fn asc(field: impl Into<String>) -> Self {
        Self::new(field, "ASC")
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self::new(field, "DESC")
    }
}

/// Renders `n.a ASC, n.b DESC`.
pub fn order_parts(orders: &[OrderBy], prefix: &str) -> String {
    orders
        .iter()
        .map(|o| format!("{}{} {}", prefix, o.field, o.direction))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parameter name of an equality filter on `field`.
pub fn filter_param(field: &str) -> String {
    format!("n_{}", field)
}

/// Endpoint match data of a relationship statement.
#[derive(Debug, Clone, Copy)]
pub struct Endpoint<'a> {
    pub label: &'a str,
    pub key: &'a str,
    pub value: &'a JsonValue,
}

fn match_endpoints(from: &Endpoint<'_>, to: &Endpoint<'_>) -> String {
    format!(
        "MATCH (n1:{} {{{}: $n1_id}}), (n2:{} {{{}: $n2_id}})",
        from.label, from.key, to.label, to.key
    )
}

pub fn fetch_by_key(label: &str, key: &str, value: JsonValue) -> Statement {
    Statement::new(format!(
        "MATCH (n:{} {{{}: $id}}) {} LIMIT 1",
        label, key, RETURN_NODE
    ))
    .param_raw("id", value)
}

pub fn fetch_by_keys(label: &str, key: &str, values: Vec<JsonValue>) -> Statement {
    Statement::new(format!(
        "MATCH (n:{}) WHERE n.{} IN $ids {}",
        label, key, RETURN_NODE
    ))
    .param_raw("ids", JsonValue::Array(values))
}

/// Label scan with an AND-combined equality filter, ordering and limit.
pub fn fetch_by_label(
    label: &str,
    filter: &PropertyMap,
    order_by: &[OrderBy],
    limit: Option<u64>,
) -> Statement {
    let mut cypher = format!("MATCH (n:{})", label);

    if !filter.is_empty() {
        let conditions: Vec<String> = filter
            .keys()
            .map(|field| format!("n.{} = ${}", field, filter_param(field)))
            .collect();
        cypher.push_str(" WHERE ");
        cypher.push_str(&conditions.join(" AND "));
    }

    cypher.push_str(" WITH n");
    if !order_by.is_empty() {
        cypher.push_str(" ORDER BY ");
        cypher.push_str(&order_parts(order_by, "n."));
    }
    if limit.is_some() {
        cypher.push_str(" LIMIT $limit");
    }
    cypher.push(' ');
    cypher.push_str(RETURN_NODE);

    let mut statement = Statement::new(cypher);
    for (field, value) in filter {
        statement = statement.param_raw(&filter_param(field), value.clone());
    }
    if let Some(limit) = limit {
        statement = statement.param("limit", limit);
    }
    statement
}

/// Allocates the next counter value and creates the node with it.
///
/// Lock set, increment and lock removal happen in the same statement as the
/// node creation, so the database serializes concurrent writers.
pub fn create_auto_increment(label: &str, field: &str, props: PropertyMap) -> Statement {
    Statement::new(format!(
        "MERGE (c:{counter} {{name: $config_name}}) \
         SET c.lock = $lock \
         WITH c \
         SET c.n = coalesce(c.n, 0) + 1 \
         REMOVE c.lock \
         WITH c.n AS use_id \
         CREATE (n:{label} {{{field}: use_id}}) \
         SET n += $props \
         WITH n {ret}",
        counter = COUNTER_LABEL,
        label = label,
        field = field,
        ret = RETURN_NODE
    ))
    .param("config_name", format!("ai_{}", label))
    .param("lock", 1)
    .param_raw("props", JsonValue::Object(props))
}

pub fn create_with_primary(label: &str, key: &str, id: JsonValue, props: PropertyMap) -> Statement {
    Statement::new(format!(
        "CREATE (n:{} {{{}: $use_id}}) SET n += $props WITH n {}",
        label, key, RETURN_NODE
    ))
    .param_raw("use_id", id)
    .param_raw("props", JsonValue::Object(props))
}

/// Links two nodes. Unique types merge and set properties only on creation.
pub fn create_relationship(
    from: &Endpoint<'_>,
    to: &Endpoint<'_>,
    rel_type: &str,
    unique: bool,
    props: PropertyMap,
) -> Statement {
    let link = if unique {
        format!("MERGE (n1)-[r:{}]->(n2) ON CREATE SET r = $rel_props", rel_type)
    } else {
        format!("CREATE (n1)-[r:{}]->(n2) SET r = $rel_props", rel_type)
    };

    Statement::new(format!(
        "{} WITH n1, n2 {} WITH r {}",
        match_endpoints(from, to),
        link,
        RETURN_REL
    ))
    .param_raw("n1_id", from.value.clone())
    .param_raw("n2_id", to.value.clone())
    .param_raw("rel_props", JsonValue::Object(props))
}

pub fn save_node(label: &str, key: &str, id: JsonValue, props: PropertyMap) -> Statement {
    Statement::new(format!(
        "MATCH (n:{} {{{}: $id}}) SET n += $props WITH n {}",
        label, key, RETURN_NODE
    ))
    .param_raw("id", id)
    .param_raw("props", JsonValue::Object(props))
}

pub fn delete_node(label: &str, key: &str, id: JsonValue) -> Statement {
    Statement::new(format!("MATCH (n:{} {{{}: $id}}) DETACH DELETE n", label, key))
        .param_raw("id", id)
}

fn match_relationship(from: &Endpoint<'_>, to: &Endpoint<'_>, rel_type: &str) -> String {
    format!(
        "{} WITH n1, n2 MATCH (n1)-[r:{}]->(n2) WHERE id(r) = $rel_id WITH r",
        match_endpoints(from, to),
        rel_type
    )
}

pub fn save_relationship(
    from: &Endpoint<'_>,
    to: &Endpoint<'_>,
    rel_type: &str,
    rel_id: i64,
    props: PropertyMap,
) -> Statement {
    Statement::new(format!(
        "{} SET r += $props {}",
        match_relationship(from, to, rel_type),
        RETURN_REL
    ))
    .param_raw("n1_id", from.value.clone())
    .param_raw("n2_id", to.value.clone())
    .param("rel_id", rel_id)
    .param_raw("props", JsonValue::Object(props))
}

pub fn delete_relationship(
    from: &Endpoint<'_>,
    to: &Endpoint<'_>,
    rel_type: &str,
    rel_id: i64,
) -> Statement {
    Statement::new(format!("{} DELETE r", match_relationship(from, to, rel_type)))
        .param_raw("n1_id", from.value.clone())
        .param_raw("n2_id", to.value.clone())
        .param("rel_id", rel_id)
}

/// Traverses one relation field from the owner node.
///
/// Rows carry the related node as `rel_node` and the relationship as
/// `rel_rel`, both with their database ids.
pub fn load_relation(
    owner: &Endpoint<'_>,
    direction: Direction,
    rel_type: &str,
    other_label: &str,
) -> Statement {
    Statement::new(format!(
        "MATCH (n:{} {{{}: $id}}) WITH n MATCH {} \
         RETURN other{{.*, db_id: id(other)}} AS rel_node, r{{.*, db_id: id(r)}} AS rel_rel",
        owner.label,
        owner.key,
        direction.pattern(rel_type, other_label)
    ))
    .param_raw("id", owner.value.clone())
}
