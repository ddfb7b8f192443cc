//! Shared fixtures for the integration test suites.

#![allow(dead_code)]

use std::sync::Mutex;

use async_trait::async_trait;
use cypher_ogm::config::{ErrorMode, ExecutionConfig};
use cypher_ogm::graph::{CypherDriver, DriverError, Params, QueryError, RecordSet};
use cypher_ogm::models::{Direction, FieldSchema, ModelSchema, PropertyMap};
use once_cell::sync::Lazy;
use serde_json::{json, Value as JsonValue};

// ----------------------------------------------------------------------------
// Model fixtures
// ----------------------------------------------------------------------------

pub static SESSION: Lazy<ModelSchema> = Lazy::new(|| {
    ModelSchema::node("Session")
        .field(FieldSchema::auto_increment("id").primary())
        .field(FieldSchema::integer("state").default(1))
        .field(FieldSchema::string("key"))
        .field(FieldSchema::integer("valid_through"))
        .field(FieldSchema::created_on("created_time"))
        .field(FieldSchema::modified_on("modified_time"))
        .field(FieldSchema::integer("last_replay_saved_time").default(JsonValue::Null))
        .field(FieldSchema::boolean("is_free").default(false))
        .field(FieldSchema::relation(
            "replays",
            Direction::Outgoing,
            has_replay,
            replay,
        ))
});

pub static REPLAY: Lazy<ModelSchema> = Lazy::new(|| {
    ModelSchema::node("Replay")
        .field(FieldSchema::auto_increment("id").primary())
        .field(FieldSchema::integer("state").default(1))
        .field(FieldSchema::integer("duration").default(45))
        .field(FieldSchema::float("price").default(0.5))
        .field(FieldSchema::integer("sport_id").default(JsonValue::Null))
        .field(FieldSchema::string("filename"))
        .field(FieldSchema::created_on("created_time"))
        .field(FieldSchema::modified_on("modified_time"))
        .field(FieldSchema::relation(
            "session",
            Direction::Incoming,
            has_replay,
            session,
        ))
        .field(FieldSchema::relation(
            "camera",
            Direction::Outgoing,
            captured_by,
            camera,
        ))
});

pub static CAMERA: Lazy<ModelSchema> = Lazy::new(|| {
    ModelSchema::node("Camera")
        .field(FieldSchema::string("serial").primary().unique())
        .field(FieldSchema::json("settings").default(json!({})))
        .field(FieldSchema::modified_on("modified_time"))
});

pub static HAS_REPLAY: Lazy<ModelSchema> = Lazy::new(|| {
    ModelSchema::relationship("HAS_REPLAY")
        .unique()
        .field(FieldSchema::created_on("created_time"))
});

pub static CAPTURED_BY: Lazy<ModelSchema> = Lazy::new(|| {
    ModelSchema::relationship("CAPTURED_BY").field(FieldSchema::integer("angle").default(0))
});

pub fn session() -> &'static ModelSchema {
    &SESSION
}

pub fn replay() -> &'static ModelSchema {
    &REPLAY
}

pub fn camera() -> &'static ModelSchema {
    &CAMERA
}

pub fn has_replay() -> &'static ModelSchema {
    &HAS_REPLAY
}

pub fn captured_by() -> &'static ModelSchema {
    &CAPTURED_BY
}

/// Builds a property map from a `json!` object.
pub fn props(value: JsonValue) -> PropertyMap {
    match value {
        JsonValue::Object(map) => map,
        other => panic!("expected a JSON object, got {}", other),
    }
}

// ----------------------------------------------------------------------------
// Records
// ----------------------------------------------------------------------------

/// A record set with one `info` column per row.
pub fn info_rows(rows: Vec<JsonValue>) -> RecordSet {
    RecordSet::from_positional(
        vec!["info".to_string()],
        rows.into_iter().map(|r| vec![r]).collect(),
    )
}

pub fn query_error(code: &str) -> DriverError {
    DriverError::Query(QueryError::new(code, format!("{} raised", code)))
}

pub const DEADLOCK: &str = "Neo.TransientError.Transaction.DeadlockDetected";
pub const SYNTAX_ERROR: &str = "Neo.ClientError.Statement.SyntaxError";

/// Execution settings with millisecond backoff so retries stay fast.
pub fn fast_config(error_mode: ErrorMode) -> ExecutionConfig {
    ExecutionConfig {
        error_mode,
        cypher_retry_max_interval_ms: 2,
        request_retry_interval_ms: 1,
        ..Default::default()
    }
}

// ----------------------------------------------------------------------------
// Driver
// ----------------------------------------------------------------------------

/// One statement as seen by the driver.
#[derive(Debug, Clone)]
pub struct Call {
    pub cypher: String,
    pub params: Params,
    pub database: Option<String>,
}

type Handler = dyn Fn(&str, &Params) -> Result<RecordSet, DriverError> + Send + Sync;

/// Driver that answers through a closure and records every call.
pub struct FnDriver {
    handler: Box<Handler>,
    calls: Mutex<Vec<Call>>,
}

impl FnDriver {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&str, &Params) -> Result<RecordSet, DriverError> + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Answers every statement with an empty record set.
    pub fn empty() -> Self {
        Self::new(|_, _| Ok(RecordSet::default()))
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl CypherDriver for FnDriver {
    async fn run_statement(
        &self,
        statement: &str,
        params: &Params,
        database: Option<&str>,
    ) -> Result<RecordSet, DriverError> {
        self.calls.lock().unwrap().push(Call {
            cypher: statement.to_string(),
            params: params.clone(),
            database: database.map(str::to_string),
        });
        (self.handler)(statement, params)
    }
}
