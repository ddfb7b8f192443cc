//! Core traits for the driver collaborator.
//!
//! The mapper never speaks a wire protocol itself. Everything it sends goes
//! through [`CypherDriver::run_statement`], one statement per call, and the
//! driver answers with either a [`RecordSet`] or a [`DriverError`] that has
//! already been classified as a transport or a query failure.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::graph::row::{Params, RecordSet};

/// Error code the database reports for uniqueness / schema constraint failures.
pub const CONSTRAINT_VIOLATION_CODE: &str = "Neo.ClientError.Schema.ConstraintValidationFailed";

/// A statement rejected by the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryError {
    code: String,
    message: String,
}

impl QueryError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    /// The database error code (e.g. `Neo.TransientError.Transaction.DeadlockDetected`).
    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_constraint_violation(&self) -> bool {
        self.code == CONSTRAINT_VIOLATION_CODE
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for QueryError {}

/// Classified failure returned by a driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    /// The transport could not deliver the statement. Fatal for a batch once
    /// connection retries are exhausted.
    Connection(String),
    /// The database received the statement and rejected it.
    Query(QueryError),
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverError::Connection(msg) => write!(f, "connection failure: {}", msg),
            DriverError::Query(err) => write!(f, "query failure: {}", err),
        }
    }
}

impl std::error::Error for DriverError {}

impl From<QueryError> for DriverError {
    fn from(err: QueryError) -> Self {
        DriverError::Query(err)
    }
}

/// Executes single Cypher statements against a graph database.
///
/// This is the only capability the execution engine requires from a
/// backend. Implementations must execute each call as one transaction.
#[async_trait]
pub trait CypherDriver: Send + Sync {
    /// Runs one statement and returns its materialized records.
    ///
    /// # Arguments
    ///
    /// * `statement` - The Cypher statement text
    /// * `params` - Parameters bound to `$name` placeholders
    /// * `database` - Target database, or `None` for the driver's default
    async fn run_statement(
        &self,
        statement: &str,
        params: &Params,
        database: Option<&str>,
    ) -> Result<RecordSet, DriverError>;
}

#[async_trait]
impl<D: CypherDriver + ?Sized> CypherDriver for Arc<D> {
    async fn run_statement(
        &self,
        statement: &str,
        params: &Params,
        database: Option<&str>,
    ) -> Result<RecordSet, DriverError> {
        (**self).run_statement(statement, params, database).await
    }
}

#[async_trait]
impl<D: CypherDriver + ?Sized> CypherDriver for Box<D> {
    async fn run_statement(
        &self,
        statement: &str,
        params: &Params,
        database: Option<&str>,
    ) -> Result<RecordSet, DriverError> {
        (**self).run_statement(statement, params, database).await
    }
}
