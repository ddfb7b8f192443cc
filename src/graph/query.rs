//! Statements and the fluent query builder.

use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::error::AppError;
use crate::execution::BatchExecutor;
use crate::graph::row::{Params, RecordSet, Row};
use crate::graph::traits::CypherDriver;

/// One batch entry: statement text plus its parameters.
///
/// Parameter serialization failures are recorded instead of panicking and
/// reported when the statement is executed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Statement {
    cypher: String,
    params: Params,
    invalid: Option<String>,
}

impl Statement {
    pub fn new(cypher: impl Into<String>) -> Self {
        Self {
            cypher: cypher.into(),
            params: Params::new(),
            invalid: None,
        }
    }

    /// Adds a parameter, referenced in Cypher as `$name`.
    pub fn param<T: Serialize>(mut self, name: &str, value: T) -> Self {
        match serde_json::to_value(value) {
            Ok(json_value) => {
                self.params.insert(name.to_string(), json_value);
            }
            Err(e) => {
                if self.invalid.is_none() {
                    self.invalid = Some(format!("parameter '{}': {}", name, e));
                }
            }
        }
        self
    }

    /// Adds a parameter that's already a JSON value.
    pub fn param_raw(mut self, name: &str, value: JsonValue) -> Self {
        self.params.insert(name.to_string(), value);
        self
    }

    pub fn cypher(&self) -> &str {
        &self.cypher
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Fails if any parameter could not be serialized.
    pub fn validate(&self) -> Result<(), AppError> {
        match &self.invalid {
            Some(reason) => Err(AppError::Serialization(reason.clone())),
            None => Ok(()),
        }
    }
}

/// A builder for constructing and executing a single statement.
///
/// `Query` binds a [`Statement`] to a [`BatchExecutor`] so one-off
/// statements get the same retry and error-mode handling as batches.
///
/// # Example
///
/// ```ignore
/// let rows = executor
///     .query("MATCH (n:Session) WHERE n.key = $key RETURN n")
///     .param("key", "abc")
///     .fetch_all()
///     .await?;
/// ```
pub struct Query<'a, D: CypherDriver> {
    executor: &'a BatchExecutor<D>,
    statement: Statement,
}

impl<'a, D: CypherDriver> Query<'a, D> {
    pub fn new(executor: &'a BatchExecutor<D>, cypher: &str) -> Self {
        Self {
            executor,
            statement: Statement::new(cypher),
        }
    }

    /// Adds a parameter to the query.
    ///
    /// Parameters are referenced in Cypher using `$name` syntax.
    pub fn param<T: Serialize>(mut self, name: &str, value: T) -> Self {
        self.statement = self.statement.param(name, value);
        self
    }

    /// Adds a parameter that's already a JSON value.
    pub fn param_raw(mut self, name: &str, value: JsonValue) -> Self {
        self.statement = self.statement.param_raw(name, value);
        self
    }

    /// Returns the statement without executing it.
    pub fn into_statement(self) -> Statement {
        self.statement
    }

    /// Executes the query and returns its record set.
    pub async fn execute(self) -> Result<RecordSet, AppError> {
        self.executor.execute_statement(self.statement).await
    }

    /// Executes the query and collects all rows into a vector.
    pub async fn fetch_all(self) -> Result<Vec<Row>, AppError> {
        Ok(self.execute().await?.into_rows())
    }

    /// Executes the query and returns the first row, if any.
    pub async fn fetch_one(self) -> Result<Option<Row>, AppError> {
        Ok(self.execute().await?.into_rows().into_iter().next())
    }

    /// Executes the query without returning results.
    ///
    /// Use this for mutations (CREATE, MERGE, DELETE, SET).
    pub async fn run(self) -> Result<(), AppError> {
        self.execute().await.map(|_| ())
    }
}
