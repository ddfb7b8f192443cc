//! Application error types.

use thiserror::Error;

use crate::graph::QueryError;

/// Application-level errors for the mapper and the execution engine.
#[derive(Error, Debug)]
pub enum AppError {
    // Transport errors
    #[error("Connection error: {0}")]
    Connection(String),

    // Database errors
    #[error("Cypher query error: {0}")]
    Query(#[from] QueryError),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(QueryError),

    #[error("Not found: {0}")]
    NotFound(String),

    // Model errors
    #[error("Property is missing: {entity}.{field}")]
    MissingField { entity: String, field: String },

    #[error("Unknown field: {entity}.{field}")]
    UnknownField { entity: String, field: String },

    #[error("Model configuration error: {0}")]
    Configuration(String),

    // Encoding errors
    #[error("Failed to decode result: {0}")]
    Decode(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // Config errors
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

impl AppError {
    /// Re-raises a query error as [`AppError::ConstraintViolation`] when its
    /// code marks a schema constraint failure; every other error is returned
    /// unchanged.
    pub fn classify_constraint(self) -> Self {
        match self {
            AppError::Query(err) if err.is_constraint_violation() => {
                AppError::ConstraintViolation(err)
            }
            other => other,
        }
    }

    /// Returns the database error code for query-level errors.
    pub fn query_code(&self) -> Option<&str> {
        match self {
            AppError::Query(err) | AppError::ConstraintViolation(err) => Some(err.code()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::CONSTRAINT_VIOLATION_CODE;

    #[test]
    fn test_constraint_code_is_reclassified() {
        let err = AppError::Query(QueryError::new(CONSTRAINT_VIOLATION_CODE, "already exists"));
        assert!(matches!(
            err.classify_constraint(),
            AppError::ConstraintViolation(_)
        ));
    }

    #[test]
    fn test_other_codes_pass_through() {
        let err = AppError::Query(QueryError::new(
            "Neo.ClientError.Statement.SyntaxError",
            "bad",
        ));
        let err = err.classify_constraint();
        assert!(matches!(err, AppError::Query(_)));
        assert_eq!(err.query_code(), Some("Neo.ClientError.Statement.SyntaxError"));
    }

    #[test]
    fn test_local_errors_have_no_code() {
        let err = AppError::Configuration("x".to_string());
        assert_eq!(err.query_code(), None);
    }
}
