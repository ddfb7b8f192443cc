//! Macro for convenient Cypher query construction.

/// Macro for inline Cypher queries with optional parameters.
///
/// Expands to `$executor.query($query)` followed by one `.param(...)` per
/// named argument, so the result is a [`Query`](crate::graph::Query) ready
/// to execute.
///
/// # Usage
///
/// ```ignore
/// use cypher_ogm::cypher;
///
/// let row = cypher!(executor, "MATCH (n:Session {id: $id}) RETURN n", id = 4)
///     .fetch_one()
///     .await?;
/// ```
#[macro_export]
macro_rules! cypher {
    // Query without parameters
    ($executor:expr, $query:expr) => {
        $executor.query($query)
    };
    // Query with parameters
    ($executor:expr, $query:expr, $($name:ident = $value:expr),+ $(,)?) => {
        $executor.query($query)$(.param(stringify!($name), $value))+
    };
}

#[cfg(test)]
mod tests {
    use crate::config::ExecutionConfig;
    use crate::execution::BatchExecutor;
    use crate::graph::row::{Params, RecordSet};
    use crate::graph::traits::{CypherDriver, DriverError};

    struct TestDriver;

    #[async_trait::async_trait]
    impl CypherDriver for TestDriver {
        async fn run_statement(
            &self,
            _statement: &str,
            _params: &Params,
            _database: Option<&str>,
        ) -> Result<RecordSet, DriverError> {
            Ok(RecordSet::default())
        }
    }

    #[test]
    fn test_cypher_macro_no_params() {
        let executor = BatchExecutor::new(TestDriver, ExecutionConfig::default());
        let statement = cypher!(executor, "MATCH (n) RETURN n").into_statement();
        assert!(statement.params().is_empty());
    }

    #[test]
    fn test_cypher_macro_with_params() {
        let executor = BatchExecutor::new(TestDriver, ExecutionConfig::default());
        let id = "test-id";
        let statement = cypher!(
            executor,
            "MATCH (n) WHERE n.id = $id RETURN n LIMIT $count",
            id = id,
            count = 42,
        )
        .into_statement();

        assert_eq!(statement.params().get("id"), Some(&serde_json::json!("test-id")));
        assert_eq!(statement.params().get("count"), Some(&serde_json::json!(42)));
    }
}
