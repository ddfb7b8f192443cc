//! Query command handler.

use color_eyre::eyre::eyre;
use color_eyre::Result;
use serde_json::Value as JsonValue;

use super::App;

/// Parses `name=value`; the value is JSON when it parses, else a string.
fn parse_param(raw: &str) -> Result<(String, JsonValue)> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| eyre!("Parameter '{}' must look like name=value", raw))?;
    if name.is_empty() {
        return Err(eyre!("Parameter '{}' has an empty name", raw));
    }

    let value = serde_json::from_str(value).unwrap_or_else(|_| JsonValue::from(value));
    Ok((name.to_string(), value))
}

impl App {
    /// Run one statement and print every row as a JSON object.
    pub async fn run_query(
        &self,
        statement: &str,
        params: &[String],
        database: Option<&str>,
    ) -> Result<()> {
        let executor = self.executor(database)?;

        let mut query = executor.query(statement);
        for raw in params {
            let (name, value) = parse_param(raw)?;
            query = query.param_raw(&name, value);
        }

        let records = query
            .execute()
            .await
            .map_err(|e| eyre!("Query failed: {}", e))?;

        let stats = records.stats();
        for row in records.into_rows() {
            println!("{}", serde_json::to_string(&row.into_inner())?);
        }

        tracing::info!(
            nodes_created = stats.nodes_created,
            nodes_deleted = stats.nodes_deleted,
            relationships_created = stats.relationships_created,
            relationships_deleted = stats.relationships_deleted,
            properties_set = stats.properties_set,
            "Statement completed"
        );
        Ok(())
    }
}
