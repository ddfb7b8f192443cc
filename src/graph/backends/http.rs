//! Transactional HTTP endpoint backend.
//!
//! Each statement is posted on its own to `{uri}/db/{database}/tx/commit`,
//! so the server runs it in a single auto-committed transaction.
//!
//! # Example
//!
//! ```ignore
//! use cypher_ogm::graph::backends::http::HttpDriver;
//!
//! let driver = HttpDriver::new(&config.connection)?;
//! let records = driver.run_statement("RETURN 1 AS x", &Params::new(), None).await?;
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::config::ConnectionConfig;
use crate::error::AppError;
use crate::graph::row::{Params, QueryStats, RecordSet};
use crate::graph::traits::{CypherDriver, DriverError, QueryError};

/// Database used when the caller does not name one.
pub const DEFAULT_DATABASE: &str = "neo4j";

// ----------------------------------------------------------------------------
// Wire payloads
// ----------------------------------------------------------------------------

#[derive(Serialize)]
struct CommitRequest<'a> {
    statements: Vec<StatementPayload<'a>>,
}

#[derive(Serialize)]
struct StatementPayload<'a> {
    statement: &'a str,
    parameters: &'a Params,
    #[serde(rename = "includeStats")]
    include_stats: bool,
}

#[derive(Debug, Deserialize)]
struct CommitResponse {
    #[serde(default)]
    results: Vec<StatementResult>,
    #[serde(default)]
    errors: Vec<ServerError>,
}

#[derive(Debug, Deserialize)]
struct StatementResult {
    #[serde(default)]
    columns: Vec<String>,
    #[serde(default)]
    data: Vec<DataRow>,
    #[serde(default)]
    stats: Option<QueryStats>,
}

#[derive(Debug, Deserialize)]
struct DataRow {
    #[serde(default)]
    row: Vec<JsonValue>,
}

#[derive(Debug, Deserialize)]
struct ServerError {
    #[serde(default = "unknown_code")]
    code: String,
    #[serde(default = "unknown_message")]
    message: String,
}

fn unknown_code() -> String {
    "unknown".to_string()
}

fn unknown_message() -> String {
    "Unknown Cypher error.".to_string()
}

/// Converts a decoded commit response into the driver contract.
///
/// The first server error wins; otherwise the first result becomes the
/// record set (an empty record set when the server returned none).
fn into_record_set(response: CommitResponse) -> Result<RecordSet, DriverError> {
    if let Some(error) = response.errors.into_iter().next() {
        return Err(DriverError::Query(QueryError::new(error.code, error.message)));
    }

    let Some(result) = response.results.into_iter().next() else {
        return Ok(RecordSet::default());
    };

    let rows = result.data.into_iter().map(|d| d.row).collect();
    Ok(RecordSet::from_positional(result.columns, rows).with_stats(result.stats.unwrap_or_default()))
}

// ----------------------------------------------------------------------------
// Driver
// ----------------------------------------------------------------------------

/// HTTP driver for the transactional Cypher endpoint.
///
/// This type is cheap to clone - `reqwest::Client` is `Arc`-based.
#[derive(Clone)]
pub struct HttpDriver {
    client: reqwest::Client,
    base_uri: String,
    username: Option<String>,
    password: Option<String>,
}

impl HttpDriver {
    /// Creates a driver from connection settings.
    ///
    /// No request is made here; connection problems surface on the first
    /// statement.
    pub fn new(config: &ConnectionConfig) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(config.no_ssl_verify)
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| AppError::Connection(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_uri: config.uri.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    /// Returns the commit endpoint for a database.
    pub fn endpoint(&self, database: Option<&str>) -> String {
        format!(
            "{}/db/{}/tx/commit",
            self.base_uri,
            database.unwrap_or(DEFAULT_DATABASE)
        )
    }
}

#[async_trait]
impl CypherDriver for HttpDriver {
    async fn run_statement(
        &self,
        statement: &str,
        params: &Params,
        database: Option<&str>,
    ) -> Result<RecordSet, DriverError> {
        let body = CommitRequest {
            statements: vec![StatementPayload {
                statement,
                parameters: params,
                include_stats: true,
            }],
        };

        let url = self.endpoint(database);
        tracing::debug!(%url, "POST commit");

        let mut request = self.client.post(url).json(&body);
        if let Some(username) = &self.username {
            request = request.basic_auth(username, self.password.as_deref());
        }

        let response = request
            .send()
            .await
            .map_err(|e| DriverError::Connection(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(DriverError::Connection(format!(
                "authentication rejected ({})",
                status
            )));
        }
        if status.is_server_error() {
            return Err(DriverError::Connection(format!(
                "server responded with {}",
                status
            )));
        }

        let decoded: CommitResponse = response
            .json()
            .await
            .map_err(|e| DriverError::Connection(format!("invalid response body: {}", e)))?;

        into_record_set(decoded)
    }
}
