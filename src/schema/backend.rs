//! Access to the relational backend.
//!
//! Two operations are consumed: a generic "run query, return rows" remote
//! call used for metadata introspection, and a direct table probe used when
//! metadata access is unavailable.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use super::queries;

/// Errors that can occur while talking to the schema backend.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("request timed out")]
    Timeout,
    #[error("rate limited by backend")]
    RateLimited,
    #[error("not authorized (HTTP {0})")]
    Unauthorized(u16),
    #[error("metadata query access unavailable: {0}")]
    MetadataUnavailable(String),
    #[error("backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("could not decode backend response: {0}")]
    Decode(String),
}

/// Read-only access to a relational backend.
#[async_trait]
pub trait SchemaBackend: Send + Sync {
    /// Human-readable identity of the backend (usually its URL).
    fn source(&self) -> String;

    /// Run a metadata query and return its rows as JSON objects.
    async fn run_query(&self, sql: &str) -> Result<Vec<Value>, SchemaError>;

    /// Check whether a table is reachable through direct data access.
    async fn probe_table(&self, table: &str) -> Result<bool, SchemaError>;
}

/// Backend reached over the PostgREST-style HTTP API.
pub struct RestBackend {
    http: Client,
    url: String,
    api_key: String,
    timeout: Duration,
}

impl RestBackend {
    pub fn new(url: &str, api_key: &str, timeout: Duration) -> Result<Self, SchemaError> {
        let http = Client::builder()
            .user_agent(concat!("groundcheck/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            url: url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            timeout,
        })
    }

    fn map_send_error(e: reqwest::Error) -> SchemaError {
        if e.is_timeout() {
            SchemaError::Timeout
        } else {
            SchemaError::Network(e)
        }
    }
}

#[async_trait]
impl SchemaBackend for RestBackend {
    fn source(&self) -> String {
        self.url.clone()
    }

    async fn run_query(&self, sql: &str) -> Result<Vec<Value>, SchemaError> {
        let url = format!("{}/rest/v1/rpc/execute_sql", self.url);
        debug!(facet = queries::facet_of(sql).unwrap_or("adhoc"), "running metadata query");

        let response = self
            .http
            .post(&url)
            .timeout(self.timeout)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .json(&json!({ "query": sql }))
            .send()
            .await
            .map_err(Self::map_send_error)?;

        let status = response.status().as_u16();
        match status {
            200 => {
                let body: Value = response
                    .json()
                    .await
                    .map_err(|e| SchemaError::Decode(e.to_string()))?;
                Ok(rows_from_body(body))
            }
            204 => Ok(Vec::new()),
            401 | 403 => Err(SchemaError::Unauthorized(status)),
            404 => Err(SchemaError::MetadataUnavailable(
                "execute_sql function not exposed".to_string(),
            )),
            429 => Err(SchemaError::RateLimited),
            _ => {
                let body = response.text().await.unwrap_or_default();
                Err(SchemaError::Status { status, body })
            }
        }
    }

    async fn probe_table(&self, table: &str) -> Result<bool, SchemaError> {
        let url = format!("{}/rest/v1/{}?select=*&limit=1", self.url, table);

        let response = self
            .http
            .get(&url)
            .timeout(self.timeout)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(Self::map_send_error)?;

        match response.status().as_u16() {
            200 | 206 => Ok(true),
            429 => Err(SchemaError::RateLimited),
            _ => Ok(false),
        }
    }
}

/// Normalize a query response body into a list of row objects.
fn rows_from_body(body: Value) -> Vec<Value> {
    match body {
        Value::Array(rows) => rows,
        Value::Null => Vec::new(),
        // Some deployments wrap results as {"rows": [...]} or return one object.
        Value::Object(mut map) => match map.remove("rows") {
            Some(Value::Array(rows)) => rows,
            _ => vec![Value::Object(map)],
        },
        other => vec![other],
    }
}

/// In-memory backend answering queries by facet.
///
/// Used for offline runs against a hand-written schema and in tests.
#[derive(Default)]
pub struct StaticBackend {
    facets: HashMap<String, Vec<Value>>,
    failing: HashSet<String>,
    tables: HashSet<String>,
    metadata_available: bool,
    unreachable: bool,
}

impl StaticBackend {
    pub fn new() -> Self {
        Self {
            metadata_available: true,
            ..Default::default()
        }
    }

    /// Rows returned for a facet (`tables`, `columns`, `functions`, ...).
    pub fn with_rows(mut self, facet: &str, rows: Vec<Value>) -> Self {
        self.facets.insert(facet.to_string(), rows);
        self
    }

    /// Make every query for a facet fail.
    pub fn with_failing_facet(mut self, facet: &str) -> Self {
        self.failing.insert(facet.to_string());
        self
    }

    /// A table that answers data-access probes.
    pub fn with_table(mut self, table: &str) -> Self {
        self.tables.insert(table.to_string());
        self
    }

    /// Reject all metadata queries, forcing the probe fallback.
    pub fn without_metadata_access(mut self) -> Self {
        self.metadata_available = false;
        self
    }

    /// Fail every operation as if the backend were down.
    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }
}

#[async_trait]
impl SchemaBackend for StaticBackend {
    fn source(&self) -> String {
        "static".to_string()
    }

    async fn run_query(&self, sql: &str) -> Result<Vec<Value>, SchemaError> {
        if self.unreachable {
            return Err(SchemaError::Timeout);
        }
        if !self.metadata_available {
            return Err(SchemaError::MetadataUnavailable("disabled".to_string()));
        }
        let facet = queries::facet_of(sql).unwrap_or("");
        if self.failing.contains(facet) {
            return Err(SchemaError::Status {
                status: 500,
                body: format!("facet {} failed", facet),
            });
        }
        if facet == "ping" {
            return Ok(vec![json!({ "ok": 1 })]);
        }
        Ok(self.facets.get(facet).cloned().unwrap_or_default())
    }

    async fn probe_table(&self, table: &str) -> Result<bool, SchemaError> {
        if self.unreachable {
            return Err(SchemaError::Timeout);
        }
        Ok(self.tables.contains(table))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_from_body_shapes() {
        assert_eq!(rows_from_body(json!([{"a": 1}, {"a": 2}])).len(), 2);
        assert!(rows_from_body(Value::Null).is_empty());
        assert_eq!(rows_from_body(json!({"rows": [{"a": 1}]})).len(), 1);
        assert_eq!(rows_from_body(json!({"a": 1})), vec![json!({"a": 1})]);
    }

    #[tokio::test]
    async fn test_static_backend_by_facet() {
        let backend = StaticBackend::new()
            .with_rows("extensions", vec![json!({"extname": "uuid-ossp"})])
            .with_failing_facet("views");

        let rows = backend
            .run_query(&queries::render(queries::EXTENSIONS))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert!(backend
            .run_query(&queries::render(queries::VIEWS))
            .await
            .is_err());
        assert!(backend
            .run_query(&queries::render(queries::ENUMS))
            .await
            .unwrap()
            .is_empty());
    }
}
