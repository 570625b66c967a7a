use std::{fmt, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::{
    config::{redacted, TripConfig},
    error::{PlannerError, Result},
    types::resolution::Record,
};

const STATEMENT_PATH: &str = "/api/v2/statements";
const MAX_STATUS_POLLS: usize = 20;
const STATUS_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Relational execution capability: run one statement, get flat rows back.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn execute(&self, query: &str) -> Result<Vec<Record>>;
}

/// Snowflake SQL REST API executor.
#[derive(Clone)]
pub struct SqlApiExecutor {
    base_url: String,
    token: String,
    database: String,
    schema: String,
    warehouse: String,
    role: String,
    statement_timeout_secs: u64,
    client: Client,
}

impl SqlApiExecutor {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        let defaults = TripConfig::default();
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            database: defaults.database,
            schema: defaults.schema,
            warehouse: defaults.warehouse,
            role: defaults.role,
            statement_timeout_secs: defaults.call_timeout.as_secs(),
            client: Client::new(),
        }
    }

    pub fn from_config(config: &TripConfig) -> Result<Self> {
        let base_url = config.account_url().ok_or_else(|| {
            PlannerError::Config("SNOWFLAKE_ACCOUNT is required for SQL execution".to_string())
        })?;
        let token = config.auth_token.clone().ok_or_else(|| {
            PlannerError::Config("SNOWFLAKE_AUTH_TOKEN is not set".to_string())
        })?;

        Ok(Self {
            database: config.database.clone(),
            schema: config.schema.clone(),
            warehouse: config.warehouse.clone(),
            role: config.role.clone(),
            statement_timeout_secs: config.call_timeout.as_secs(),
            ..Self::new(base_url, token)
        })
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<(StatusCode, Value)> {
        let response = request
            .header("Authorization", format!("Bearer {}", self.token))
            .header(
                "X-Snowflake-Authorization-Token-Type",
                "PROGRAMMATIC_ACCESS_TOKEN",
            )
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|err| PlannerError::Execution(format!("request failed: {}", err)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| PlannerError::Execution(format!("failed to read response: {}", err)))?;

        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
        Ok((status, body))
    }
}

impl fmt::Debug for SqlApiExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqlApiExecutor")
            .field("base_url", &self.base_url)
            .field("token", &redacted(Some(&self.token)))
            .field("database", &self.database)
            .field("schema", &self.schema)
            .field("warehouse", &self.warehouse)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl QueryExecutor for SqlApiExecutor {
    async fn execute(&self, query: &str) -> Result<Vec<Record>> {
        let body = json!({
            "statement": query,
            "timeout": self.statement_timeout_secs,
            "database": self.database,
            "schema": self.schema,
            "warehouse": self.warehouse,
            "role": self.role,
        });

        debug!(target: "tripwise::http", query, "executing statement");

        let url = format!("{}{}", self.base_url, STATEMENT_PATH);
        let (mut status, mut payload) = self.send(self.client.post(&url).json(&body)).await?;

        let mut polls = 0;
        while status == StatusCode::ACCEPTED {
            if polls == MAX_STATUS_POLLS {
                return Err(PlannerError::Execution(
                    "statement still running after polling limit".to_string(),
                ));
            }
            let status_url = payload
                .get("statementStatusUrl")
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    PlannerError::Execution("accepted statement has no status URL".to_string())
                })?;
            let status_url = format!("{}{}", self.base_url, status_url);

            tokio::time::sleep(STATUS_POLL_INTERVAL).await;
            polls += 1;
            (status, payload) = self.send(self.client.get(&status_url)).await?;
        }

        if !status.is_success() {
            let message = payload
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| payload.to_string());
            return Err(PlannerError::Execution(format!(
                "HTTP {}: {}",
                status.as_u16(),
                message
            )));
        }

        rows_from_result_set(&payload)
    }
}

/// Convert a SQL API result set (column metadata plus string-encoded cells)
/// into typed records.
pub fn rows_from_result_set(payload: &Value) -> Result<Vec<Record>> {
    let columns = payload
        .get("resultSetMetaData")
        .and_then(|meta| meta.get("rowType"))
        .and_then(Value::as_array)
        .ok_or_else(|| {
            PlannerError::Execution("result set is missing column metadata".to_string())
        })?;

    let data: &[Value] = match payload.get("data") {
        Some(Value::Array(rows)) => rows.as_slice(),
        Some(Value::Null) | None => &[],
        Some(other) => {
            return Err(PlannerError::Execution(format!(
                "unexpected result data: {}",
                other
            )))
        }
    };

    let rows = data
        .iter()
        .filter_map(Value::as_array)
        .map(|cells| {
            let mut record = Map::new();
            for (column, cell) in columns.iter().zip(cells) {
                let name = column
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                record.insert(name, typed_cell(column, cell));
            }
            record
        })
        .collect();

    Ok(rows)
}

fn typed_cell(column: &Value, cell: &Value) -> Value {
    let Some(raw) = cell.as_str() else {
        return cell.clone();
    };

    let kind = column
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or("text")
        .to_ascii_lowercase();
    let scale = column.get("scale").and_then(Value::as_u64).unwrap_or(0);

    match kind.as_str() {
        "fixed" if scale == 0 => raw
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(raw.to_string())),
        "fixed" | "real" | "float" => raw
            .parse::<f64>()
            .ok()
            .and_then(|n| serde_json::Number::from_f64(n).map(Value::Number))
            .unwrap_or_else(|| Value::String(raw.to_string())),
        "boolean" => match raw {
            "true" | "TRUE" | "1" => Value::Bool(true),
            "false" | "FALSE" | "0" => Value::Bool(false),
            _ => Value::String(raw.to_string()),
        },
        "object" | "variant" | "array" => {
            serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
        }
        _ => Value::String(raw.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_are_typed_from_row_type() {
        let payload = json!({
            "resultSetMetaData": {
                "rowType": [
                    {"name": "AIRLINE", "type": "text"},
                    {"name": "PRICE", "type": "fixed", "scale": 0},
                    {"name": "RATING", "type": "fixed", "scale": 1},
                    {"name": "REFUNDABLE", "type": "boolean"},
                    {"name": "OUTBOUND", "type": "object"}
                ]
            },
            "data": [
                ["IndiGo", "4500", "4.5", "true", "{\"SOURCE\":\"Delhi\"}"],
                ["Vistara", null, "3.0", "false", "{}"]
            ]
        });

        let rows = rows_from_result_set(&payload).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["AIRLINE"], "IndiGo");
        assert_eq!(rows[0]["PRICE"], 4500);
        assert_eq!(rows[0]["RATING"], 4.5);
        assert_eq!(rows[0]["REFUNDABLE"], true);
        assert_eq!(rows[0]["OUTBOUND"]["SOURCE"], "Delhi");
        assert!(rows[1]["PRICE"].is_null());
    }

    #[test]
    fn test_empty_result_set() {
        let payload = json!({"resultSetMetaData": {"rowType": []}, "data": []});
        assert!(rows_from_result_set(&payload).unwrap().is_empty());
    }

    #[test]
    fn test_missing_metadata_is_an_error() {
        let err = rows_from_result_set(&json!({"data": [["x"]]})).unwrap_err();
        assert_eq!(err.error_code(), "EXECUTION_ERROR");
    }
}
