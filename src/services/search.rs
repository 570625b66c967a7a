use std::fmt;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

use crate::{
    config::{redacted, TripConfig},
    error::{PlannerError, Result},
};

const CHUNK_COLUMN: &str = "CHUNK";

/// Semantic search capability over travel guide passages.
#[async_trait]
pub trait GuideSearch: Send + Sync {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Value>>;
}

/// Cortex Search REST client.
#[derive(Clone)]
pub struct CortexSearchClient {
    query_url: String,
    token: String,
    client: Client,
}

impl CortexSearchClient {
    pub fn new(query_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            query_url: query_url.into(),
            token: token.into(),
            client: Client::new(),
        }
    }

    pub fn from_config(config: &TripConfig) -> Result<Self> {
        let base = config.account_url().ok_or_else(|| {
            PlannerError::Config("SNOWFLAKE_ACCOUNT is required for guide search".to_string())
        })?;
        let token = config.auth_token.clone().ok_or_else(|| {
            PlannerError::Config("SNOWFLAKE_AUTH_TOKEN is not set".to_string())
        })?;

        let query_url = format!(
            "{}/api/v2/databases/{}/schemas/{}/cortex-search-services/{}:query",
            base, config.search_database, config.search_schema, config.search_service
        );
        Ok(Self::new(query_url, token))
    }
}

impl fmt::Debug for CortexSearchClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CortexSearchClient")
            .field("query_url", &self.query_url)
            .field("token", &redacted(Some(&self.token)))
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl GuideSearch for CortexSearchClient {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Value>> {
        let body = json!({
            "query": query,
            "columns": [CHUNK_COLUMN],
            "limit": limit,
        });

        debug!(target: "tripwise::http", query, limit, "searching guides");

        let response = self
            .client
            .post(&self.query_url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header(
                "X-Snowflake-Authorization-Token-Type",
                "PROGRAMMATIC_ACCESS_TOKEN",
            )
            .json(&body)
            .send()
            .await
            .map_err(|err| PlannerError::Search(format!("request failed: {}", err)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(PlannerError::Search(format!(
                "HTTP {}: {}",
                status.as_u16(),
                text
            )));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|err| PlannerError::Search(format!("invalid JSON response: {}", err)))?;

        // Newer endpoints answer with `results`, the Python SDK shape uses `data`
        let passages = payload
            .get("results")
            .or_else(|| payload.get("data"))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        Ok(passages)
    }
}

/// Join the text chunks of guide passages into one guide text.
pub fn guide_text_from_passages(passages: &[Value]) -> String {
    passages
        .iter()
        .filter_map(|passage| match passage {
            Value::String(text) => Some(text.as_str()),
            other => other
                .get(CHUNK_COLUMN)
                .or_else(|| other.get("chunk"))
                .and_then(Value::as_str),
        })
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guide_text_joins_chunks() {
        let passages = vec![
            json!({"CHUNK": "Shaniwar Wada is a fortification in Pune."}),
            json!({"chunk": "Aga Khan Palace."}),
            json!({"CHUNK": "   "}),
            json!({"OTHER": 1}),
            json!("Sinhagad fort trek."),
        ];
        assert_eq!(
            guide_text_from_passages(&passages),
            "Shaniwar Wada is a fortification in Pune.\nAga Khan Palace.\nSinhagad fort trek."
        );
    }

    #[test]
    fn test_query_url_from_config() {
        let config = TripConfig::new()
            .with_account("xy12345")
            .with_auth_token("pat");
        let client = CortexSearchClient::from_config(&config).unwrap();
        assert_eq!(
            client.query_url,
            "https://xy12345.snowflakecomputing.com/api/v2/databases/TRAVEL_DB/schemas/PUBLIC/cortex-search-services/TRAVEL_SEARCH_SERVICE:query"
        );
    }
}
