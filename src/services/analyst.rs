use std::fmt;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::{
    config::redacted,
    error::{PlannerError, Result},
};

/// Parsed reply of the natural-language-to-SQL analyst.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalystReply {
    pub text: Option<String>,
    pub query: Option<String>,
    pub suggestions: Vec<String>,
}

/// Natural-language analyst capability.
#[async_trait]
pub trait Analyst: Send + Sync {
    async fn ask(&self, question: &str, semantic_model: &str) -> Result<AnalystReply>;
}

/// Cortex Analyst REST client authenticated with a programmatic access token.
#[derive(Clone)]
pub struct CortexAnalystClient {
    endpoint: String,
    token: String,
    client: Client,
}

impl CortexAnalystClient {
    pub fn new(endpoint: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            token: token.into(),
            client: Client::new(),
        }
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }
}

impl fmt::Debug for CortexAnalystClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CortexAnalystClient")
            .field("endpoint", &self.endpoint)
            .field("token", &redacted(Some(&self.token)))
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Analyst for CortexAnalystClient {
    async fn ask(&self, question: &str, semantic_model: &str) -> Result<AnalystReply> {
        let body = json!({
            "messages": [{
                "role": "user",
                "content": [{"type": "text", "text": question}]
            }],
            "semantic_model_file": semantic_model
        });

        debug!(target: "tripwise::http", question, semantic_model, "calling analyst");

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Content-Type", "application/json")
            .header(
                "X-Snowflake-Authorization-Token-Type",
                "PROGRAMMATIC_ACCESS_TOKEN",
            )
            .json(&body)
            .send()
            .await
            .map_err(|err| PlannerError::Analyst(format!("request failed: {}", err)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| PlannerError::Analyst(format!("failed to read response: {}", err)))?;

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(PlannerError::Analyst(format!(
                "authentication failed (HTTP {}): {}",
                status.as_u16(),
                text
            )));
        }

        if !status.is_success() {
            return Err(PlannerError::Analyst(format!(
                "HTTP {}: {}",
                status.as_u16(),
                text
            )));
        }

        let payload: Value = serde_json::from_str(&text)
            .map_err(|err| PlannerError::Analyst(format!("invalid JSON response: {}", err)))?;

        Ok(parse_analyst_message(&payload))
    }
}

/// Read the first text block, the first SQL statement and all suggestions
/// out of an analyst `message.content` list.
pub fn parse_analyst_message(payload: &Value) -> AnalystReply {
    let mut reply = AnalystReply::default();

    let contents = payload
        .get("message")
        .and_then(|message| message.get("content"))
        .and_then(Value::as_array);

    for content in contents.into_iter().flatten() {
        match content.get("type").and_then(Value::as_str) {
            Some("text") if reply.text.is_none() => {
                reply.text = content.get("text").and_then(Value::as_str).map(str::to_string);
            }
            Some("sql") if reply.query.is_none() => {
                reply.query = content
                    .get("statement")
                    .or_else(|| content.get("sql"))
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .filter(|sql| !sql.is_empty())
                    .map(str::to_string);
            }
            Some("suggestions") => {
                if let Some(items) = content.get("suggestions").and_then(Value::as_array) {
                    reply.suggestions.extend(items.iter().map(|item| match item {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    }));
                }
            }
            _ => {}
        }
    }

    reply
}
