use crate::error::{PlannerError, Result};
use serde::{Deserialize, Serialize};
use std::{fmt, time::Duration};

const DEFAULT_DATABASE: &str = "TRAVEL_DB";
const DEFAULT_SCHEMA: &str = "PUBLIC";
const DEFAULT_WAREHOUSE: &str = "XSMALL_WH";
const DEFAULT_ROLE: &str = "PUBLIC";
const DEFAULT_SEARCH_SERVICE: &str = "TRAVEL_SEARCH_SERVICE";
const DEFAULT_FLIGHT_MODEL: &str = "@TRAVEL_DB.PUBLIC.DATA/FLIGHT_ANALYTICS.yaml";
const DEFAULT_HOTEL_MODEL: &str = "@TRAVEL_DB.PUBLIC.DATA/HOTEL_ANALYTICS.yaml";
const DEFAULT_MODEL: &str = "anthropic/claude-3.7-sonnet";
const DEFAULT_LLM_BASE_URL: &str = "https://openrouter.ai/api/v1";
const DEFAULT_CALL_TIMEOUT_SECS: u64 = 60;
const DEFAULT_MAX_STEPS: usize = 6;
const DEFAULT_GUIDE_LIMIT: usize = 10;

/// Connection parameters and semantic-model references for one planner.
///
/// Passed into [`crate::TripPlanner`] at construction; nothing here is read
/// from process-wide state after that point.
#[derive(Clone, Serialize, Deserialize)]
pub struct TripConfig {
    /// Snowflake account locator, used to derive service endpoints
    pub account: Option<String>,
    pub database: String,
    pub schema: String,
    pub warehouse: String,
    pub role: String,
    /// Explicit Cortex Analyst endpoint; derived from `account` when unset
    pub analyst_endpoint: Option<String>,
    /// Programmatic access token sent as a bearer token
    #[serde(skip_serializing)]
    pub auth_token: Option<String>,
    pub semantic_model_flights: String,
    pub semantic_model_hotels: String,
    pub search_database: String,
    pub search_schema: String,
    pub search_service: String,
    /// Chat model used for extraction, planning and synthesis
    pub model: String,
    pub llm_base_url: String,
    #[serde(skip_serializing)]
    pub llm_api_key: Option<String>,
    /// Bound applied to every analyst, execution, search and generation call
    pub call_timeout: Duration,
    pub max_steps: usize,
    pub guide_limit: usize,
}

impl Default for TripConfig {
    fn default() -> Self {
        Self {
            account: None,
            database: DEFAULT_DATABASE.to_string(),
            schema: DEFAULT_SCHEMA.to_string(),
            warehouse: DEFAULT_WAREHOUSE.to_string(),
            role: DEFAULT_ROLE.to_string(),
            analyst_endpoint: None,
            auth_token: None,
            semantic_model_flights: DEFAULT_FLIGHT_MODEL.to_string(),
            semantic_model_hotels: DEFAULT_HOTEL_MODEL.to_string(),
            search_database: DEFAULT_DATABASE.to_string(),
            search_schema: DEFAULT_SCHEMA.to_string(),
            search_service: DEFAULT_SEARCH_SERVICE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            llm_base_url: DEFAULT_LLM_BASE_URL.to_string(),
            llm_api_key: None,
            call_timeout: Duration::from_secs(DEFAULT_CALL_TIMEOUT_SECS),
            max_steps: DEFAULT_MAX_STEPS,
            guide_limit: DEFAULT_GUIDE_LIMIT,
        }
    }
}

/// Debug placeholder for a credential.
pub(crate) fn redacted(secret: Option<&str>) -> &'static str {
    match secret {
        Some(value) if !value.is_empty() => "<redacted>",
        _ => "<unset>",
    }
}

impl fmt::Debug for TripConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TripConfig")
            .field("account", &self.account)
            .field("database", &self.database)
            .field("schema", &self.schema)
            .field("warehouse", &self.warehouse)
            .field("role", &self.role)
            .field("analyst_endpoint", &self.analyst_endpoint)
            .field("auth_token", &redacted(self.auth_token.as_deref()))
            .field("semantic_model_flights", &self.semantic_model_flights)
            .field("semantic_model_hotels", &self.semantic_model_hotels)
            .field("search_database", &self.search_database)
            .field("search_schema", &self.search_schema)
            .field("search_service", &self.search_service)
            .field("model", &self.model)
            .field("llm_base_url", &self.llm_base_url)
            .field("llm_api_key", &redacted(self.llm_api_key.as_deref()))
            .field("call_timeout", &self.call_timeout)
            .field("max_steps", &self.max_steps)
            .field("guide_limit", &self.guide_limit)
            .finish()
    }
}

impl TripConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_account(mut self, account: impl Into<String>) -> Self {
        self.account = Some(account.into());
        self
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }

    pub fn with_warehouse(mut self, warehouse: impl Into<String>) -> Self {
        self.warehouse = warehouse.into();
        self
    }

    pub fn with_analyst_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.analyst_endpoint = Some(endpoint.into());
        self
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn with_semantic_models(
        mut self,
        flights: impl Into<String>,
        hotels: impl Into<String>,
    ) -> Self {
        self.semantic_model_flights = flights.into();
        self.semantic_model_hotels = hotels.into();
        self
    }

    pub fn with_search_service(mut self, service: impl Into<String>) -> Self {
        self.search_service = service.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_llm(mut self, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        self.llm_base_url = base_url.into();
        self.llm_api_key = Some(api_key.into());
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_guide_limit(mut self, limit: usize) -> Self {
        self.guide_limit = limit;
        self
    }

    /// Base URL of the Snowflake account REST API.
    pub fn account_url(&self) -> Option<String> {
        self.account
            .as_ref()
            .map(|account| format!("https://{}.snowflakecomputing.com", account))
    }

    /// Cortex Analyst message endpoint, explicit or derived from the account.
    pub fn resolved_analyst_endpoint(&self) -> Option<String> {
        self.analyst_endpoint.clone().or_else(|| {
            self.account_url()
                .map(|base| format!("{}/api/v2/cortex/analyst/message", base))
        })
    }

    /// `DATABASE.SCHEMA.TABLE` for the fallback templates.
    pub fn qualified_table(&self, table: &str) -> String {
        format!("{}.{}.{}", self.database, self.schema, table)
    }

    /// Check the credentials the HTTP backends need.
    pub fn validate(&self) -> Result<()> {
        if self.resolved_analyst_endpoint().is_none() {
            return Err(PlannerError::Config(
                "SNOWFLAKE_ACCOUNT or CORTEX_ANALYST_URL must be set".to_string(),
            ));
        }
        if self.auth_token.as_deref().map_or(true, str::is_empty) {
            return Err(PlannerError::Config(
                "SNOWFLAKE_AUTH_TOKEN is not set".to_string(),
            ));
        }
        if self.llm_api_key.as_deref().map_or(true, str::is_empty) {
            return Err(PlannerError::Config(
                "OPENAI_API_KEY environment variable must be set".to_string(),
            ));
        }
        if self.max_steps == 0 {
            return Err(PlannerError::Config(
                "max_steps must be at least 1".to_string(),
            ));
        }
        if self.call_timeout.is_zero() {
            return Err(PlannerError::Config(
                "call timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Build a config from environment variables on top of the defaults.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        let var = |key: &str| std::env::var(key).ok().filter(|value| !value.is_empty());

        config.account = var("SNOWFLAKE_ACCOUNT");
        if let Some(database) = var("SNOWFLAKE_DATABASE") {
            config.database = database;
        }
        if let Some(schema) = var("SNOWFLAKE_SCHEMA") {
            config.schema = schema;
        }
        if let Some(warehouse) = var("SNOWFLAKE_WAREHOUSE") {
            config.warehouse = warehouse;
        }
        if let Some(role) = var("SNOWFLAKE_ROLE") {
            config.role = role;
        }
        config.analyst_endpoint = var("CORTEX_ANALYST_URL");
        config.auth_token = var("SNOWFLAKE_AUTH_TOKEN");
        if let Some(model) = var("SEMANTIC_MODEL_FILE") {
            config.semantic_model_flights = model;
        }
        if let Some(model) = var("HOTEL_SEMANTIC_MODEL_FILE") {
            config.semantic_model_hotels = model;
        }
        if let Some(database) = var("CORTEX_SEARCH_DATABASE") {
            config.search_database = database;
        }
        if let Some(schema) = var("CORTEX_SEARCH_SCHEMA") {
            config.search_schema = schema;
        }
        if let Some(service) = var("CORTEX_SEARCH_SERVICE") {
            config.search_service = service;
        }
        if let Some(model) = var("MODEL_ID") {
            config.model = model;
        }
        if let Some(base_url) = var("OPENAI_BASE_URL").or_else(|| var("OPENROUTER_BASE_URL")) {
            config.llm_base_url = base_url;
        }
        config.llm_api_key = var("OPENAI_API_KEY");

        if let Some(raw) = var("TRIPWISE_MAX_STEPS") {
            config.max_steps = raw.parse().map_err(|err| {
                PlannerError::Config(format!("TRIPWISE_MAX_STEPS is not a number: {}", err))
            })?;
        }
        if let Some(raw) = var("TRIPWISE_CALL_TIMEOUT_SECS") {
            let secs: u64 = raw.parse().map_err(|err| {
                PlannerError::Config(format!(
                    "TRIPWISE_CALL_TIMEOUT_SECS is not a number: {}",
                    err
                ))
            })?;
            config.call_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TripConfig::default();
        assert_eq!(config.database, "TRAVEL_DB");
        assert_eq!(config.max_steps, 6);
        assert_eq!(config.call_timeout, Duration::from_secs(60));
        assert_eq!(config.qualified_table("FLIGHTS"), "TRAVEL_DB.PUBLIC.FLIGHTS");
    }

    #[test]
    fn test_analyst_endpoint_derived_from_account() {
        let config = TripConfig::new().with_account("xy12345");
        assert_eq!(
            config.resolved_analyst_endpoint().as_deref(),
            Some("https://xy12345.snowflakecomputing.com/api/v2/cortex/analyst/message")
        );

        let explicit = config.with_analyst_endpoint("http://localhost/analyst");
        assert_eq!(
            explicit.resolved_analyst_endpoint().as_deref(),
            Some("http://localhost/analyst")
        );
    }

    #[test]
    fn test_validate_reports_missing_token() {
        let config = TripConfig::new()
            .with_account("xy12345")
            .with_llm("http://localhost", "key");
        let err = config.validate().unwrap_err();
        assert_eq!(err.error_code(), "CONFIG_ERROR");
        assert!(err.to_string().contains("SNOWFLAKE_AUTH_TOKEN"));

        assert!(config.with_auth_token("pat").validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let config = TripConfig::new()
            .with_account("xy12345")
            .with_auth_token("pat")
            .with_llm("http://localhost", "key")
            .with_call_timeout(Duration::ZERO);
        let err = config.validate().unwrap_err();
        assert_eq!(err.error_code(), "CONFIG_ERROR");
        assert!(err.to_string().contains("timeout"));
    }

    #[test]
    fn test_debug_redacts_credentials() {
        let config = TripConfig::new()
            .with_auth_token("pat-123")
            .with_llm("http://localhost", "sk-456");
        let printed = format!("{:?}", config);
        assert!(!printed.contains("pat-123"));
        assert!(!printed.contains("sk-456"));
        assert!(printed.contains("auth_token: \"<redacted>\""));

        let printed = format!("{:?}", TripConfig::default());
        assert!(printed.contains("llm_api_key: \"<unset>\""));
    }
}
