use crate::{
    config::TripConfig,
    core::context::TripContext,
    error::{PlannerError, Result},
    services::{
        analyst::{Analyst, CortexAnalystClient},
        batch,
        execution::{self, LoopOutcome},
        extraction::{self, EXTRACTION_FAILED},
        generation::Generator,
        openai_client::OpenAIClient,
        resolver::QueryResolver,
        search::{CortexSearchClient, GuideSearch},
        synthesis,
        warehouse::{QueryExecutor, SqlApiExecutor},
    },
    types::{
        intent::TripIntent,
        request::{Mode, TripRequest, TripResponse},
        resolution::ResolutionResult,
    },
};
use std::{fmt, sync::Arc};
use tracing::info;

/// Entry point: turns a free-text trip request into a recommendation.
pub struct TripPlanner {
    config: Arc<TripConfig>,
    generator: Arc<dyn Generator>,
    resolver: QueryResolver,
}

impl TripPlanner {
    pub fn new(
        config: TripConfig,
        generator: Arc<dyn Generator>,
        analyst: Arc<dyn Analyst>,
        executor: Arc<dyn QueryExecutor>,
        search: Arc<dyn GuideSearch>,
    ) -> Self {
        let config = Arc::new(config);
        let resolver = QueryResolver::new(analyst, executor, search, Arc::clone(&config));
        Self {
            config,
            generator,
            resolver,
        }
    }

    /// Build a planner backed by the HTTP clients.
    pub fn from_config(config: TripConfig) -> Result<Self> {
        config.validate()?;

        let endpoint = config.resolved_analyst_endpoint().ok_or_else(|| {
            PlannerError::Config("SNOWFLAKE_ACCOUNT or CORTEX_ANALYST_URL must be set".to_string())
        })?;
        let token = config.auth_token.clone().unwrap_or_default();
        let api_key = config.llm_api_key.clone().unwrap_or_default();

        let generator = OpenAIClient::new(api_key, config.model.clone())
            .with_base_url(config.llm_base_url.clone())
            .with_timeout(config.call_timeout);
        let analyst = CortexAnalystClient::new(endpoint, token);
        let executor = SqlApiExecutor::from_config(&config)?;
        let search = CortexSearchClient::from_config(&config)?;

        Ok(Self::new(
            config,
            Arc::new(generator),
            Arc::new(analyst),
            Arc::new(executor),
            Arc::new(search),
        ))
    }

    pub fn from_env() -> Result<Self> {
        Self::from_config(TripConfig::from_env()?)
    }

    pub fn config(&self) -> &TripConfig {
        &self.config
    }

    pub fn resolver(&self) -> &QueryResolver {
        &self.resolver
    }

    pub async fn extract(&self, text: &str) -> Option<TripIntent> {
        extraction::extract_trip_intent(self.generator.as_ref(), text, self.config.call_timeout)
            .await
    }

    pub async fn resolve_flights(&self, from: &str, to: &str) -> ResolutionResult {
        self.resolver.resolve_flights(from, to).await
    }

    pub async fn resolve_hotels(&self, city: &str) -> ResolutionResult {
        self.resolver.resolve_hotels(city).await
    }

    pub async fn resolve_all(&self, intent: &TripIntent, raw_text: &str) -> TripContext {
        batch::resolve_all(&self.resolver, intent, raw_text).await
    }

    pub async fn run_action_loop(&self, intent: &TripIntent, raw_text: &str) -> LoopOutcome {
        execution::run_action_loop(
            self.generator.as_ref(),
            &self.resolver,
            intent,
            raw_text,
            self.config.max_steps,
            self.config.call_timeout,
        )
        .await
    }

    pub async fn synthesize(&self, raw_text: &str, context: &TripContext) -> String {
        synthesis::synthesize(
            self.generator.as_ref(),
            raw_text,
            context,
            self.config.call_timeout,
        )
        .await
    }

    /// Serve one request end to end. Every failure ends up in the response.
    pub async fn handle(&self, request: TripRequest) -> TripResponse {
        let prompt = request.prompt.trim();
        if prompt.is_empty() {
            return TripResponse::failure("Prompt must not be empty.");
        }

        let Some(intent) = self.extract(prompt).await else {
            return TripResponse::failure(EXTRACTION_FAILED);
        };

        info!(mode = ?request.mode, source = %intent.source_city, "handling trip request");

        let (context, react_trace) = match request.mode {
            Mode::Standard => (self.resolve_all(&intent, prompt).await, None),
            Mode::React => {
                let outcome = self.run_action_loop(&intent, prompt).await;
                (outcome.context, Some(outcome.trace.into_steps()))
            }
        };

        let recommendation = self.synthesize(prompt, &context).await;

        TripResponse::Plan {
            best_trip_recommendation: recommendation,
            raw_context: context,
            react_trace,
        }
    }
}

impl fmt::Debug for TripPlanner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TripPlanner")
            .field("config", &self.config)
            .field("resolver", &self.resolver)
            .finish_non_exhaustive()
    }
}
