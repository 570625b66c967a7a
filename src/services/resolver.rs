use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::{
    config::TripConfig,
    core::context::GuideResult,
    services::{
        analyst::Analyst,
        fallback::{rank_rows, FallbackTemplate},
        generation::bounded,
        search::{guide_text_from_passages, GuideSearch},
        warehouse::QueryExecutor,
    },
    types::{
        intent::TripIntent,
        resolution::{Domain, FallbackUsed, QuerySubject, ResolutionResult},
    },
};

/// Resolves flight legs, hotel cities and guide queries into results.
///
/// Resolution never fails: analyst errors, execution errors and timeouts are
/// recorded on the returned [`ResolutionResult`] and the fallback templates
/// take over. Cloning is cheap, every capability sits behind an `Arc`.
#[derive(Clone)]
pub struct QueryResolver {
    analyst: Arc<dyn Analyst>,
    executor: Arc<dyn QueryExecutor>,
    search: Arc<dyn GuideSearch>,
    config: Arc<TripConfig>,
}

impl QueryResolver {
    pub fn new(
        analyst: Arc<dyn Analyst>,
        executor: Arc<dyn QueryExecutor>,
        search: Arc<dyn GuideSearch>,
        config: Arc<TripConfig>,
    ) -> Self {
        Self {
            analyst,
            executor,
            search,
            config,
        }
    }

    pub fn config(&self) -> &TripConfig {
        &self.config
    }

    pub async fn resolve_flights(&self, from: &str, to: &str) -> ResolutionResult {
        self.resolve(QuerySubject::flights(from, to)).await
    }

    pub async fn resolve_hotels(&self, city: &str) -> ResolutionResult {
        self.resolve(QuerySubject::hotels(city)).await
    }

    /// Skip the analyst and go straight to the flight templates.
    pub async fn force_fallback_flights(&self, from: &str, to: &str) -> ResolutionResult {
        self.force_fallback(QuerySubject::flights(from, to)).await
    }

    /// Skip the analyst and go straight to the hotel template.
    pub async fn force_fallback_hotels(&self, city: &str) -> ResolutionResult {
        self.force_fallback(QuerySubject::hotels(city)).await
    }

    /// Guide search for the trip's destinations, or the raw text when the
    /// trip has no destination other than the source.
    pub async fn search_guide(&self, intent: &TripIntent, raw_text: &str) -> GuideResult {
        let subject = QuerySubject::Guide {
            destinations: intent.guide_destinations(),
            text: raw_text.to_string(),
        };
        self.search_guide_query(&subject.question()).await
    }

    pub async fn search_guide_query(&self, query: &str) -> GuideResult {
        let mut guide = GuideResult {
            query: query.to_string(),
            ..GuideResult::default()
        };

        let call = self.search.search(query, self.config.guide_limit);
        match bounded("guide search", self.config.call_timeout, call).await {
            Ok(passages) => {
                let text = guide_text_from_passages(&passages);
                info!(
                    target: "tripwise::resolver",
                    query,
                    passages = passages.len(),
                    "guide search finished"
                );
                guide.guide_text = (!text.is_empty()).then_some(text);
                guide.passages = passages;
            }
            Err(err) => {
                warn!(target: "tripwise::resolver", query, error = %err, "guide search failed");
                guide.error = Some(err.to_string());
            }
        }

        guide
    }

    async fn resolve(&self, subject: QuerySubject) -> ResolutionResult {
        let mut result = ResolutionResult::new(subject);
        let question = result.subject.question();
        let model = match result.subject.domain() {
            Domain::Hotels => self.config.semantic_model_hotels.as_str(),
            _ => self.config.semantic_model_flights.as_str(),
        };

        let ask = self.analyst.ask(&question, model);
        match bounded("analyst", self.config.call_timeout, ask).await {
            Ok(reply) => {
                result.analyst_text = reply.text;
                result.suggestions = reply.suggestions;

                match reply.query {
                    None => result.notes.push("analyst_no_sql".to_string()),
                    Some(query) => {
                        result.query = Some(query.clone());
                        let execute = self.executor.execute(&query);
                        match bounded("query execution", self.config.call_timeout, execute).await {
                            Ok(rows) if rows.is_empty() => {
                                result.notes.push("analyst_sql_empty_rows".to_string());
                            }
                            Ok(rows) => {
                                result.rows = rows;
                                info!(
                                    target: "tripwise::resolver",
                                    subject = %result.subject,
                                    rows = result.rows.len(),
                                    "resolved through analyst"
                                );
                                return result;
                            }
                            Err(err) => {
                                result.notes.push(format!("analyst_sql_error={}", err));
                                result.error = Some(err.to_string());
                            }
                        }
                    }
                }
            }
            Err(err) => {
                result.notes.push(format!("analyst_error={}", err));
                result.error = Some(err.to_string());
            }
        }

        debug!(
            target: "tripwise::resolver",
            subject = %result.subject,
            reasons = ?result.notes,
            "analyst path produced no rows"
        );

        let chain = FallbackTemplate::chain_for(&result.subject);
        self.run_templates(result, chain, FallbackTemplate::fallback_used)
            .await
    }

    async fn force_fallback(&self, subject: QuerySubject) -> ResolutionResult {
        let mut result = ResolutionResult::new(subject);
        result.notes.push("forced_fallback".to_string());

        let chain = FallbackTemplate::chain_for(&result.subject);
        self.run_templates(result, chain, forced_label).await
    }

    /// Try each template in order; the first one with rows wins.
    async fn run_templates(
        &self,
        mut result: ResolutionResult,
        chain: &[FallbackTemplate],
        label: fn(&FallbackTemplate) -> FallbackUsed,
    ) -> ResolutionResult {
        let mut tried = Vec::new();

        for template in chain {
            let Some(query) = template.render(&self.config, &result.subject) else {
                continue;
            };
            tried.push(template.name());

            let execute = self.executor.execute(&query);
            match bounded(template.name(), self.config.call_timeout, execute).await {
                Ok(rows) if !rows.is_empty() => {
                    result.rows = rank_rows(*template, rows);
                    result.fallback_used = label(template);
                    result.query = Some(query);
                    result.notes.push(format!("Used {}", template.name()));
                    info!(
                        target: "tripwise::resolver",
                        subject = %result.subject,
                        template = template.name(),
                        fallback = result.fallback_used.as_str(),
                        rows = result.rows.len(),
                        "resolved through fallback"
                    );
                    return result;
                }
                Ok(_) => {}
                Err(err) => {
                    result.notes.push(format!("{}_error={}", template.name(), err));
                }
            }
        }

        let tried = if tried.is_empty() {
            "nothing".to_string()
        } else {
            tried.join(", ")
        };
        result.notes.push(format!(
            "No {} data available for {}; tried: {}",
            result.subject.domain(),
            result.subject,
            tried
        ));
        result.rows.clear();
        result.fallback_used = FallbackUsed::NoneAvailable;

        warn!(
            target: "tripwise::resolver",
            subject = %result.subject,
            "no data available"
        );
        result
    }
}

fn forced_label(template: &FallbackTemplate) -> FallbackUsed {
    match template {
        FallbackTemplate::Outbound => FallbackUsed::ForcedOutbound,
        FallbackTemplate::HotelsBasic => FallbackUsed::ForcedHotels,
        other => other.fallback_used(),
    }
}

impl std::fmt::Debug for QueryResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryResolver")
            .field("database", &self.config.database)
            .field("schema", &self.config.schema)
            .finish_non_exhaustive()
    }
}
