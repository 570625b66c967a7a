use std::time::Duration;

use serde_json::{json, Value};
use tracing::{info, warn};

use crate::{
    core::{
        context::TripContext,
        memory::ActionTrace,
        steps::{ActionStep, Observation, PlanStep, TripAction},
    },
    schemas::validation::decode_model_text,
    services::{
        generation::{bounded, Generator},
        planning::{build_planning_request, PLANNER_SYSTEM_PROMPT},
        resolver::QueryResolver,
    },
    types::intent::TripIntent,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopState {
    Running,
    Finished,
}

/// Final context and the full trace of an action loop run.
#[derive(Debug, Clone)]
pub struct LoopOutcome {
    pub context: TripContext,
    pub trace: ActionTrace,
}

/// Let the model pick one action per step until it finishes or `max_steps`
/// actions have been executed.
///
/// Planning failures and unparseable replies end the loop with a `finish`
/// step; the context gathered so far is returned as is.
pub async fn run_action_loop(
    generator: &dyn Generator,
    resolver: &QueryResolver,
    intent: &TripIntent,
    raw_text: &str,
    max_steps: usize,
    timeout: Duration,
) -> LoopOutcome {
    let mut context = TripContext::new(intent.clone());
    let mut trace = ActionTrace::new();
    let mut state = LoopState::Running;
    let mut step = 0;

    while state == LoopState::Running && step < max_steps {
        step += 1;

        let plan = next_step(generator, intent, &trace, &context, step, max_steps, timeout).await;
        let action = TripAction::parse(&plan.action);
        let args = if plan.args.is_object() {
            plan.args
        } else {
            json!({})
        };

        let observation = if action == TripAction::Finish {
            state = LoopState::Finished;
            Observation::finished()
        } else {
            execute_action(resolver, intent, raw_text, &mut context, &action, &args).await
        };

        trace.push(ActionStep {
            thought: plan.thought,
            action,
            args,
            observation,
        });
    }

    if state == LoopState::Running {
        info!(target: "tripwise::steps", max_steps, "step limit reached without finish");
    }

    LoopOutcome { context, trace }
}

async fn next_step(
    generator: &dyn Generator,
    intent: &TripIntent,
    trace: &ActionTrace,
    context: &TripContext,
    step: usize,
    max_steps: usize,
    timeout: Duration,
) -> PlanStep {
    let request = build_planning_request(intent, trace, context, step, max_steps);
    let reply = bounded(
        "planning",
        timeout,
        generator.generate(PLANNER_SYSTEM_PROMPT, &request),
    )
    .await;

    let text = match reply {
        Ok(text) => text,
        Err(err) => {
            warn!(target: "tripwise::steps", step, error = %err, "planning call failed");
            return PlanStep::finish(format!("planning failed: {}", err));
        }
    };

    decode_model_text::<PlanStep>(&text).unwrap_or_else(|err| {
        warn!(target: "tripwise::steps", step, error = %err, "could not parse plan step");
        PlanStep::finish(format!("unparseable plan: {}", err))
    })
}

async fn execute_action(
    resolver: &QueryResolver,
    intent: &TripIntent,
    raw_text: &str,
    context: &mut TripContext,
    action: &TripAction,
    args: &Value,
) -> Observation {
    match action {
        TripAction::AnalystFlights | TripAction::FallbackFlights => {
            let from = string_arg(args, "from").unwrap_or(intent.source_city.as_str());
            let Some(to) = string_arg(args, "to")
                .or_else(|| next_destination(intent, |dest| context.has_outbound_rows(dest)))
            else {
                return Observation::failure("trip has no destinations");
            };

            let result = if *action == TripAction::AnalystFlights {
                resolver.resolve_flights(from, to).await
            } else {
                resolver.force_fallback_flights(from, to).await
            };
            let observation = Observation::from_resolution(&result);

            if is_return_leg(intent, from, to) {
                context.flights_return.push(result);
            } else {
                context.flights_outbound.push(result);
            }
            observation
        }
        TripAction::AnalystHotels | TripAction::FallbackHotels => {
            let Some(city) = string_arg(args, "city")
                .or_else(|| next_destination(intent, |dest| context.has_hotel_rows(dest)))
            else {
                return Observation::failure("trip has no destinations");
            };

            let result = if *action == TripAction::AnalystHotels {
                resolver.resolve_hotels(city).await
            } else {
                resolver.force_fallback_hotels(city).await
            };
            let observation = Observation::from_resolution(&result);
            context.hotels.push(result);
            observation
        }
        TripAction::SearchGuides => {
            let guide = match string_arg(args, "query") {
                Some(query) => resolver.search_guide_query(query).await,
                None => resolver.search_guide(intent, raw_text).await,
            };

            let observation = Observation {
                ok: guide.has_text() || !guide.passages.is_empty(),
                rows: None,
                meta: Some(json!({
                    "query": guide.query,
                    "passages": guide.passages.len(),
                    "guide_text": guide.guide_text,
                })),
                error: guide.error.clone(),
            };

            if guide.has_text() || !context.have_guide() {
                context.guide = guide;
            }
            observation
        }
        TripAction::AnalystReturn => {
            let Some((from, to)) = intent.return_leg() else {
                return Observation::failure("trip has no destinations");
            };
            let result = resolver.resolve_flights(from, to).await;
            let observation = Observation::from_resolution(&result);
            context.flights_return.push(result);
            observation
        }
        TripAction::Finish => Observation::finished(),
        TripAction::Unknown(name) => {
            warn!(target: "tripwise::steps", action = %name, "model chose an unknown action");
            Observation::failure(format!("unknown/unsupported action: {}", name))
        }
    }
}

fn string_arg<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// First destination still lacking rows, or the first destination when all
/// of them are covered.
fn next_destination<'a>(
    intent: &'a TripIntent,
    covered: impl Fn(&str) -> bool,
) -> Option<&'a str> {
    intent
        .destination_cities
        .iter()
        .find(|dest| !covered(dest.as_str()))
        .or_else(|| intent.destination_cities.first())
        .map(String::as_str)
}

fn is_return_leg(intent: &TripIntent, from: &str, to: &str) -> bool {
    intent.return_leg().map_or(false, |(last, source)| {
        last.eq_ignore_ascii_case(from) && source.eq_ignore_ascii_case(to)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::resolution::{QuerySubject, Record, ResolutionResult};

    fn intent() -> TripIntent {
        TripIntent::new("Delhi", vec!["Pune".to_string(), "Goa".to_string()])
    }

    #[test]
    fn test_string_arg_ignores_blank_and_non_strings() {
        let args = json!({"to": " Goa ", "from": "", "city": 3});
        assert_eq!(string_arg(&args, "to"), Some("Goa"));
        assert_eq!(string_arg(&args, "from"), None);
        assert_eq!(string_arg(&args, "city"), None);
        assert_eq!(string_arg(&args, "missing"), None);
    }

    #[test]
    fn test_next_destination_skips_covered_cities() {
        let intent = intent();
        let mut context = TripContext::new(intent.clone());
        assert_eq!(
            next_destination(&intent, |dest| context.has_outbound_rows(dest)),
            Some("Pune")
        );

        let mut result = ResolutionResult::new(QuerySubject::flights("Delhi", "Pune"));
        result.rows.push(Record::new());
        context.flights_outbound.push(result);
        assert_eq!(
            next_destination(&intent, |dest| context.has_outbound_rows(dest)),
            Some("Goa")
        );

        assert_eq!(next_destination(&intent, |_| true), Some("Pune"));
    }

    #[test]
    fn test_is_return_leg() {
        let intent = intent();
        assert!(is_return_leg(&intent, "goa", "DELHI"));
        assert!(!is_return_leg(&intent, "Delhi", "Goa"));
        assert!(!is_return_leg(&intent, "Pune", "Delhi"));
    }
}
