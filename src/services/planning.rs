use serde_json::{json, Value};

use crate::{
    core::{context::TripContext, memory::ActionTrace, steps::TripAction},
    types::intent::TripIntent,
};

/// How many trace entries are replayed to the planner each step.
pub const TRACE_WINDOW: usize = 3;

pub const PLANNER_SYSTEM_PROMPT: &str = "You are a travel planning agent that gathers data step by step.\n\
Each turn you receive the trip, the most recent steps, what data is already available and the tools you may call.\n\
Reply with ONE JSON object and nothing else:\n\
{ \"thought\": <string>, \"action\": <tool name>, \"args\": <object> }\n\
- Cover every destination: outbound flights, hotels, the return flight and the travel guide.\n\
- If an analyst tool returned no rows, try the matching fallback tool.\n\
- Call finish once flights, hotels and guide are available or nothing more can be found.";

/// Build the user content of one planning turn.
pub fn build_planning_request(
    intent: &TripIntent,
    trace: &ActionTrace,
    context: &TripContext,
    step: usize,
    max_steps: usize,
) -> String {
    let tools: Vec<Value> = TripAction::TOOL_NAMES
        .iter()
        .map(|name| {
            json!({
                "name": name,
                "description": TripAction::describe_tool(name),
            })
        })
        .collect();

    let request = json!({
        "trip": intent,
        "step": step,
        "max_steps": max_steps,
        "recent_steps": trace.recent(TRACE_WINDOW),
        "have_flights": context.have_flights(),
        "have_hotels": context.have_hotels(),
        "have_guide": context.have_guide(),
        "tools": tools,
    });

    request.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::steps::{ActionStep, Observation};

    fn intent() -> TripIntent {
        TripIntent::new("Delhi", vec!["Pune".to_string()])
    }

    #[test]
    fn test_request_lists_every_tool() {
        let context = TripContext::new(intent());
        let request = build_planning_request(&intent(), &ActionTrace::new(), &context, 1, 6);
        let value: Value = serde_json::from_str(&request).unwrap();

        let names: Vec<&str> = value["tools"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|tool| tool["name"].as_str())
            .collect();
        assert_eq!(names, TripAction::TOOL_NAMES.to_vec());
        assert_eq!(value["trip"]["source_city"], "Delhi");
        assert_eq!(value["have_flights"], false);
        assert_eq!(value["step"], 1);
    }

    #[test]
    fn test_request_replays_last_three_steps() {
        let mut trace = ActionTrace::new();
        for action in [
            TripAction::AnalystFlights,
            TripAction::AnalystHotels,
            TripAction::SearchGuides,
            TripAction::Unknown("book_taxi".to_string()),
        ] {
            trace.push(ActionStep {
                thought: String::new(),
                action,
                args: json!({}),
                observation: Observation::failure("nothing"),
            });
        }

        let context = TripContext::new(intent());
        let request = build_planning_request(&intent(), &trace, &context, 5, 6);
        let value: Value = serde_json::from_str(&request).unwrap();
        let recent = value["recent_steps"].as_array().unwrap();
        assert_eq!(recent.len(), TRACE_WINDOW);
        assert_eq!(recent[0]["action"], "analyst_hotels");
        assert_eq!(recent[2]["action"], "book_taxi");
    }
}
