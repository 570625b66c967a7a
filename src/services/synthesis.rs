use std::time::Duration;

use serde_json::{json, Value};
use tracing::{info, warn};

use crate::{
    core::context::TripContext,
    services::generation::{bounded, Generator},
};

pub const SYNTHESIS_SYSTEM_PROMPT: &str = "You are a travel planner. Using the provided SQL results for flights, hotels, \
and guide text, produce ONE detailed best recommendation.\n\
- Recommend specific flights (round trip).\n\
- Recommend hotels (with reasoning).\n\
- Provide a day-wise sightseeing itinerary from guide text only.\n\
- Be clear, concise, and structured (markdown).\n\
- Do NOT invent data not present in SQL results or guide text.\n\
- For every entry listed under `unavailable`, state plainly that no data was found.";

/// JSON document the recommendation is generated from.
pub fn build_synthesis_payload(raw_text: &str, context: &TripContext) -> Value {
    json!({
        "user_input": raw_text,
        "trip_details": context.trip_details,
        "flights_outbound": context.flights_outbound,
        "flights_return": context.flights_return,
        "hotels": context.hotels,
        "guide": context.guide,
        "unavailable": context.unavailable(),
    })
}

/// Produce the final recommendation text. Never fails: a generation error is
/// reported inside the returned text.
pub async fn synthesize(
    generator: &dyn Generator,
    raw_text: &str,
    context: &TripContext,
    timeout: Duration,
) -> String {
    let payload = build_synthesis_payload(raw_text, context).to_string();

    let reply = bounded(
        "synthesis",
        timeout,
        generator.generate(SYNTHESIS_SYSTEM_PROMPT, &payload),
    )
    .await;

    match reply {
        Ok(text) => {
            info!(target: "tripwise::synthesis", chars = text.len(), "recommendation generated");
            text
        }
        Err(err) => {
            warn!(target: "tripwise::synthesis", error = %err, "recommendation failed");
            format!("Could not generate final recommendation: {}", err)
        }
    }
}
