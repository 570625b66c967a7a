use std::time::Duration;

use tracing::{info, warn};

use crate::{
    schemas::validation::decode_model_text,
    services::generation::{bounded, Generator},
    types::intent::TripIntent,
};

pub const EXTRACTION_SYSTEM_PROMPT: &str = "You are a travel assistant. Extract the travel intent into JSON:\n\
{ \"source_city\": <string>, \"destination_cities\": [<string>, ...] }\n\
- Only output valid JSON with exactly these two keys.\n\
- Preserve travel order.";

/// Message returned to the caller when no usable intent could be extracted.
pub const EXTRACTION_FAILED: &str = "Could not extract trip details from input.";

/// Turn free text into a [`TripIntent`], or `None` when the model reply is
/// missing, malformed or names no destination.
pub async fn extract_trip_intent(
    generator: &dyn Generator,
    text: &str,
    timeout: Duration,
) -> Option<TripIntent> {
    let reply = bounded(
        "extraction",
        timeout,
        generator.generate(EXTRACTION_SYSTEM_PROMPT, text),
    )
    .await;

    let raw = match reply {
        Ok(raw) => raw,
        Err(err) => {
            warn!(target: "tripwise::extract", error = %err, "extraction call failed");
            return None;
        }
    };

    let intent = match decode_model_text::<TripIntent>(&raw) {
        Ok(intent) => intent,
        Err(err) => {
            warn!(target: "tripwise::extract", error = %err, "could not decode trip intent");
            return None;
        }
    };

    let Some(intent) = intent.normalized() else {
        warn!(target: "tripwise::extract", "trip intent has no source or destinations");
        return None;
    };

    info!(
        target: "tripwise::extract",
        source = %intent.source_city,
        destinations = ?intent.destination_cities,
        "extracted trip intent"
    );
    Some(intent)
}
