use serde_json::json;
use tripwise_rs::{
    schema::{decode_model_payload, validation::decode_model_text},
    PlanStep, TripIntent,
};

#[test]
fn test_intent_decoded_from_fenced_reply() {
    let reply = "Sure! Here is the trip:\n```json\n{\"source_city\": \"Delhi\", \"destination_cities\": [\"Pune\", \"Goa\"]}\n```";
    let intent: TripIntent = decode_model_text(reply).unwrap();

    assert_eq!(intent.source_city, "Delhi");
    assert_eq!(intent.destination_cities, vec!["Pune", "Goa"]);
}

#[test]
fn test_intent_with_extra_keys_is_accepted() {
    let intent: TripIntent = decode_model_payload(&json!({
        "source_city": "Mumbai",
        "destination_cities": ["Jaipur"],
        "travel_dates": "next week"
    }))
    .unwrap();
    assert_eq!(intent.destination_cities, vec!["Jaipur"]);
}

#[test]
fn test_intent_schema_mismatch_reports_path() {
    let err = decode_model_payload::<TripIntent>(&json!({
        "source_city": "Delhi",
        "destination_cities": "Pune"
    }))
    .unwrap_err();

    assert_eq!(err.error_code(), "VALIDATION_ERROR");
    assert!(err.to_string().contains("trip_intent"));
    assert!(err.to_string().contains("/destination_cities"));
}

#[test]
fn test_intent_missing_field_is_rejected() {
    let err = decode_model_text::<TripIntent>(r#"{"destination_cities": ["Pune"]}"#).unwrap_err();
    assert_eq!(err.error_code(), "VALIDATION_ERROR");
}

#[test]
fn test_reply_without_braces_is_rejected() {
    let err = decode_model_text::<TripIntent>("Delhi to Pune, then Goa").unwrap_err();
    assert!(err.to_string().contains("no JSON object found"));
}

#[test]
fn test_plan_step_defaults() {
    let step: PlanStep = decode_model_text(r#"Next: {"action": "finish"}"#).unwrap();
    assert_eq!(step.action, "finish");
    assert!(step.thought.is_empty());
    assert!(step.args.is_null());

    let step: PlanStep = decode_model_text(
        r#"{"thought": "need hotels", "action": "analyst_hotels", "args": {"city": "Goa"}}"#,
    )
    .unwrap();
    assert_eq!(step.args["city"], "Goa");
}
