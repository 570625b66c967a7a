use crate::{
    error::Result as PlannerResult, Mode, TripConfig, TripPlanner, TripRequest, TripResponse,
};
use clap::{Arg, ArgAction, Command};
use std::time::Duration;
use tracing::{error, info};

/// CLI entry point for the tripwise planner
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let matches = Command::new("tripwise")
        .version("0.1.0")
        .about("Plan a multi-city trip from a single free-text request")
        .arg(
            Arg::new("prompt")
                .help("The trip request, e.g. \"Delhi to Pune and Goa next week\"")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("mode")
                .long("mode")
                .value_name("MODE")
                .help("Orchestration mode: standard (concurrent) or react (step by step)")
                .default_value("standard"),
        )
        .arg(
            Arg::new("max-steps")
                .short('s')
                .long("max-steps")
                .value_name("COUNT")
                .help("Maximum actions in react mode (or set TRIPWISE_MAX_STEPS)"),
        )
        .arg(
            Arg::new("timeout")
                .short('t')
                .long("timeout")
                .value_name("SECONDS")
                .help("Bound for each analyst, query, search and model call"),
        )
        .arg(
            Arg::new("model")
                .short('m')
                .long("model")
                .value_name("MODEL")
                .help("Chat model used for extraction, planning and synthesis (or set MODEL_ID)"),
        )
        .arg(
            Arg::new("pretty")
                .long("pretty")
                .action(ArgAction::SetTrue)
                .help("Pretty-print the JSON response"),
        )
        .get_matches();

    let mut config = TripConfig::from_env()?;

    if let Some(max_steps) = matches.get_one::<String>("max-steps") {
        config = config.with_max_steps(max_steps.parse()?);
    }
    if let Some(timeout) = matches.get_one::<String>("timeout") {
        config = config.with_call_timeout(Duration::from_secs(timeout.parse()?));
    }
    if let Some(model) = matches.get_one::<String>("model") {
        config = config.with_model(model.as_str());
    }

    let mode: Mode = matches
        .get_one::<String>("mode")
        .map(|raw| raw.parse())
        .transpose()?
        .unwrap_or_default();
    let prompt = matches
        .get_one::<String>("prompt")
        .cloned()
        .ok_or("a trip request prompt is required")?;

    info!("Using model: {}", config.model);
    info!("Running {:?} planning for: {}", mode, prompt);

    let planner = match TripPlanner::from_config(config) {
        Ok(planner) => planner,
        Err(e) => {
            error!("Planner configuration failed: {}", e);
            println!("{}", e.to_error_payload());
            return Err(e.into());
        }
    };

    let response = planner.handle(TripRequest::new(prompt, mode)).await;
    if let Some(message) = response.error() {
        error!("Trip planning failed: {}", message);
    }

    println!("{}", render(&response, matches.get_flag("pretty"))?);

    Ok(())
}

fn render(response: &TripResponse, pretty: bool) -> PlannerResult<String> {
    let output = if pretty {
        serde_json::to_string_pretty(response)?
    } else {
        serde_json::to_string(response)?
    };
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_failure_response() {
        let response = TripResponse::failure("Prompt must not be empty.");
        assert_eq!(
            render(&response, false).unwrap(),
            r#"{"error":"Prompt must not be empty."}"#
        );
        assert!(render(&response, true).unwrap().contains('\n'));
    }

    #[test]
    fn test_configuration_errors_render_as_payload() {
        let err = TripConfig::new().validate().unwrap_err();
        let payload = err.to_error_payload();
        assert_eq!(payload["error"]["code"], "CONFIG_ERROR");
        assert_eq!(payload["error"]["retryable"], false);
    }
}
