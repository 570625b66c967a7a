use crate::core::{context::TripContext, steps::ActionStep};
use serde::{Deserialize, Serialize};

/// Which orchestrator serves a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Concurrent fan-out over every leg, city and the guide
    #[default]
    Standard,
    /// Step-by-step action loop driven by the model
    React,
}

impl std::str::FromStr for Mode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(Mode::Standard),
            "react" => Ok(Mode::React),
            other => Err(format!("unknown mode `{}` (expected standard or react)", other)),
        }
    }
}

/// Payload accepted by [`crate::TripPlanner::handle`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripRequest {
    #[serde(alias = "query")]
    pub prompt: String,
    #[serde(default)]
    pub mode: Mode,
}

impl TripRequest {
    pub fn new(prompt: impl Into<String>, mode: Mode) -> Self {
        Self {
            prompt: prompt.into(),
            mode,
        }
    }
}

/// Response returned to the caller: a plan or a single error message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TripResponse {
    Plan {
        best_trip_recommendation: String,
        raw_context: TripContext,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        react_trace: Option<Vec<ActionStep>>,
    },
    Failure {
        error: String,
    },
}

impl TripResponse {
    pub fn failure(error: impl Into<String>) -> Self {
        TripResponse::Failure {
            error: error.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TripResponse::Plan { .. })
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            TripResponse::Failure { error } => Some(error),
            TripResponse::Plan { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_defaults_to_standard() {
        let request: TripRequest = serde_json::from_value(json!({"prompt": "Delhi to Pune"})).unwrap();
        assert_eq!(request.mode, Mode::Standard);

        let request: TripRequest =
            serde_json::from_value(json!({"query": "Delhi to Pune", "mode": "react"})).unwrap();
        assert_eq!(request.prompt, "Delhi to Pune");
        assert_eq!(request.mode, Mode::React);
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!("ReAct".parse::<Mode>().unwrap(), Mode::React);
        assert!("batch".parse::<Mode>().is_err());
    }

    #[test]
    fn test_failure_serializes_flat() {
        let value = serde_json::to_value(TripResponse::failure("boom")).unwrap();
        assert_eq!(value, json!({"error": "boom"}));
    }
}
