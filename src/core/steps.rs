use crate::completion_schema;
use crate::types::resolution::{Record, ResolutionResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

/// The fixed tool set of the action loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TripAction {
    /// Analyst-backed flight resolution for one outbound leg
    AnalystFlights,
    /// Analyst-backed hotel resolution for one city
    AnalystHotels,
    SearchGuides,
    /// Template-only flight resolution, skipping the analyst
    FallbackFlights,
    /// Template-only hotel resolution, skipping the analyst
    FallbackHotels,
    /// Analyst-backed resolution of the final destination back to the source
    AnalystReturn,
    Finish,
    /// Anything the model invented outside the tool set
    Unknown(String),
}

impl TripAction {
    pub const TOOL_NAMES: [&'static str; 7] = [
        "analyst_flights",
        "analyst_hotels",
        "search_guides",
        "fallback_flights",
        "fallback_hotels",
        "analyst_return",
        "finish",
    ];

    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "analyst_flights" => TripAction::AnalystFlights,
            "analyst_hotels" => TripAction::AnalystHotels,
            "search_guides" => TripAction::SearchGuides,
            "fallback_flights" => TripAction::FallbackFlights,
            "fallback_hotels" => TripAction::FallbackHotels,
            "analyst_return" => TripAction::AnalystReturn,
            "finish" => TripAction::Finish,
            _ => TripAction::Unknown(name.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            TripAction::AnalystFlights => "analyst_flights",
            TripAction::AnalystHotels => "analyst_hotels",
            TripAction::SearchGuides => "search_guides",
            TripAction::FallbackFlights => "fallback_flights",
            TripAction::FallbackHotels => "fallback_hotels",
            TripAction::AnalystReturn => "analyst_return",
            TripAction::Finish => "finish",
            TripAction::Unknown(name) => name,
        }
    }

    /// One-line description used in the planning prompt.
    pub fn describe_tool(name: &str) -> &'static str {
        match name {
            "analyst_flights" => "args {from?, to?}: ask the analyst for flights on an outbound leg",
            "analyst_hotels" => "args {city?}: ask the analyst for hotels in a destination",
            "search_guides" => "args {query?}: search travel guide passages for the destinations",
            "fallback_flights" => "args {from?, to?}: run the deterministic flight templates directly",
            "fallback_hotels" => "args {city?}: run the deterministic hotel template directly",
            "analyst_return" => "no args: resolve the flight from the final destination back to the source",
            "finish" => "no args: stop and hand the gathered data to the recommendation step",
            _ => "",
        }
    }
}

impl From<String> for TripAction {
    fn from(value: String) -> Self {
        TripAction::parse(&value)
    }
}

impl From<TripAction> for String {
    fn from(action: TripAction) -> Self {
        action.as_str().to_string()
    }
}

impl fmt::Display for TripAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Single step object the planner model is asked to emit.
#[completion_schema(name = "plan_step")]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PlanStep {
    /// Short reasoning for choosing the action
    #[serde(default)]
    pub thought: String,
    /// One of the tool names
    pub action: String,
    /// Arguments for the action
    #[serde(default)]
    pub args: Value,
}

impl PlanStep {
    pub fn finish(thought: impl Into<String>) -> Self {
        Self {
            thought: thought.into(),
            action: "finish".to_string(),
            args: Value::Null,
        }
    }
}

/// What executing an action produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows: Option<Vec<Record>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Observation {
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            rows: None,
            meta: None,
            error: Some(error.into()),
        }
    }

    pub fn finished() -> Self {
        Self {
            ok: true,
            rows: None,
            meta: None,
            error: None,
        }
    }

    pub fn from_resolution(result: &ResolutionResult) -> Self {
        Self {
            ok: result.has_rows(),
            rows: Some(result.rows.clone()),
            meta: Some(json!({
                "subject": result.subject,
                "fallback_used": result.fallback_used,
                "query": result.query,
                "notes": result.notes,
            })),
            error: result.error.clone(),
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.as_ref().map_or(0, Vec::len)
    }
}

/// One executed step of the action loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionStep {
    pub thought: String,
    pub action: TripAction,
    pub args: Value,
    pub observation: Observation,
}

impl ActionStep {
    /// Compact form sent back to the planner as history.
    pub fn summary(&self) -> Value {
        json!({
            "action": self.action,
            "args": self.args,
            "ok": self.observation.ok,
            "rows": self.observation.row_count(),
            "error": self.observation.error,
        })
    }

    /// Get a human-readable description of the step
    pub fn describe(&self) -> String {
        let outcome = if self.observation.ok {
            format!("ok, {} rows", self.observation.row_count())
        } else {
            format!(
                "error: {}",
                self.observation.error.as_deref().unwrap_or("no rows")
            )
        };
        format!("🔧 {}({}) -> {}", self.action, self.args, outcome)
    }
}
