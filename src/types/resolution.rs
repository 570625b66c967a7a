use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// One flat result row: column name to scalar value.
pub type Record = Map<String, Value>;

/// Data domain a subject belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Flights,
    Hotels,
    Guide,
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Domain::Flights => "flights",
            Domain::Hotels => "hotels",
            Domain::Guide => "guide",
        };
        f.write_str(name)
    }
}

/// What a single resolution is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "domain", rename_all = "snake_case")]
pub enum QuerySubject {
    Flights { from: String, to: String },
    Hotels { city: String },
    Guide { destinations: Vec<String>, text: String },
}

impl QuerySubject {
    pub fn flights(from: impl Into<String>, to: impl Into<String>) -> Self {
        QuerySubject::Flights {
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn hotels(city: impl Into<String>) -> Self {
        QuerySubject::Hotels { city: city.into() }
    }

    pub fn domain(&self) -> Domain {
        match self {
            QuerySubject::Flights { .. } => Domain::Flights,
            QuerySubject::Hotels { .. } => Domain::Hotels,
            QuerySubject::Guide { .. } => Domain::Guide,
        }
    }

    /// Natural-language question for the analyst, or the search query for guides.
    pub fn question(&self) -> String {
        match self {
            QuerySubject::Flights { from, to } => format!("Find flights from {} to {}.", from, to),
            QuerySubject::Hotels { city } => format!("Find hotels in {}.", city),
            QuerySubject::Guide { destinations, text } => {
                if destinations.is_empty() {
                    text.clone()
                } else {
                    format!("travel guide for {}", destinations.join(" to "))
                }
            }
        }
    }
}

impl fmt::Display for QuerySubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuerySubject::Flights { from, to } => write!(f, "{} -> {}", from, to),
            QuerySubject::Hotels { city } => f.write_str(city),
            QuerySubject::Guide { destinations, .. } => {
                write!(f, "guide for {}", destinations.join(", "))
            }
        }
    }
}

/// Which path produced the rows of a [`ResolutionResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FallbackUsed {
    /// Rows came from the analyst-generated query
    #[default]
    None,
    Outbound,
    RoundtripBundle,
    HotelsBasic,
    ForcedOutbound,
    ForcedHotels,
    /// Every path came back empty
    NoneAvailable,
}

impl FallbackUsed {
    pub fn as_str(&self) -> &'static str {
        match self {
            FallbackUsed::None => "none",
            FallbackUsed::Outbound => "outbound",
            FallbackUsed::RoundtripBundle => "roundtrip_bundle",
            FallbackUsed::HotelsBasic => "hotels_basic",
            FallbackUsed::ForcedOutbound => "forced_outbound",
            FallbackUsed::ForcedHotels => "forced_hotels",
            FallbackUsed::NoneAvailable => "none_available",
        }
    }
}

/// Outcome of resolving one flight leg or hotel city.
///
/// Always produced, whatever failed along the way: `rows` is empty exactly
/// when `fallback_used` is [`FallbackUsed::NoneAvailable`], and then `notes`
/// explains why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionResult {
    pub subject: QuerySubject,
    pub analyst_text: Option<String>,
    #[serde(rename = "sql")]
    pub query: Option<String>,
    #[serde(rename = "sql_result")]
    pub rows: Vec<Record>,
    pub suggestions: Vec<String>,
    pub error: Option<String>,
    pub fallback_used: FallbackUsed,
    pub notes: Vec<String>,
}

impl ResolutionResult {
    pub fn new(subject: QuerySubject) -> Self {
        Self {
            subject,
            analyst_text: None,
            query: None,
            rows: Vec::new(),
            suggestions: Vec::new(),
            error: None,
            fallback_used: FallbackUsed::None,
            notes: Vec::new(),
        }
    }

    /// Result for a task that never produced a value (e.g. a panicked worker).
    pub fn failed(subject: QuerySubject, error: impl Into<String>) -> Self {
        let error = error.into();
        let mut result = Self::new(subject);
        result.notes.push(format!(
            "No {} data available for {}: {}",
            result.subject.domain(),
            result.subject,
            error
        ));
        result.error = Some(error);
        result.fallback_used = FallbackUsed::NoneAvailable;
        result
    }

    pub fn has_rows(&self) -> bool {
        !self.rows.is_empty()
    }

    pub fn is_unavailable(&self) -> bool {
        self.fallback_used == FallbackUsed::NoneAvailable
    }
}
