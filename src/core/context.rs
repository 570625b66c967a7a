use crate::types::{intent::TripIntent, resolution::ResolutionResult, resolution::QuerySubject};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Guide search outcome. Search is best-effort, so failures only fill `error`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GuideResult {
    pub query: String,
    #[serde(rename = "results")]
    pub passages: Vec<Value>,
    pub guide_text: Option<String>,
    pub error: Option<String>,
}

impl GuideResult {
    pub fn has_text(&self) -> bool {
        self.guide_text
            .as_deref()
            .map_or(false, |text| !text.trim().is_empty())
    }
}

/// Everything gathered for one request, handed to the synthesizer once frozen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripContext {
    pub trip_details: TripIntent,
    pub flights_outbound: Vec<ResolutionResult>,
    pub flights_return: Vec<ResolutionResult>,
    pub hotels: Vec<ResolutionResult>,
    pub guide: GuideResult,
}

impl TripContext {
    pub fn new(trip_details: TripIntent) -> Self {
        Self {
            trip_details,
            flights_outbound: Vec::new(),
            flights_return: Vec::new(),
            hotels: Vec::new(),
            guide: GuideResult::default(),
        }
    }

    pub fn have_flights(&self) -> bool {
        self.flights_outbound
            .iter()
            .chain(self.flights_return.iter())
            .any(ResolutionResult::has_rows)
    }

    pub fn have_hotels(&self) -> bool {
        self.hotels.iter().any(ResolutionResult::has_rows)
    }

    pub fn have_guide(&self) -> bool {
        self.guide.has_text() || !self.guide.passages.is_empty()
    }

    /// Whether some outbound result for `to` already carries rows.
    pub fn has_outbound_rows(&self, to: &str) -> bool {
        self.flights_outbound.iter().any(|result| {
            result.has_rows()
                && matches!(&result.subject, QuerySubject::Flights { to: dest, .. } if dest.eq_ignore_ascii_case(to))
        })
    }

    /// Whether some hotel result for `city` already carries rows.
    pub fn has_hotel_rows(&self, city: &str) -> bool {
        self.hotels.iter().any(|result| {
            result.has_rows()
                && matches!(&result.subject, QuerySubject::Hotels { city: c } if c.eq_ignore_ascii_case(city))
        })
    }

    /// Legs, cities and the guide for which no data was found or fetched.
    pub fn unavailable(&self) -> Vec<String> {
        let intent = &self.trip_details;
        let mut missing = Vec::new();
        let mut seen: Vec<&str> = Vec::new();

        for dest in &intent.destination_cities {
            if seen.iter().any(|city| city.eq_ignore_ascii_case(dest)) {
                continue;
            }
            seen.push(dest);

            if !self.has_outbound_rows(dest) {
                missing.push(format!("flights {} -> {}", intent.source_city, dest));
            }
            if !self.has_hotel_rows(dest) {
                missing.push(format!("hotels in {}", dest));
            }
        }

        if let Some((from, to)) = intent.return_leg() {
            if !self.flights_return.iter().any(ResolutionResult::has_rows) {
                missing.push(format!("return flights {} -> {}", from, to));
            }
        }

        if !self.have_guide() {
            missing.push("travel guide".to_string());
        }

        missing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::resolution::{FallbackUsed, Record};
    use serde_json::json;

    fn with_rows(subject: QuerySubject) -> ResolutionResult {
        let mut result = ResolutionResult::new(subject);
        let mut row = Record::new();
        row.insert("PRICE".to_string(), json!(100));
        result.rows.push(row);
        result
    }

    #[test]
    fn test_flags_follow_rows() {
        let mut context = TripContext::new(TripIntent::new("Delhi", vec!["Pune".to_string()]));
        assert!(!context.have_flights());
        assert!(!context.have_hotels());

        let mut empty = ResolutionResult::new(QuerySubject::hotels("Pune"));
        empty.fallback_used = FallbackUsed::NoneAvailable;
        context.hotels.push(empty);
        assert!(!context.have_hotels());

        context
            .flights_return
            .push(with_rows(QuerySubject::flights("Pune", "Delhi")));
        assert!(context.have_flights());
    }

    #[test]
    fn test_unavailable_lists_missing_items() {
        let mut context = TripContext::new(TripIntent::new(
            "Delhi",
            vec!["Pune".to_string(), "Goa".to_string()],
        ));
        context
            .flights_outbound
            .push(with_rows(QuerySubject::flights("Delhi", "Pune")));
        context.hotels.push(with_rows(QuerySubject::hotels("Goa")));
        context.guide.guide_text = Some("Visit the fort.".to_string());

        assert_eq!(
            context.unavailable(),
            vec![
                "hotels in Pune".to_string(),
                "flights Delhi -> Goa".to_string(),
                "return flights Goa -> Delhi".to_string(),
            ]
        );
    }
}
