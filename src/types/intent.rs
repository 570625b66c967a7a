use crate::completion_schema;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Structured travel intent extracted from the user's free text.
#[completion_schema(name = "trip_intent")]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TripIntent {
    /// City the traveller departs from and returns to
    pub source_city: String,
    /// Cities to visit, in travel order
    pub destination_cities: Vec<String>,
}

impl TripIntent {
    pub fn new(source_city: impl Into<String>, destination_cities: Vec<String>) -> Self {
        Self {
            source_city: source_city.into(),
            destination_cities,
        }
    }

    /// Trim names and drop blank destinations; `None` when nothing is left to plan.
    pub fn normalized(self) -> Option<Self> {
        let source_city = self.source_city.trim().to_string();
        let destination_cities: Vec<String> = self
            .destination_cities
            .into_iter()
            .map(|city| city.trim().to_string())
            .filter(|city| !city.is_empty())
            .collect();

        if source_city.is_empty() || destination_cities.is_empty() {
            return None;
        }

        Some(Self {
            source_city,
            destination_cities,
        })
    }

    /// `(source, destination)` for every destination, in travel order.
    pub fn outbound_legs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.destination_cities
            .iter()
            .map(move |dest| (self.source_city.as_str(), dest.as_str()))
    }

    /// Final destination back to the source.
    pub fn return_leg(&self) -> Option<(&str, &str)> {
        self.destination_cities
            .last()
            .map(|last| (last.as_str(), self.source_city.as_str()))
    }

    /// Destinations that are not the source city itself.
    pub fn guide_destinations(&self) -> Vec<String> {
        self.destination_cities
            .iter()
            .filter(|dest| !dest.eq_ignore_ascii_case(&self.source_city))
            .cloned()
            .collect()
    }
}
