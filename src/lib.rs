//! tripwise-rs: multi-city trip planning on top of a natural-language analyst
//!
//! A free-text request is turned into a structured trip intent, every flight
//! leg, hotel city and the travel guide are resolved (through the analyst with
//! deterministic query templates as fallback), and the gathered data is handed
//! to a model for one grounded recommendation.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use tripwise_rs::{Mode, TripPlanner, TripRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let planner = TripPlanner::from_env()?;
//!
//!     let request = TripRequest::new("Delhi to Pune and then Goa", Mode::Standard);
//!     let response = planner.handle(request).await;
//!     println!("{}", serde_json::to_string_pretty(&response)?);
//!     Ok(())
//! }
//! ```

extern crate self as tripwise_rs;

pub mod config;
pub mod core;
pub mod error;
pub mod schemas;
pub mod services;
pub mod types;

pub use config::TripConfig;
pub use crate::core::{
    ActionStep, ActionTrace, GuideResult, Observation, PlanStep, TripAction, TripContext,
    TripPlanner,
};
pub use error::{PlannerError, Result};
pub use schemas::{CompletionSchema, SchemaHandle};
pub use services::{
    Analyst, AnalystReply, Generator, GuideSearch, LoopOutcome, QueryExecutor, QueryResolver,
};
pub use tripwise_macros::completion_schema;
pub use types::{
    Domain, FallbackUsed, Mode, QuerySubject, Record, ResolutionResult, TripIntent, TripRequest,
    TripResponse,
};

pub use schemas as schema;

#[cfg(feature = "cli")]
pub mod cli;
