pub mod context;
pub mod memory;
pub mod planner;
pub mod steps;

pub use context::{GuideResult, TripContext};
pub use memory::ActionTrace;
pub use planner::TripPlanner;
pub use steps::{ActionStep, Observation, PlanStep, TripAction};
