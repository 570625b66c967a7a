pub mod intent;
pub mod request;
pub mod resolution;

pub use intent::TripIntent;
pub use request::{Mode, TripRequest, TripResponse};
pub use resolution::{Domain, FallbackUsed, QuerySubject, Record, ResolutionResult};
