pub mod availability;
pub mod generator;
pub mod materializer;

pub use availability::AvailabilityService;
pub use generator::generate;
pub use materializer::{MaterializeReport, Materializer};
