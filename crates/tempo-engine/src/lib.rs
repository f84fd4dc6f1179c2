pub mod error;
pub mod loops;
pub mod reminders;
pub mod stats;
pub mod tips;
pub mod tracker;

pub use error::EngineError;
pub use stats::{CategoryBreakdown, CategoryStats, ProductivityStats};
pub use tracker::{SharedTracker, Tracker};

#[cfg(test)]
pub(crate) mod testutil;
