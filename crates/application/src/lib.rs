//! Application layer: the ports the infrastructure implements, the blocking
//! controller, and process-wide statistics.

pub mod blocking_controller;
pub mod ports;
pub mod stats;

pub use blocking_controller::{BlockingController, BlockingStatus};
pub use stats::{RuntimeStats, StatsSnapshot};
