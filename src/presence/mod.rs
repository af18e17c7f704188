pub mod task;
pub mod tracker;

pub use task::SweepTask;
pub use tracker::{PresenceTracker, SweepFailure, SweepReport};
