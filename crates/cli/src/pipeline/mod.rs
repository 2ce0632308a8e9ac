//! Job orchestration module.

mod controller;
mod job;
mod stats;

pub use controller::JobController;
pub use job::{Job, JobConfig};
pub use stats::JobStats;
