//! # Contracts
//!
//! Frozen interface contracts shared by every crate of the feeder.
//! Business crates depend on this crate only, reverse dependencies are prohibited.
//!
//! ## Collaborators
//! - [`DataSource`]: sequential producer of opaque items
//! - [`WorkerTask`]: per-item processing, invoked under pool concurrency
//! - [`TaskController`]: owns the run, receives the completion callback

mod blueprint;
mod error;
mod source;
mod task;

pub use blueprint::*;
pub use error::*;
pub use source::{DataSource, SourceError};
pub use task::{TaskController, TaskError, WorkerTask};
