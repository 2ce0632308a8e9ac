//! Dispatcher error types

use std::any::Any;
use std::fmt;

use contracts::{SourceError, TaskError};
use thiserror::Error;

/// Stage of a run, used to label fatal errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Building the dispatcher
    Startup,
    /// Admission + pull + submit loop
    PullLoop,
    /// A unit running on the worker pool
    Worker,
    /// Closing the source
    SourceClose,
    /// Waiting for in-flight units at shutdown
    PoolDrain,
    /// Controller completion callback
    TaskComplete,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Startup => "startup",
            Phase::PullLoop => "pull-loop",
            Phase::Worker => "worker",
            Phase::SourceClose => "source-close",
            Phase::PoolDrain => "pool-drain",
            Phase::TaskComplete => "task-complete",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Invalid builder settings
    #[error("invalid dispatcher config: {message}")]
    InvalidConfig { message: String },

    /// Worker pool runtime could not be started
    #[error("failed to start worker pool: {0}")]
    PoolStart(#[source] std::io::Error),

    /// Helper thread could not be spawned
    #[error("failed to spawn {phase} thread: {source}")]
    Spawn {
        phase: Phase,
        #[source]
        source: std::io::Error,
    },

    /// Task creation error
    #[error("failed to create task '{name}': {message}")]
    TaskCreation { name: String, message: String },

    /// Submission after the pool stopped accepting work
    #[error("worker pool is shut down")]
    PoolShutdown,

    /// Cancellation fired while waiting for an admission slot
    #[error("admission interrupted by cancellation")]
    Interrupted,

    /// Source failure other than exhaustion
    #[error("source error: {0}")]
    Source(#[from] SourceError),

    /// `close()` failed during shutdown or on cancellation
    #[error("failed to close source: {0}")]
    SourceClose(#[source] SourceError),

    /// A unit returned an error
    #[error("worker task failed: {0}")]
    Worker(#[from] TaskError),

    /// A unit panicked
    #[error("worker panicked: {message}")]
    WorkerPanic { message: String },

    /// In-flight units did not finish in time
    #[error("worker pool did not drain within {timeout_secs}s")]
    DrainTimeout { timeout_secs: u64 },

    /// Completion callback failed
    #[error("task_complete failed: {0}")]
    TaskComplete(#[source] TaskError),

    /// Panic caught on the pull thread or in a helper thread
    #[error("{phase} panicked: {message}")]
    Panicked { phase: Phase, message: String },

    /// Run stopped because a fatal error was already reported
    #[error("run halted after fatal error")]
    Halted,
}

impl DispatcherError {
    /// Create an invalid config error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create a task creation error
    pub fn task_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TaskCreation {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a panic error from a caught payload
    pub fn panicked(phase: Phase, payload: &(dyn Any + Send)) -> Self {
        Self::Panicked {
            phase,
            message: panic_message(payload),
        }
    }

    /// Phase the error belongs to
    pub fn phase(&self) -> Phase {
        match self {
            Self::InvalidConfig { .. }
            | Self::PoolStart(_)
            | Self::TaskCreation { .. } => Phase::Startup,
            Self::Spawn { phase, .. } | Self::Panicked { phase, .. } => *phase,
            Self::PoolShutdown
            | Self::Interrupted
            | Self::Source(_)
            | Self::Halted => Phase::PullLoop,
            Self::SourceClose(_) => Phase::SourceClose,
            Self::Worker(_) | Self::WorkerPanic { .. } => Phase::Worker,
            Self::DrainTimeout { .. } => Phase::PoolDrain,
            Self::TaskComplete(_) => Phase::TaskComplete,
        }
    }
}

/// Extract a readable message from a panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
