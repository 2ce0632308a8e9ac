//! WorkerTask / TaskController traits - processing side of a run

use thiserror::Error;

/// Errors raised by a task or its controller
#[derive(Debug, Error)]
pub enum TaskError {
    /// Processing failed
    #[error("task failed: {message}")]
    Failed { message: String },

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl TaskError {
    /// Create processing failure
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }
}

/// Per-item processing
///
/// Invoked concurrently from the worker pool. Completion order across items is
/// unspecified. Any `Err` is treated as unrecoverable by the dispatcher.
pub trait WorkerTask<T>: Send + Sync {
    /// Task name (used for logging)
    fn name(&self) -> &str;

    /// Process a single item
    fn process(&self, item: T) -> Result<(), TaskError>;

    /// Flush buffered output (if any)
    fn flush(&self) -> Result<(), TaskError> {
        Ok(())
    }
}

/// Owner of a run
///
/// Receives exactly one `task_complete()` after every dispatched item finished,
/// and never receives it if the run escalated a fatal error.
pub trait TaskController: Send + Sync {
    /// Completion callback
    fn task_complete(&self) -> Result<(), TaskError>;

    /// Upper bound (seconds) for draining in-flight work at shutdown
    fn shutdown_timeout_secs(&self) -> u64;
}
