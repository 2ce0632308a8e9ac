//! LogTask - logs each item via tracing

use std::thread;
use std::time::Duration;

use contracts::{TaskError, WorkerTask};
use tracing::{debug, instrument};

/// Task that logs items, optionally simulating work
pub struct LogTask {
    name: String,
    delay: Option<Duration>,
}

impl LogTask {
    /// Create a new LogTask with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            delay: None,
        }
    }

    /// Sleep this long per item
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

impl<T: std::fmt::Debug + Send> WorkerTask<T> for LogTask {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(name = "log_task_process", skip(self, item), fields(task = %self.name))]
    fn process(&self, item: T) -> Result<(), TaskError> {
        if let Some(delay) = self.delay {
            thread::sleep(delay);
        }
        debug!(task = %self.name, item = ?item, "item processed");
        Ok(())
    }
}
