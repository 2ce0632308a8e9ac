//! JobController - completion side of a job

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use contracts::{TaskController, TaskError, WorkerTask};
use tracing::{info, instrument};

/// Owns the task for one job and receives its completion callback
pub struct JobController {
    task: Arc<dyn WorkerTask<String>>,
    shutdown_timeout_secs: u64,
    completed: AtomicBool,
}

impl JobController {
    pub fn new(task: Arc<dyn WorkerTask<String>>, shutdown_timeout_secs: u64) -> Self {
        Self {
            task,
            shutdown_timeout_secs,
            completed: AtomicBool::new(false),
        }
    }

    /// Whether `task_complete()` ran successfully
    pub fn is_completed(&self) -> bool {
        self.completed.load(Ordering::Acquire)
    }
}

impl TaskController for JobController {
    #[instrument(name = "job_task_complete", skip(self), fields(task = self.task.name()))]
    fn task_complete(&self) -> Result<(), TaskError> {
        self.task.flush()?;
        self.completed.store(true, Ordering::Release);
        info!("task complete");
        Ok(())
    }

    fn shutdown_timeout_secs(&self) -> u64 {
        self.shutdown_timeout_secs
    }
}
