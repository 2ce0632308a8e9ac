//! Built-in worker tasks
//!
//! Contains LogTask and FileTask, plus the config factory.

mod file;
mod log;

use std::sync::Arc;
use std::time::Duration;

use contracts::{TaskConfig, TaskType, WorkerTask};
use tracing::instrument;

use crate::error::DispatcherError;

pub use self::file::FileTask;
pub use self::log::LogTask;

/// Create a task from configuration
#[instrument(name = "build_task", skip(config), fields(task_type = ?config.task_type))]
pub fn build_task(config: &TaskConfig) -> Result<Arc<dyn WorkerTask<String>>, DispatcherError> {
    let delay = parse_delay(config)?;

    match config.task_type {
        TaskType::Log => {
            let mut task = LogTask::new("log");
            if let Some(delay) = delay {
                task = task.with_delay(delay);
            }
            Ok(Arc::new(task))
        }
        TaskType::File => {
            let path = config
                .params
                .get("path")
                .ok_or_else(|| DispatcherError::task_creation("file", "missing param 'path'"))?;
            let mut task = FileTask::create("file", path)
                .map_err(|e| DispatcherError::task_creation("file", e.to_string()))?;
            if let Some(delay) = delay {
                task = task.with_delay(delay);
            }
            Ok(Arc::new(task))
        }
    }
}

fn parse_delay(config: &TaskConfig) -> Result<Option<Duration>, DispatcherError> {
    config
        .params
        .get("delay_ms")
        .map(|raw| {
            raw.trim().parse::<u64>().map(Duration::from_millis).map_err(|e| {
                DispatcherError::task_creation(
                    format!("{:?}", config.task_type),
                    format!("invalid delay_ms '{raw}': {e}"),
                )
            })
        })
        .transpose()
}
