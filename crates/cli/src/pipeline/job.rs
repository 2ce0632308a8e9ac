//! Job orchestrator - wires source, task and controller into a dispatcher run.

use std::sync::Arc;
use std::thread;

use anyhow::{anyhow, Context, Result};
use contracts::JobBlueprint;
use dispatcher::{build_task, DispatcherBuilder};
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::{JobController, JobStats};

/// Job configuration
#[derive(Debug, Clone)]
pub struct JobConfig {
    /// The job blueprint (after CLI overrides)
    pub blueprint: JobBlueprint,
}

/// One run of the feeder
pub struct Job {
    config: JobConfig,
}

impl Job {
    pub fn new(config: JobConfig) -> Self {
        Self { config }
    }

    /// Run the job to completion
    ///
    /// The dispatcher runs on a dedicated `feeder-pull` thread; `cancel` is
    /// forwarded to it. A fatal error halts the process from inside the run.
    pub async fn run(self, cancel: CancellationToken) -> Result<JobStats> {
        let blueprint = self.config.blueprint;

        let source = sources::build_source(&blueprint.source).context("Failed to create source")?;
        let task = build_task(&blueprint.task).context("Failed to create task")?;
        let controller = Arc::new(JobController::new(
            Arc::clone(&task),
            blueprint.task.shutdown_timeout_secs,
        ));

        info!(
            source = source.name(),
            task = task.name(),
            "Job components created"
        );

        let feeder = blueprint.feeder.clone();
        let pull_controller = Arc::clone(&controller);
        let pull = thread::Builder::new()
            .name("feeder-pull".to_string())
            .spawn(move || {
                DispatcherBuilder::<String>::new(source, task, pull_controller)
                    .feeder_config(&feeder)
                    .cancellation(cancel)
                    .build()?
                    .run()
            })
            .context("Failed to spawn pull thread")?;

        let outcome = tokio::task::spawn_blocking(move || pull.join())
            .await
            .context("Pull thread join task failed")?
            .map_err(|_| anyhow!("Pull thread panicked"))?;
        let summary = outcome.context("Dispatcher run failed")?;

        Ok(JobStats::from_summary(
            &summary,
            &blueprint.feeder,
            controller.is_completed(),
        ))
    }
}
