//! `run` command implementation.

use anyhow::{Context, Result};
use contracts::JobBlueprint;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::pipeline::{Job, JobConfig};

/// Execute the `run` command
pub async fn run_job(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let mut blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    apply_overrides(&mut blueprint, args);
    config_loader::ConfigLoader::validate(&blueprint)
        .context("Configuration invalid after CLI overrides")?;

    info!(
        source = ?blueprint.source.source_type,
        source_enabled = blueprint.source.enabled,
        task = ?blueprint.task.task_type,
        queue_depth = blueprint.feeder.queue_depth,
        parallelism = blueprint.feeder.parallelism,
        shutdown_timeout_secs = blueprint.task.shutdown_timeout_secs,
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
    }

    let job = Job::new(JobConfig { blueprint });
    let cancel = CancellationToken::new();

    info!("Starting job...");

    let run = job.run(cancel.clone());
    tokio::pin!(run);

    let stats = tokio::select! {
        result = &mut run => result,
        _ = shutdown_signal() => {
            warn!("Received shutdown signal, cancelling job...");
            cancel.cancel();
            run.await
        }
    }
    .context("Job execution failed")?;

    info!(
        items = stats.items_dispatched,
        duration_secs = stats.duration.as_secs_f64(),
        rate = format!("{:.2}", stats.rate),
        "Job completed successfully"
    );
    stats.print_summary();

    Ok(())
}

/// CLI flags win over file values
fn apply_overrides(blueprint: &mut JobBlueprint, args: &RunArgs) {
    if let Some(queue_depth) = args.queue_depth {
        info!(queue_depth, "Overriding queue depth from CLI");
        blueprint.feeder.queue_depth = queue_depth;
    }
    if let Some(parallelism) = args.parallelism {
        info!(parallelism, "Overriding parallelism from CLI");
        blueprint.feeder.parallelism = parallelism;
    }
    if let Some(secs) = args.shutdown_timeout {
        info!(shutdown_timeout_secs = secs, "Overriding shutdown timeout from CLI");
        blueprint.task.shutdown_timeout_secs = secs;
    }
}

/// Resolve on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &JobBlueprint) {
    println!("\n=== Configuration Summary ===\n");
    println!("Feeder:");
    println!("  Queue depth: {}", blueprint.feeder.queue_depth);
    println!("  Parallelism: {}", blueprint.feeder.parallelism);
    println!("\nSource: {:?}", blueprint.source.source_type);
    println!("  Enabled: {}", blueprint.source.enabled);
    for (key, value) in &blueprint.source.params {
        println!("  {}: {}", key, value);
    }
    println!("\nTask: {:?}", blueprint.task.task_type);
    println!(
        "  Shutdown timeout: {}s",
        blueprint.task.shutdown_timeout_secs
    );
    for (key, value) in &blueprint.task.params {
        println!("  {}: {}", key, value);
    }
    println!();
}
