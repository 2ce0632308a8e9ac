//! `info` command implementation.

use std::collections::HashMap;

use anyhow::{Context, Result};
use contracts::JobBlueprint;
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    feeder: FeederInfo,
    source: ComponentInfo,
    task: TaskInfo,
}

#[derive(Serialize)]
struct FeederInfo {
    queue_depth: usize,
    parallelism: usize,
}

#[derive(Serialize)]
struct ComponentInfo {
    kind: String,
    enabled: bool,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    params: HashMap<String, String>,
}

#[derive(Serialize)]
struct TaskInfo {
    kind: String,
    shutdown_timeout_secs: u64,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    params: HashMap<String, String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&blueprint);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&blueprint);
    }

    Ok(())
}

fn build_config_info(blueprint: &JobBlueprint) -> ConfigInfo {
    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        feeder: FeederInfo {
            queue_depth: blueprint.feeder.queue_depth,
            parallelism: blueprint.feeder.parallelism,
        },
        source: ComponentInfo {
            kind: format!("{:?}", blueprint.source.source_type),
            enabled: blueprint.source.enabled,
            params: blueprint.source.params.clone(),
        },
        task: TaskInfo {
            kind: format!("{:?}", blueprint.task.task_type),
            shutdown_timeout_secs: blueprint.task.shutdown_timeout_secs,
            params: blueprint.task.params.clone(),
        },
    }
}

fn print_config_info(blueprint: &JobBlueprint) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                   Feeder Configuration                       ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("⚙️  Feeder");
    println!("   ├─ Version: {:?}", blueprint.version);
    println!("   ├─ Queue depth: {}", blueprint.feeder.queue_depth);
    println!("   └─ Parallelism: {}", blueprint.feeder.parallelism);

    println!("\n📥 Source ({:?})", blueprint.source.source_type);
    println!("   ├─ Enabled: {}", blueprint.source.enabled);
    print_params(&blueprint.source.params);

    println!("\n📤 Task ({:?})", blueprint.task.task_type);
    println!(
        "   ├─ Shutdown timeout: {}s",
        blueprint.task.shutdown_timeout_secs
    );
    print_params(&blueprint.task.params);

    println!();
}

fn print_params(params: &HashMap<String, String>) {
    if params.is_empty() {
        println!("   └─ (no params)");
        return;
    }
    let mut keys: Vec<_> = params.keys().collect();
    keys.sort();
    for (i, key) in keys.iter().enumerate() {
        let prefix = if i == keys.len() - 1 { "└─" } else { "├─" };
        println!("   {} {}: {}", prefix, key, params[*key]);
    }
}
