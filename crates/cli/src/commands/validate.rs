//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{JobBlueprint, SourceType, TaskType};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    queue_depth: usize,
    parallelism: usize,
    source_type: String,
    source_enabled: bool,
    task_type: String,
    shutdown_timeout_secs: u64,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", blueprint.version),
                    queue_depth: blueprint.feeder.queue_depth,
                    parallelism: blueprint.feeder.parallelism,
                    source_type: format!("{:?}", blueprint.source.source_type),
                    source_enabled: blueprint.source.enabled,
                    task_type: format!("{:?}", blueprint.task.task_type),
                    shutdown_timeout_secs: blueprint.task.shutdown_timeout_secs,
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &JobBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    if !blueprint.source.enabled {
        warnings.push("Source is disabled - the job will complete without pulling".to_string());
    }

    if blueprint.feeder.queue_depth < blueprint.feeder.parallelism {
        warnings.push(format!(
            "queue_depth ({}) < parallelism ({}) - some workers will stay idle",
            blueprint.feeder.queue_depth, blueprint.feeder.parallelism
        ));
    }

    if blueprint.source.source_type == SourceType::Lines
        && !blueprint.source.params.contains_key("max_items")
    {
        warnings.push("lines source has no max_items - the whole file will be read".to_string());
    }

    if blueprint.task.task_type == TaskType::Log && blueprint.task.params.contains_key("path") {
        warnings.push("task.params.path is ignored by the log task".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Queue depth: {}", summary.queue_depth);
            println!("  Parallelism: {}", summary.parallelism);
            println!(
                "  Source: {} (enabled: {})",
                summary.source_type, summary.source_enabled
            );
            println!(
                "  Task: {} (shutdown timeout: {}s)",
                summary.task_type, summary.shutdown_timeout_secs
            );
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
