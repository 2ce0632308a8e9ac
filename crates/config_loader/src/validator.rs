//! 配置校验模块
//!
//! 校验规则：
//! - queue_depth > 0, parallelism > 0
//! - shutdown_timeout_secs > 0
//! - lines 数据源必须提供 path
//! - file 任务必须提供 path
//! - 数值型参数必须可解析

use contracts::{ContractError, JobBlueprint, SourceType, TaskType};
use std::collections::HashMap;

/// 校验 JobBlueprint 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(blueprint: &JobBlueprint) -> Result<(), ContractError> {
    validate_feeder(blueprint)?;
    validate_source(blueprint)?;
    validate_task(blueprint)?;
    Ok(())
}

/// 校验分发器参数
fn validate_feeder(blueprint: &JobBlueprint) -> Result<(), ContractError> {
    let feeder = &blueprint.feeder;
    if feeder.queue_depth == 0 {
        return Err(ContractError::config_validation(
            "feeder.queue_depth",
            "queue_depth must be > 0",
        ));
    }
    if feeder.parallelism == 0 {
        return Err(ContractError::config_validation(
            "feeder.parallelism",
            "parallelism must be > 0",
        ));
    }
    Ok(())
}

/// 校验数据源
fn validate_source(blueprint: &JobBlueprint) -> Result<(), ContractError> {
    let source = &blueprint.source;
    match source.source_type {
        SourceType::Lines => {
            require_param(&source.params, "source.params.path", "path")?;
            parse_optional_u64(&source.params, "source.params.max_items", "max_items")?;
        }
        SourceType::Mock => {
            parse_optional_u64(&source.params, "source.params.count", "count")?;
            parse_optional_u64(&source.params, "source.params.delay_ms", "delay_ms")?;
        }
    }
    Ok(())
}

/// 校验处理任务
fn validate_task(blueprint: &JobBlueprint) -> Result<(), ContractError> {
    let task = &blueprint.task;
    if task.shutdown_timeout_secs == 0 {
        return Err(ContractError::config_validation(
            "task.shutdown_timeout_secs",
            "shutdown_timeout_secs must be > 0",
        ));
    }
    if task.task_type == TaskType::File {
        require_param(&task.params, "task.params.path", "path")?;
    }
    parse_optional_u64(&task.params, "task.params.delay_ms", "delay_ms")?;
    Ok(())
}

fn require_param(
    params: &HashMap<String, String>,
    field: &str,
    key: &str,
) -> Result<(), ContractError> {
    match params.get(key) {
        Some(value) if !value.trim().is_empty() => Ok(()),
        _ => Err(ContractError::config_validation(
            field,
            format!("'{key}' is required"),
        )),
    }
}

fn parse_optional_u64(
    params: &HashMap<String, String>,
    field: &str,
    key: &str,
) -> Result<(), ContractError> {
    if let Some(value) = params.get(key) {
        value.trim().parse::<u64>().map_err(|e| {
            ContractError::config_validation(
                field,
                format!("'{key}' must be a non-negative integer, got '{value}': {e}"),
            )
        })?;
    }
    Ok(())
}
