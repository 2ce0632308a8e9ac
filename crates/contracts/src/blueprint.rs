//! JobBlueprint - Config Loader 输出
//!
//! 描述一次完整的作业：分发器参数、数据源、处理任务。

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 配置版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// 完整的作业配置蓝图
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobBlueprint {
    /// 配置版本
    #[serde(default)]
    pub version: ConfigVersion,

    /// 分发器设置
    #[serde(default)]
    pub feeder: FeederConfig,

    /// 数据源
    pub source: SourceConfig,

    /// 处理任务
    pub task: TaskConfig,
}

/// 分发器配置：在途上限、并行度
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeederConfig {
    /// 在途单元上限 (admission capacity)
    #[serde(default = "default_queue_depth")]
    pub queue_depth: usize,

    /// 工作线程数
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
}

impl FeederConfig {
    /// Default in-flight capacity
    pub const DEFAULT_QUEUE_DEPTH: usize = 100;
}

impl Default for FeederConfig {
    fn default() -> Self {
        Self {
            queue_depth: default_queue_depth(),
            parallelism: default_parallelism(),
        }
    }
}

fn default_queue_depth() -> usize {
    FeederConfig::DEFAULT_QUEUE_DEPTH
}

fn default_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

/// 数据源配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// 数据源类型
    pub source_type: SourceType,

    /// 是否启用 (禁用时直接进入关闭流程)
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// 类型特定参数
    #[serde(default)]
    pub params: HashMap<String, String>,
}

fn default_enabled() -> bool {
    true
}

/// 数据源类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    /// 按行读取文本文件 (params: path, max_items)
    Lines,
    /// 生成编号条目 (params: count, delay_ms)
    Mock,
}

/// 处理任务配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskConfig {
    /// 任务类型
    pub task_type: TaskType,

    /// 关闭时等待在途任务的超时 (秒)
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,

    /// 类型特定参数
    #[serde(default)]
    pub params: HashMap<String, String>,
}

fn default_shutdown_timeout_secs() -> u64 {
    60
}

/// 任务类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    /// 日志输出 (params: delay_ms)
    Log,
    /// 文件输出 (params: path, delay_ms)
    File,
}
