//! Feeder 指标记录
//!
//! 通过 `metrics` facade 记录；未安装 recorder 时为空操作。

use metrics::{counter, gauge, histogram};

/// 条目已提交到工作池
pub fn record_item_dispatched() {
    counter!("feeder_items_dispatched_total").increment(1);
}

/// 单元结束 (成功 / 失败)
pub fn record_unit_completed(success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!("feeder_units_completed_total", "status" => status).increment(1);
}

/// 当前在途单元数
pub fn record_in_flight(in_flight: usize) {
    gauge!("feeder_in_flight").set(in_flight as f64);
}

/// 运行吞吐量与耗时
pub fn record_throughput(items_per_sec: f64, elapsed_secs: f64) {
    gauge!("feeder_throughput_items_per_sec").set(items_per_sec);
    histogram!("feeder_run_duration_seconds").record(elapsed_secs);
}

/// 致命错误 (按阶段)
pub fn record_fatal_error(phase: &'static str) {
    counter!("feeder_fatal_errors_total", "phase" => phase).increment(1);
}
