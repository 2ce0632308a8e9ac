//! Job statistics.

use std::time::Duration;

use contracts::FeederConfig;
use dispatcher::RunSummary;

/// Statistics from a job run
#[derive(Debug, Clone, Default)]
pub struct JobStats {
    /// Items submitted to the worker pool
    pub items_dispatched: u64,

    /// Units finished without error
    pub units_completed: u64,

    /// Units that failed
    pub units_failed: u64,

    /// Highest in-flight count observed
    pub peak_in_flight: usize,

    /// Configured in-flight capacity
    pub queue_depth: usize,

    /// Worker thread count
    pub parallelism: usize,

    /// Total duration of the run
    pub duration: Duration,

    /// Items per second
    pub rate: f64,

    /// Controller received `task_complete()`
    pub completed: bool,
}

impl JobStats {
    pub fn from_summary(summary: &RunSummary, feeder: &FeederConfig, completed: bool) -> Self {
        Self {
            items_dispatched: summary.metrics.dispatched,
            units_completed: summary.metrics.completed,
            units_failed: summary.metrics.failed,
            peak_in_flight: summary.metrics.peak_in_flight,
            queue_depth: feeder.queue_depth,
            parallelism: feeder.parallelism,
            duration: summary.throughput.elapsed,
            rate: summary.throughput.rate(),
            completed,
        }
    }

    /// Peak in-flight as a share of capacity
    pub fn utilization(&self) -> f64 {
        if self.queue_depth > 0 {
            (self.peak_in_flight as f64 / self.queue_depth as f64) * 100.0
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                       Job Statistics                         ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Items dispatched: {}", self.items_dispatched);
        println!("   ├─ Rate: {:.2} items/s", self.rate);
        println!("   └─ Task complete: {}", self.completed);

        println!("\n⚙️  Workers");
        println!("   ├─ Units completed: {}", self.units_completed);
        println!("   ├─ Units failed: {}", self.units_failed);
        println!("   ├─ Parallelism: {}", self.parallelism);
        println!(
            "   └─ Peak in-flight: {} / {} ({:.1}%)",
            self.peak_in_flight,
            self.queue_depth,
            self.utilization()
        );

        println!();
    }
}
