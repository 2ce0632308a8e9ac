//! Dispatch metrics for observability

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

/// Counters for one run
#[derive(Debug, Default)]
pub struct DispatchMetrics {
    /// Items submitted to the pool
    dispatched: AtomicU64,
    /// Units finished without error
    completed: AtomicU64,
    /// Units that returned an error or panicked
    failed: AtomicU64,
    /// Dispatched but not yet finished
    in_flight: AtomicUsize,
    /// Highest observed in-flight count
    peak_in_flight: AtomicUsize,
}

impl DispatchMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Get total dispatched
    pub fn dispatched(&self) -> u64 {
        self.dispatched.load(Ordering::Relaxed)
    }

    /// Get total completed
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    /// Get total failed
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Get current in-flight count
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Get peak in-flight count
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Record one dispatched item
    pub fn record_dispatch(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        observability::record_item_dispatched();
        observability::record_in_flight(now);
    }

    /// Record one finished unit
    pub fn record_completion(&self, success: bool) {
        if success {
            self.completed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
        let now = self.in_flight.fetch_sub(1, Ordering::SeqCst).saturating_sub(1);

        observability::record_unit_completed(success);
        observability::record_in_flight(now);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            dispatched: self.dispatched(),
            completed: self.completed(),
            failed: self.failed(),
            in_flight: self.in_flight(),
            peak_in_flight: self.peak_in_flight(),
        }
    }
}

/// Snapshot of dispatch metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub dispatched: u64,
    pub completed: u64,
    pub failed: u64,
    pub in_flight: usize,
    pub peak_in_flight: usize,
}

/// Items dispatched over elapsed wall time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Throughput {
    pub items: u64,
    pub elapsed: Duration,
}

impl Throughput {
    pub fn new(items: u64, elapsed: Duration) -> Self {
        Self { items, elapsed }
    }

    /// Items per second; 0 when no time has elapsed
    pub fn rate(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.items as f64 / secs
        } else {
            0.0
        }
    }
}

impl fmt::Display for Throughput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} items in {:.3}s ({:.1} items/s)",
            self.items,
            self.elapsed.as_secs_f64(),
            self.rate()
        )
    }
}
