//! BoundedDispatcher - pull loop, bounded admission, drain and completion

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use contracts::{DataSource, FeederConfig, SourceError, TaskController, WorkerTask};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::admission::Admission;
use crate::error::{DispatcherError, Phase};
use crate::fatal::FatalErrorGate;
use crate::isolate::run_isolated;
use crate::metrics::{DispatchMetrics, MetricsSnapshot, Throughput};
use crate::pool::{FailureHandler, WorkerPool};

/// Result of a run that reached `task_complete()`
#[derive(Debug, Clone, Copy)]
pub struct RunSummary {
    pub throughput: Throughput,
    pub metrics: MetricsSnapshot,
}

/// Closes the source at most once, from whichever thread gets there first
struct SourceCloser<T> {
    source: Arc<dyn DataSource<T>>,
    closed: AtomicBool,
}

impl<T> SourceCloser<T> {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn close(&self) -> Result<(), SourceError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        info!(source = self.source.name(), "closing source");
        self.source.close()
    }
}

/// Builder for creating a BoundedDispatcher
pub struct DispatcherBuilder<T> {
    source: Arc<dyn DataSource<T>>,
    task: Arc<dyn WorkerTask<T>>,
    controller: Arc<dyn TaskController>,
    queue_depth: usize,
    parallelism: usize,
    cancel: CancellationToken,
    gate: Option<Arc<FatalErrorGate>>,
}

impl<T: Send + 'static> DispatcherBuilder<T> {
    /// Create a new DispatcherBuilder with default feeder settings
    pub fn new(
        source: Arc<dyn DataSource<T>>,
        task: Arc<dyn WorkerTask<T>>,
        controller: Arc<dyn TaskController>,
    ) -> Self {
        let defaults = FeederConfig::default();
        Self {
            source,
            task,
            controller,
            queue_depth: defaults.queue_depth,
            parallelism: defaults.parallelism,
            cancel: CancellationToken::new(),
            gate: None,
        }
    }

    /// Apply queue depth and parallelism from configuration
    pub fn feeder_config(mut self, config: &FeederConfig) -> Self {
        self.queue_depth = config.queue_depth;
        self.parallelism = config.parallelism;
        self
    }

    /// Maximum dispatched-but-unfinished items
    pub fn queue_depth(mut self, queue_depth: usize) -> Self {
        self.queue_depth = queue_depth;
        self
    }

    /// Worker thread count
    pub fn parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism;
        self
    }

    /// Cooperative cancellation for the run
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Fatal error gate (defaults to one that exits the process)
    pub fn gate(mut self, gate: Arc<FatalErrorGate>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Build the dispatcher and start its worker pool
    #[instrument(
        name = "dispatcher_builder_build",
        skip(self),
        fields(queue_depth = self.queue_depth, parallelism = self.parallelism)
    )]
    pub fn build(self) -> Result<BoundedDispatcher<T>, DispatcherError> {
        if self.queue_depth == 0 {
            return Err(DispatcherError::invalid_config("queue_depth must be > 0"));
        }
        if self.queue_depth > Semaphore::MAX_PERMITS {
            return Err(DispatcherError::invalid_config(format!(
                "queue_depth must be <= {}",
                Semaphore::MAX_PERMITS
            )));
        }

        let gate = self
            .gate
            .unwrap_or_else(|| Arc::new(FatalErrorGate::process_exit()));
        let metrics = Arc::new(DispatchMetrics::new());

        let on_failure: FailureHandler = {
            let gate = Arc::clone(&gate);
            Arc::new(move |err: DispatcherError| {
                gate.report(Phase::Worker, &err);
            })
        };
        let pool = WorkerPool::start(self.parallelism, on_failure)?;
        let admission = Admission::new(
            self.queue_depth,
            pool.handle().clone(),
            Arc::clone(&metrics),
        );

        let closer = Arc::new(SourceCloser {
            source: Arc::clone(&self.source),
            closed: AtomicBool::new(false),
        });
        spawn_cancel_watcher(&pool, &self.cancel, &closer, &gate);

        info!(
            source = self.source.name(),
            task = self.task.name(),
            "dispatcher ready"
        );

        Ok(BoundedDispatcher {
            source: self.source,
            task: self.task,
            controller: self.controller,
            pool,
            admission,
            closer,
            gate,
            metrics,
            cancel: self.cancel,
            started: Instant::now(),
            throughput_reported: false,
        })
    }
}

/// Close the source as soon as cancellation fires
///
/// Releases a pull thread blocked inside `next()`. `close()` may block, so it
/// runs on its own thread and never holds the pool runtime's only worker (the
/// drain timer depends on it). Ends with the pool runtime.
fn spawn_cancel_watcher<T: Send + 'static>(
    pool: &WorkerPool,
    cancel: &CancellationToken,
    closer: &Arc<SourceCloser<T>>,
    gate: &Arc<FatalErrorGate>,
) {
    let cancel = cancel.clone();
    let closer = Arc::clone(closer);
    let gate = Arc::clone(gate);
    pool.handle().spawn(async move {
        cancel.cancelled().await;
        if closer.is_closed() {
            return;
        }
        info!("cancellation received");

        let report = Arc::clone(&gate);
        let spawned = thread::Builder::new()
            .name(format!("feeder-{}", Phase::SourceClose))
            .spawn(move || {
                if let Err(e) = closer.close() {
                    report.report(Phase::SourceClose, &DispatcherError::SourceClose(e));
                }
            });
        if let Err(source) = spawned {
            gate.report(
                Phase::SourceClose,
                &DispatcherError::Spawn {
                    phase: Phase::SourceClose,
                    source,
                },
            );
        }
    });
}

/// Feeds items from a source to a worker pool with bounded in-flight work
///
/// One dispatcher per run. `run()` blocks the calling thread, which must not be
/// a tokio runtime thread.
pub struct BoundedDispatcher<T> {
    source: Arc<dyn DataSource<T>>,
    task: Arc<dyn WorkerTask<T>>,
    controller: Arc<dyn TaskController>,
    pool: WorkerPool,
    admission: Admission,
    closer: Arc<SourceCloser<T>>,
    gate: Arc<FatalErrorGate>,
    metrics: Arc<DispatchMetrics>,
    cancel: CancellationToken,
    started: Instant,
    throughput_reported: bool,
}

impl<T: Send + 'static> BoundedDispatcher<T> {
    /// Run the pull loop, then drain and complete
    ///
    /// Returns `Ok` only after `task_complete()` succeeded. Every error has
    /// already been reported to the fatal error gate when it is returned.
    #[instrument(
        name = "dispatcher_run",
        skip(self),
        fields(
            source = self.source.name(),
            queue_depth = self.admission.capacity(),
            parallelism = self.pool.parallelism()
        )
    )]
    pub fn run(mut self) -> Result<RunSummary, DispatcherError> {
        self.started = Instant::now();

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.drive()))
            .unwrap_or_else(|payload| Err(DispatcherError::panicked(Phase::PullLoop, &*payload)));

        match outcome {
            Ok(summary) => Ok(summary),
            Err(err) => {
                self.report_throughput();
                self.gate.report(err.phase(), &err);
                Err(err)
            }
        }
    }

    fn drive(&mut self) -> Result<RunSummary, DispatcherError> {
        if self.source.is_enabled() {
            info!("pull loop started");
            while self.fill_slot()? {
                if self.cancel.is_cancelled() {
                    self.close_source_if_needed()?;
                }
            }
        } else {
            info!(source = self.source.name(), "source disabled; skipping pull loop");
        }

        self.close_source_if_needed()?;

        let timeout = Duration::from_secs(self.controller.shutdown_timeout_secs());
        let pool = &mut self.pool;
        run_isolated(Phase::PoolDrain, || pool.shutdown_and_wait(timeout))?;

        if self.gate.is_tripped() {
            warn!("fatal error reported during run; skipping task_complete");
            return Err(DispatcherError::Halted);
        }

        info!("all workers exited; sending task_complete");
        let summary = self.report_throughput();

        let controller = &self.controller;
        run_isolated(Phase::TaskComplete, || {
            controller
                .task_complete()
                .map_err(DispatcherError::TaskComplete)
        })?;

        Ok(summary)
    }

    /// One admission + pull + submit step
    ///
    /// Returns `false` when the source has no more items.
    fn fill_slot(&mut self) -> Result<bool, DispatcherError> {
        if self.gate.is_tripped() {
            return Err(DispatcherError::Halted);
        }

        let interruptible = !self.closer.is_closed();
        let mut slot = match self.admission.acquire(&self.cancel, interruptible) {
            Ok(slot) => slot,
            Err(DispatcherError::Interrupted) => {
                debug!("admission wait interrupted by cancellation");
                return Ok(true);
            }
            Err(e) => return Err(e),
        };
        // a failed unit releases its slot only after reporting
        if self.gate.is_tripped() {
            return Err(DispatcherError::Halted);
        }

        let item = match self.source.next() {
            Ok(Some(item)) => item,
            Ok(None) => {
                info!(dispatched = self.metrics.dispatched(), "exiting on null item");
                return Ok(false);
            }
            Err(SourceError::Exhausted) => {
                info!(
                    dispatched = self.metrics.dispatched(),
                    "exiting on premature stream termination"
                );
                return Ok(false);
            }
            Err(e) => return Err(e.into()),
        };

        slot.mark_dispatched();
        let task = Arc::clone(&self.task);
        self.pool.submit(slot, move |slot| {
            task.process(item)?;
            slot.mark_succeeded();
            Ok(())
        })?;

        Ok(true)
    }

    fn close_source_if_needed(&self) -> Result<(), DispatcherError> {
        if self.closer.is_closed() {
            return Ok(());
        }
        let closer = &self.closer;
        run_isolated(Phase::SourceClose, || {
            closer.close().map_err(DispatcherError::SourceClose)
        })
    }

    fn summary(&self) -> RunSummary {
        let metrics = self.metrics.snapshot();
        RunSummary {
            throughput: Throughput::new(metrics.dispatched, self.started.elapsed()),
            metrics,
        }
    }

    /// Log throughput once per run
    fn report_throughput(&mut self) -> RunSummary {
        let summary = self.summary();
        if !self.throughput_reported {
            self.throughput_reported = true;
            let t = summary.throughput;
            info!(
                items = t.items,
                elapsed_secs = t.elapsed.as_secs_f64(),
                rate = t.rate(),
                "throughput: {t}"
            );
            observability::record_throughput(t.rate(), t.elapsed.as_secs_f64());
        }
        summary
    }
}
