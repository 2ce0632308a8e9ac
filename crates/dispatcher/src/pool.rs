//! WorkerPool - fixed-parallelism pool with a shared failure handler

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::{Builder, Handle, Runtime};
use tokio_util::task::TaskTracker;
use tracing::{debug, info, instrument, warn};

use crate::error::{panic_message, DispatcherError};

/// Receives every unit failure (error or panic)
pub type FailureHandler = Arc<dyn Fn(DispatcherError) + Send + Sync>;

/// Pool of `parallelism` worker threads
///
/// Units run on the blocking pool of a dedicated tokio runtime, capped at
/// `parallelism` threads. Completion order is unspecified.
pub struct WorkerPool {
    runtime: Option<Runtime>,
    handle: Handle,
    tracker: TaskTracker,
    accepting: AtomicBool,
    parallelism: usize,
    on_failure: FailureHandler,
}

impl WorkerPool {
    /// Start the pool
    #[instrument(name = "worker_pool_start", skip(on_failure))]
    pub fn start(parallelism: usize, on_failure: FailureHandler) -> Result<Self, DispatcherError> {
        if parallelism == 0 {
            return Err(DispatcherError::invalid_config("parallelism must be > 0"));
        }

        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(parallelism)
            .thread_name("feeder-worker")
            .enable_time()
            .build()
            .map_err(DispatcherError::PoolStart)?;
        let handle = runtime.handle().clone();

        debug!(parallelism, "worker pool started");
        Ok(Self {
            runtime: Some(runtime),
            handle,
            tracker: TaskTracker::new(),
            accepting: AtomicBool::new(true),
            parallelism,
            on_failure,
        })
    }

    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    /// Runtime handle (admission waits and background tasks)
    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Units submitted and not yet finished
    pub fn pending(&self) -> usize {
        self.tracker.len()
    }

    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::SeqCst)
    }

    /// Run `unit` on a worker thread
    ///
    /// `held` is passed to `unit` and dropped only after the unit finished and
    /// any failure (an `Err` or a panic) went to the failure handler.
    pub fn submit<H, F>(&self, held: H, unit: F) -> Result<(), DispatcherError>
    where
        H: Send + 'static,
        F: FnOnce(&mut H) -> Result<(), DispatcherError> + Send + 'static,
    {
        if !self.is_accepting() {
            return Err(DispatcherError::PoolShutdown);
        }

        let on_failure = Arc::clone(&self.on_failure);
        self.tracker.spawn_blocking_on(
            move || {
                let mut held = held;
                match panic::catch_unwind(AssertUnwindSafe(|| unit(&mut held))) {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => on_failure(e),
                    Err(payload) => on_failure(DispatcherError::WorkerPanic {
                        message: panic_message(&*payload),
                    }),
                }
                drop(held);
            },
            &self.handle,
        );
        Ok(())
    }

    /// Stop accepting work and wait for every submitted unit
    ///
    /// Returns [`DispatcherError::DrainTimeout`] if units are still running
    /// after `timeout`. The runtime is released either way; units still
    /// running are detached.
    #[instrument(name = "worker_pool_shutdown", skip(self), fields(pending = self.pending()))]
    pub fn shutdown_and_wait(&mut self, timeout: Duration) -> Result<(), DispatcherError> {
        self.accepting.store(false, Ordering::SeqCst);
        self.tracker.close();

        let Some(runtime) = self.runtime.take() else {
            return Ok(());
        };

        let tracker = self.tracker.clone();
        let drained = runtime.block_on(async move {
            tokio::time::timeout(timeout, tracker.wait()).await.is_ok()
        });
        runtime.shutdown_background();

        if drained {
            info!("worker pool drained");
            Ok(())
        } else {
            warn!(
                timeout_secs = timeout.as_secs(),
                pending = self.tracker.len(),
                "worker pool did not drain in time"
            );
            Err(DispatcherError::DrainTimeout {
                timeout_secs: timeout.as_secs(),
            })
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            self.tracker.close();
            runtime.shutdown_background();
        }
    }
}
