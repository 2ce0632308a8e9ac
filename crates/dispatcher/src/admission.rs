//! Admission - bounds the number of dispatched-but-unfinished units

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::error::DispatcherError;
use crate::metrics::DispatchMetrics;

/// Counting semaphore sized to the queue depth
///
/// Acquisition blocks the calling (non-runtime) thread by driving the wait on
/// the pool's runtime handle.
pub struct Admission {
    semaphore: Arc<Semaphore>,
    capacity: usize,
    handle: Handle,
    metrics: Arc<DispatchMetrics>,
}

impl Admission {
    pub fn new(capacity: usize, handle: Handle, metrics: Arc<DispatchMetrics>) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
            handle,
            metrics,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Free slots right now
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Block until a slot is free
    ///
    /// When `interruptible` is set, a fired `cancel` token wins over a free slot
    /// and the call returns [`DispatcherError::Interrupted`]. The token is left
    /// cancelled.
    pub fn acquire(
        &self,
        cancel: &CancellationToken,
        interruptible: bool,
    ) -> Result<AdmissionSlot, DispatcherError> {
        let semaphore = Arc::clone(&self.semaphore);
        let permit = self.handle.block_on(async move {
            tokio::select! {
                biased;
                _ = cancel.cancelled(), if interruptible => Err(DispatcherError::Interrupted),
                // the semaphore is never closed; treat it as a stopped run
                permit = semaphore.acquire_owned() => permit.map_err(|_| DispatcherError::Halted),
            }
        })?;

        trace!(available = self.available(), "admission slot acquired");
        Ok(AdmissionSlot {
            permit: Some(permit),
            metrics: Arc::clone(&self.metrics),
            dispatched: false,
            succeeded: false,
        })
    }
}

/// One unit of in-flight capacity
///
/// Dropping the slot returns it to the semaphore, exactly once. A slot that was
/// marked dispatched also records the unit's completion on drop, counted as a
/// failure unless [`mark_succeeded`](Self::mark_succeeded) was called first.
pub struct AdmissionSlot {
    permit: Option<OwnedSemaphorePermit>,
    metrics: Arc<DispatchMetrics>,
    dispatched: bool,
    succeeded: bool,
}

impl AdmissionSlot {
    /// An item now occupies this slot
    pub fn mark_dispatched(&mut self) {
        if !self.dispatched {
            self.dispatched = true;
            self.metrics.record_dispatch();
        }
    }

    pub fn mark_succeeded(&mut self) {
        self.succeeded = true;
    }
}

impl Drop for AdmissionSlot {
    fn drop(&mut self) {
        if self.dispatched {
            self.metrics.record_completion(self.succeeded);
        }
        // in-flight is decremented before the permit becomes available again
        drop(self.permit.take());
    }
}
