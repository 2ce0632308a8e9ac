//! Isolated execution of shutdown steps
//!
//! A step runs on its own named thread and the caller joins it unconditionally.
//! Cancellation of the calling context is never observed by the join.

use std::thread;

use tracing::trace;

use crate::error::{DispatcherError, Phase};

/// Run `step` on a helper thread and wait for it to finish
///
/// A panic inside `step` becomes [`DispatcherError::Panicked`] for `phase`.
pub fn run_isolated<R, F>(phase: Phase, step: F) -> Result<R, DispatcherError>
where
    F: FnOnce() -> Result<R, DispatcherError> + Send,
    R: Send,
{
    thread::scope(|scope| {
        let handle = thread::Builder::new()
            .name(format!("feeder-{phase}"))
            .spawn_scoped(scope, step)
            .map_err(|source| DispatcherError::Spawn { phase, source })?;

        trace!(phase = %phase, "waiting for isolated step");
        match handle.join() {
            Ok(result) => result,
            Err(payload) => Err(DispatcherError::panicked(phase, &*payload)),
        }
    })
}
