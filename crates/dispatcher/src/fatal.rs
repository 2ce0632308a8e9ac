//! FatalErrorGate - single-shot escalation of unrecoverable failures
//!
//! Any thread may report. The first report logs the failure and invokes the
//! [`Terminator`]; every later report is a no-op.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, error};

use crate::error::{DispatcherError, Phase};

/// Exit status used when the gate fires
pub const EXIT_CODE: i32 = 1;

/// Halt capability invoked by the gate
pub trait Terminator: Send + Sync {
    fn terminate(&self, code: i32);
}

/// Exits the process
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessExit;

impl Terminator for ProcessExit {
    fn terminate(&self, code: i32) {
        std::process::exit(code);
    }
}

pub struct FatalErrorGate {
    tripped: AtomicBool,
    terminator: Arc<dyn Terminator>,
}

impl FatalErrorGate {
    pub fn new(terminator: Arc<dyn Terminator>) -> Self {
        Self {
            tripped: AtomicBool::new(false),
            terminator,
        }
    }

    /// Gate that exits the process with [`EXIT_CODE`]
    pub fn process_exit() -> Self {
        Self::new(Arc::new(ProcessExit))
    }

    /// Report a fatal error
    ///
    /// Returns `true` for the single caller that performed the halt.
    pub fn report(&self, phase: Phase, err: &DispatcherError) -> bool {
        if self
            .tripped
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(phase = %phase, error = %err, "fatal error already reported");
            return false;
        }

        error!(phase = %phase, error = %err, "fatal error; halting");
        observability::record_fatal_error(phase.as_str());
        self.terminator.terminate(EXIT_CODE);
        true
    }

    pub fn is_tripped(&self) -> bool {
        self.tripped.load(Ordering::Acquire)
    }
}

impl Default for FatalErrorGate {
    fn default() -> Self {
        Self::process_exit()
    }
}

impl std::fmt::Debug for FatalErrorGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FatalErrorGate")
            .field("tripped", &self.is_tripped())
            .finish()
    }
}
