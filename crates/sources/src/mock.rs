//! Mock data source
//!
//! Replays a fixed list of items. Used for testing and demos.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use contracts::{DataSource, SourceError};
use tracing::{debug, trace};

/// How a mock source reports the end of its items
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EndSignal {
    /// `Ok(None)`
    #[default]
    Null,
    /// `Err(SourceError::Exhausted)`
    Exhausted,
}

/// Mock data source
///
/// Yields its items in order, then the configured [`EndSignal`] forever.
/// After `close()` every pull returns `Ok(None)`.
pub struct MockSource<T> {
    name: String,
    items: Mutex<VecDeque<T>>,
    end: EndSignal,
    enabled: bool,
    delay: Option<Duration>,
    closed: AtomicBool,
    pulls: AtomicU64,
    close_calls: AtomicU64,
}

impl<T> MockSource<T> {
    /// Create a mock source over the given items
    pub fn new(name: impl Into<String>, items: impl IntoIterator<Item = T>) -> Self {
        Self {
            name: name.into(),
            items: Mutex::new(items.into_iter().collect()),
            end: EndSignal::Null,
            enabled: true,
            delay: None,
            closed: AtomicBool::new(false),
            pulls: AtomicU64::new(0),
            close_calls: AtomicU64::new(0),
        }
    }

    /// End with the given signal once items run out
    pub fn with_end(mut self, end: EndSignal) -> Self {
        self.end = end;
        self
    }

    /// Sleep before every pull
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Report the source as disabled
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Number of `next()` calls so far
    pub fn pulls(&self) -> u64 {
        self.pulls.load(Ordering::SeqCst)
    }

    /// Number of `close()` calls so far
    pub fn close_calls(&self) -> u64 {
        self.close_calls.load(Ordering::SeqCst)
    }

    /// Whether `close()` has been called
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Items not yet pulled
    pub fn remaining(&self) -> usize {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl MockSource<String> {
    /// Create a source yielding `item-0 .. item-{count-1}`
    pub fn numbered(count: u64) -> Self {
        Self::new("mock", (0..count).map(|i| format!("item-{i}")))
    }
}

impl<T: Send> DataSource<T> for MockSource<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn next(&self) -> Result<Option<T>, SourceError> {
        self.pulls.fetch_add(1, Ordering::SeqCst);

        if self.closed.load(Ordering::SeqCst) {
            trace!(source = %self.name, "pull after close");
            return Ok(None);
        }

        if let Some(delay) = self.delay {
            thread::sleep(delay);
        }

        let item = self
            .items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();

        match (item, self.end) {
            (Some(item), _) => Ok(Some(item)),
            (None, EndSignal::Null) => Ok(None),
            (None, EndSignal::Exhausted) => Err(SourceError::Exhausted),
        }
    }

    fn close(&self) -> Result<(), SourceError> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        self.closed.store(true, Ordering::SeqCst);
        debug!(source = %self.name, remaining = self.remaining(), "mock source closed");
        Ok(())
    }
}
