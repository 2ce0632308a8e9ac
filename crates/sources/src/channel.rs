//! ChannelSource - items pushed from another thread
//!
//! `next()` blocks until an item arrives or every sender is dropped.
//! `close()` wakes a blocked `next()`, which then returns `Ok(None)`.

use async_channel::{Receiver, Sender};
use contracts::{DataSource, SourceError};
use tracing::debug;

/// Source backed by a bounded channel
pub struct ChannelSource<T> {
    name: String,
    rx: Receiver<T>,
}

impl<T> ChannelSource<T> {
    /// Create a (sender, source) pair
    pub fn bounded(capacity: usize) -> (Sender<T>, Self) {
        let (tx, rx) = async_channel::bounded(capacity.max(1));
        (
            tx,
            Self {
                name: "channel".to_string(),
                rx,
            },
        )
    }

    pub fn is_closed(&self) -> bool {
        self.rx.is_closed()
    }
}

impl<T: Send> DataSource<T> for ChannelSource<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_enabled(&self) -> bool {
        true
    }

    fn next(&self) -> Result<Option<T>, SourceError> {
        match self.rx.recv_blocking() {
            Ok(item) => Ok(Some(item)),
            // closed and drained
            Err(_) => Ok(None),
        }
    }

    fn close(&self) -> Result<(), SourceError> {
        if self.rx.close() {
            debug!(source = %self.name, pending = self.rx.len(), "channel source closed");
        }
        Ok(())
    }
}
