//! DataSource trait - sequential item producer abstraction
//!
//! Decouples the dispatcher from concrete sources (files, channels, mocks).

use thiserror::Error;

/// Errors surfaced by a [`DataSource`]
#[derive(Debug, Error)]
pub enum SourceError {
    /// Stream ended early. Benign: the pull loop stops without escalating.
    #[error("source exhausted")]
    Exhausted,

    /// Transport failure while pulling or closing
    #[error("source '{source_name}' transport error: {message}")]
    Transport {
        source_name: String,
        message: String,
    },

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl SourceError {
    /// Create transport error
    pub fn transport(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Whether this is the benign end-of-stream signal
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted)
    }
}

/// Sequential data source
///
/// Items are opaque to the dispatcher. A single pull thread calls [`next`](Self::next);
/// [`close`](Self::close) may be called from another thread, possibly while `next`
/// is blocked.
///
/// # Contract
///
/// Once `close()` has been called, `next()` must promptly return `Ok(None)` or
/// `Err(SourceError::Exhausted)`. The dispatcher keeps pulling after a
/// cancellation-triggered close and relies on this to terminate.
///
/// Implementations need not make `close()` idempotent; the dispatcher guards
/// against double close.
///
/// # Example
///
/// ```ignore
/// let source: Arc<dyn DataSource<String>> = Arc::new(MockSource::numbered(3));
/// while let Some(item) = source.next()? {
///     println!("{item}");
/// }
/// source.close()?;
/// ```
pub trait DataSource<T>: Send + Sync {
    /// Source name (used for logging)
    fn name(&self) -> &str;

    /// Whether the source should be pulled at all
    fn is_enabled(&self) -> bool;

    /// Pull the next item, blocking if none is available yet
    ///
    /// `Ok(None)` ends the stream.
    fn next(&self) -> Result<Option<T>, SourceError>;

    /// Close the source, releasing underlying resources
    fn close(&self) -> Result<(), SourceError>;
}
