//! LineSource - one item per line of a text input

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use contracts::{DataSource, SourceError};
use tracing::{debug, info, instrument};

type LineReader = Lines<Box<dyn BufRead + Send>>;

/// Source reading `String` items line by line
///
/// End of input yields `Ok(None)`. Read failures surface as `SourceError::Io`.
pub struct LineSource {
    name: String,
    lines: Mutex<Option<LineReader>>,
    max_items: Option<u64>,
    emitted: AtomicU64,
    closed: AtomicBool,
}

impl LineSource {
    /// Open a file
    #[instrument(name = "line_source_open", skip_all, fields(path = %path.display()))]
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        let file = File::open(path)?;
        info!(path = %path.display(), "opened line source");
        Ok(Self::from_reader(
            path.display().to_string(),
            BufReader::new(file),
        ))
    }

    /// Wrap any buffered reader
    pub fn from_reader(name: impl Into<String>, reader: impl BufRead + Send + 'static) -> Self {
        let reader: Box<dyn BufRead + Send> = Box::new(reader);
        Self {
            name: name.into(),
            lines: Mutex::new(Some(reader.lines())),
            max_items: None,
            emitted: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// Stop after `max_items` lines
    pub fn with_max_items(mut self, max_items: u64) -> Self {
        self.max_items = Some(max_items);
        self
    }

    /// Lines emitted so far
    pub fn emitted(&self) -> u64 {
        self.emitted.load(Ordering::Relaxed)
    }
}

impl DataSource<String> for LineSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_enabled(&self) -> bool {
        true
    }

    fn next(&self) -> Result<Option<String>, SourceError> {
        if self.closed.load(Ordering::Acquire) {
            return Ok(None);
        }
        if self.max_items.is_some_and(|max| self.emitted() >= max) {
            debug!(source = %self.name, max_items = ?self.max_items, "max items reached");
            return Ok(None);
        }

        let mut guard = self.lines.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(lines) = guard.as_mut() else {
            return Ok(None);
        };

        match lines.next() {
            Some(Ok(line)) => {
                self.emitted.fetch_add(1, Ordering::Relaxed);
                Ok(Some(line))
            }
            Some(Err(e)) => Err(SourceError::Io(e)),
            None => Ok(None),
        }
    }

    fn close(&self) -> Result<(), SourceError> {
        self.closed.store(true, Ordering::Release);
        // Drops the underlying reader
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        debug!(source = %self.name, emitted = self.emitted(), "line source closed");
        Ok(())
    }
}
