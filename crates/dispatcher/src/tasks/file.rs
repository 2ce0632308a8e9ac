//! FileTask - appends each item as a line to a file

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use contracts::{TaskError, WorkerTask};
use tracing::{debug, instrument};

/// Task that writes items to a file, one per line
///
/// Line order follows completion order, not dispatch order.
pub struct FileTask {
    name: String,
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
    delay: Option<Duration>,
}

impl FileTask {
    /// Create (or truncate) the output file
    #[instrument(name = "file_task_create", skip(name, path), fields(path = %path.as_ref().display()))]
    pub fn create(name: impl Into<String>, path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)?;

        Ok(Self {
            name: name.into(),
            path,
            writer: Mutex::new(BufWriter::new(file)),
            delay: None,
        })
    }

    /// Sleep this long per item
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<T: std::fmt::Display + Send> WorkerTask<T> for FileTask {
    fn name(&self) -> &str {
        &self.name
    }

    fn process(&self, item: T) -> Result<(), TaskError> {
        if let Some(delay) = self.delay {
            thread::sleep(delay);
        }
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writeln!(writer, "{item}")?;
        Ok(())
    }

    #[instrument(name = "file_task_flush", skip(self), fields(task = %self.name))]
    fn flush(&self) -> Result<(), TaskError> {
        self.writer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .flush()?;
        debug!(path = %self.path.display(), "file task flushed");
        Ok(())
    }
}
