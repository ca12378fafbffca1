//! JSON lines file: one event record per line, never rewritten.
//! The file is opened lazily and reopened after a failed write, so a missing directory or a
//! full disk costs audit records but never stops the capture loop.

use crate::error::NidsError;
use crate::event::Event;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub struct EventLog {
    path: PathBuf,
    file: Option<File>,
}

impl EventLog {
    /// Create the sink. Opening is attempted now but failure is only logged.
    pub fn open(path: &Path) -> Self {
        let mut log = Self {
            path: path.to_path_buf(),
            file: None,
        };
        if let Err(e) = log.ensure_open() {
            tracing::warn!(path = %path.display(), error = %e, "event log not writable yet");
        }
        log
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_open(&mut self) -> Result<&mut File, std::io::Error> {
        let f = match self.file.take() {
            Some(f) => f,
            None => OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)?,
        };
        Ok(self.file.insert(f))
    }

    /// Append one record as a single line. On failure the handle is dropped and reopened on the
    /// next append.
    pub fn append(&mut self, event: &Event) -> Result<(), NidsError> {
        let mut line = event.to_json()?;
        line.push('\n');
        if let Err(e) = self.write_line(line.as_bytes()) {
            self.file = None;
            return Err(NidsError::Io(e));
        }
        Ok(())
    }

    fn write_line(&mut self, line: &[u8]) -> Result<(), std::io::Error> {
        let f = self.ensure_open()?;
        f.write_all(line)?;
        f.flush()
    }
}
