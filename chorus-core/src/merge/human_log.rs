use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use super::{ChangeReport, Conflict, MergeEventListener, MergeLogError};

/// Writes one line of plain text per conflict or change.
///
/// The log file is created (or truncated) on construction and flushed on
/// [`close`](MergeEventListener::close) or when the listener is dropped.
#[derive(Debug)]
pub struct HumanLogMergeEventListener {
    path: PathBuf,
    stream: Option<BufWriter<File>>,
}

impl HumanLogMergeEventListener {
    pub fn new(path: &Path) -> Result<Self, MergeLogError> {
        let file = File::create(path).map_err(|e| MergeLogError::Io(path.to_path_buf(), e))?;
        Ok(Self {
            path: path.to_path_buf(),
            stream: Some(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_line(&mut self, line: &str) -> Result<(), MergeLogError> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| MergeLogError::Closed(self.path.clone()))?;
        writeln!(stream, "{}", line).map_err(|e| MergeLogError::Io(self.path.clone(), e))
    }
}

impl MergeEventListener for HumanLogMergeEventListener {
    fn conflict_occurred(&mut self, conflict: &mut dyn Conflict) -> Result<(), MergeLogError> {
        self.write_line(&conflict.full_human_readable_description())
    }

    fn change_occurred(&mut self, change: &dyn ChangeReport) -> Result<(), MergeLogError> {
        self.write_line(&change.to_string())
    }

    fn entering_context(&mut self, _context: &str) -> Result<(), MergeLogError> {
        Ok(())
    }

    fn close(&mut self) -> Result<(), MergeLogError> {
        if let Some(mut stream) = self.stream.take() {
            stream
                .flush()
                .map_err(|e| MergeLogError::Io(self.path.clone(), e))?;
        }
        Ok(())
    }
}

impl Drop for HumanLogMergeEventListener {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!("Failed to flush merge log: {}", e);
        }
    }
}
