//! Append-only writer for the debug log file
//!
//! Records are appended with a single write each and the file is never
//! truncated or rotated. Nothing coordinates writers in different
//! processes, so concurrent appends may interleave.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{DebugLogError, Result};
use crate::record::LogRecord;

#[derive(Debug, Clone)]
pub struct LogWriter {
    path: PathBuf,
}

impl LogWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Timestamp, render and append `record`. Returns the bytes written.
    pub fn write(&self, record: &LogRecord) -> Result<usize> {
        let timestamp = lib_utils::format_log_timestamp(lib_utils::now_local());
        self.append(&record.render(&timestamp))
    }

    /// Append an already rendered block.
    pub fn append(&self, block: &str) -> Result<usize> {
        self.ensure_dir()?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| DebugLogError::filesystem(&self.path, e))?;

        file.write_all(block.as_bytes())
            .map_err(|e| DebugLogError::filesystem(&self.path, e))?;

        tracing::trace!(
            path = %self.path.display(),
            bytes = block.len(),
            "Debug record appended"
        );

        Ok(block.len())
    }

    fn ensure_dir(&self) -> Result<()> {
        let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) else {
            return Ok(());
        };
        if dir.is_dir() {
            return Ok(());
        }

        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(0o755);
        }

        builder
            .create(dir)
            .map_err(|e| DebugLogError::filesystem(dir, e))?;

        tracing::debug!(dir = %dir.display(), "Created debug log directory");
        Ok(())
    }
}
