//! Accumulated bad-video records

use crate::error::ExtractorError;
use postlens_domain::BadVideoRecord;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// Bad videos seen during a run, flushed to an append-only JSONL log
#[derive(Debug)]
pub struct FailureLog {
    path: PathBuf,
    records: Vec<BadVideoRecord>,
}

impl FailureLog {
    /// Log that will be written to `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            records: Vec::new(),
        }
    }

    /// Remember a bad video until the next flush
    pub fn push(&mut self, record: BadVideoRecord) {
        self.records.push(record);
    }

    /// Records not yet flushed
    pub fn pending(&self) -> &[BadVideoRecord] {
        &self.records
    }

    /// Log file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append pending records to the log and clear them
    ///
    /// Returns how many were written. Nothing is created when there is
    /// nothing to write.
    pub fn flush(&mut self) -> Result<usize, ExtractorError> {
        if self.records.is_empty() {
            return Ok(0);
        }
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut buf = String::new();
        for record in &self.records {
            buf.push_str(&serde_json::to_string(record)?);
            buf.push('\n');
        }
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        file.write_all(buf.as_bytes())?;
        file.flush()?;

        let written = self.records.len();
        self.records.clear();
        info!("Logged {} bad videos to {}", written, self.path.display());
        Ok(written)
    }
}
