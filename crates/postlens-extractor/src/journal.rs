//! Journal, per-post snapshots and the resume set
//!
//! The journal is append-only JSONL; each processed post adds exactly one
//! line and nothing is ever rewritten. Snapshots mirror the same entry as
//! `{snapshot_dir}/{post_id}.json` and may be overwritten.

use crate::error::ExtractorError;
use atomic_write_file::AtomicWriteFile;
use postlens_domain::JournalEntry;
use serde_json::Value;
use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Single writer for the journal and snapshot directory
#[derive(Debug)]
pub struct Journal {
    path: PathBuf,
    snapshot_dir: PathBuf,
    file: File,
}

impl Journal {
    /// Open (creating if needed) the journal and snapshot directory
    ///
    /// A journal whose last line was cut short gets a newline first, so the
    /// next entry starts on a fresh line.
    pub fn open(path: &Path, snapshot_dir: &Path) -> Result<Self, ExtractorError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::create_dir_all(snapshot_dir)?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(path)
            .map_err(|e| ExtractorError::Journal(format!("cannot open {}: {}", path.display(), e)))?;

        if needs_newline(&mut file)? {
            warn!("Journal {} ends mid-line, starting a new line", path.display());
            file.write_all(b"\n")?;
            file.flush()?;
        }

        Ok(Self {
            path: path.to_path_buf(),
            snapshot_dir: snapshot_dir.to_path_buf(),
            file,
        })
    }

    /// Append `entry` to the journal, then mirror it as a snapshot
    pub fn record(&mut self, entry: &JournalEntry) -> Result<(), ExtractorError> {
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');
        self.file
            .write_all(line.as_bytes())
            .and_then(|_| self.file.flush())
            .map_err(|e| ExtractorError::Journal(format!("append to {} failed: {}", self.path.display(), e)))?;

        self.write_snapshot(entry)
    }

    /// Atomically write or replace the snapshot for `entry`
    pub fn write_snapshot(&self, entry: &JournalEntry) -> Result<(), ExtractorError> {
        let path = self.snapshot_path(entry.post_id());
        let body = serde_json::to_vec_pretty(entry)?;

        let mut file = AtomicWriteFile::open(&path)?;
        file.write_all(&body)?;
        file.commit()
            .map_err(|e| ExtractorError::Journal(format!("snapshot {} failed: {}", path.display(), e)))?;
        debug!("Wrote snapshot {}", path.display());
        Ok(())
    }

    /// Where the snapshot for `post_id` lives
    pub fn snapshot_path(&self, post_id: &str) -> PathBuf {
        let name: String = post_id
            .chars()
            .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
            .collect();
        self.snapshot_dir.join(format!("{}.json", name))
    }

    /// Journal file path
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn needs_newline(file: &mut File) -> Result<bool, ExtractorError> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(false);
    }
    let mut last = [0u8; 1];
    file.seek(SeekFrom::Start(len - 1))?;
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}

/// Post ids already present in the journal
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResumeSet {
    ids: HashSet<String>,
}

impl ResumeSet {
    /// Scan a journal; a missing file yields an empty set
    ///
    /// Each line contributes `meta.post_id`, else `result.post_id`, else a
    /// top-level `post_id`. Unparseable lines are skipped.
    pub fn scan(path: &Path) -> Result<Self, ExtractorError> {
        let mut set = Self::default();
        if !path.exists() {
            return Ok(set);
        }

        let reader = BufReader::new(File::open(path)?);
        let mut skipped = 0usize;
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Value>(&line).ok().and_then(|v| line_post_id(&v)) {
                Some(id) => {
                    set.ids.insert(id);
                }
                None => skipped += 1,
            }
        }
        if skipped > 0 {
            warn!("Ignored {} unusable lines in {}", skipped, path.display());
        }
        info!("Resume set has {} posts from {}", set.ids.len(), path.display());
        Ok(set)
    }

    /// Whether `post_id` was already processed
    pub fn contains(&self, post_id: &str) -> bool {
        self.ids.contains(post_id)
    }

    /// Mark `post_id` as processed
    pub fn insert(&mut self, post_id: impl Into<String>) -> bool {
        self.ids.insert(post_id.into())
    }

    /// Number of ids
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

fn line_post_id(value: &Value) -> Option<String> {
    [
        value.pointer("/meta/post_id"),
        value.pointer("/result/post_id"),
        value.get("post_id"),
    ]
    .into_iter()
    .flatten()
    .filter_map(|v| match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
    .find(|id| !id.is_empty())
}

/// Read every parseable journal entry, upgrading legacy extractions
///
/// Returns the entries and the number of lines skipped.
pub fn read_entries(path: &Path) -> Result<(Vec<JournalEntry>, usize), ExtractorError> {
    let reader = BufReader::new(File::open(path)?);
    let mut entries = Vec::new();
    let mut skipped = 0usize;
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<JournalEntry>(&line) {
            Ok(mut entry) => {
                entry.upgrade();
                entries.push(entry);
            }
            Err(e) => {
                debug!("Skipping journal line: {}", e);
                skipped += 1;
            }
        }
    }
    Ok((entries, skipped))
}
