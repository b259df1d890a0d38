//! Export a journal for publishing: upgrade extractions, rewrite media paths

use crate::error::ExtractorError;
use postlens_domain::upgrade_extraction;
use serde_json::Value;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};

/// How local media paths become public URLs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportOptions {
    /// Public base URL the media tree is served under
    pub media_base_url: String,
    /// Local prefix stripped from stored paths
    pub local_prefix: Option<String>,
}

/// Line counts of an export
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportSummary {
    /// Non-blank input lines
    pub lines_in: usize,
    /// Records written
    pub lines_out: usize,
}

const MEDIA_TREE: &str = "weibo/";

/// Map one stored media path to a public URL
///
/// Remote URLs and paths that cannot be placed under the media tree are
/// returned unchanged.
pub fn rewrite_media_path(path: &str, options: &ExportOptions) -> String {
    if path.trim().is_empty() || path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }

    let stripped = options
        .local_prefix
        .as_deref()
        .filter(|prefix| !prefix.is_empty())
        .and_then(|prefix| path.strip_prefix(prefix));
    let relative = match stripped {
        Some(rest) => rest,
        None => {
            let candidate = path.strip_prefix("./").unwrap_or(path);
            if !candidate.starts_with(MEDIA_TREE) {
                return path.to_string();
            }
            candidate
        }
    };

    let base = options.media_base_url.trim_end_matches('/');
    let mut relative = relative.trim_start_matches('/');
    if base.ends_with("/weibo") {
        relative = relative.strip_prefix(MEDIA_TREE).unwrap_or(relative);
    }
    format!("{}/{}", base, relative)
}

/// Upgrade and rewrite one journal record in place
pub fn export_record(record: &mut Value, options: &ExportOptions) {
    if let Some(extraction) = record.pointer_mut("/result/extraction") {
        upgrade_extraction(extraction);
    }
    let Some(media_used) = record
        .pointer_mut("/result/media_used")
        .and_then(Value::as_object_mut)
    else {
        return;
    };

    for key in ["images", "videos"] {
        if let Some(Value::Array(items)) = media_used.get_mut(key) {
            let rewritten: Vec<Value> = items
                .iter()
                .filter_map(Value::as_str)
                .map(|p| Value::String(rewrite_media_path(p, options)))
                .collect();
            *items = rewritten;
        }
    }
}

/// Stream `input` to `output`, one exported record per line
///
/// Blank and malformed lines are skipped.
pub fn export_journal(
    input: &Path,
    output: &Path,
    options: &ExportOptions,
) -> Result<ExportSummary, ExtractorError> {
    if options.media_base_url.trim().is_empty() {
        return Err(ExtractorError::Config("media_base_url must be set".to_string()));
    }
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let reader = BufReader::new(File::open(input)?);
    let mut writer = BufWriter::new(File::create(output)?);
    let mut summary = ExportSummary::default();

    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        summary.lines_in += 1;

        let mut record: Value = match serde_json::from_str(&line) {
            Ok(record) => record,
            Err(e) => {
                debug!("Skipping malformed journal line {}: {}", summary.lines_in, e);
                continue;
            }
        };
        export_record(&mut record, options);
        serde_json::to_writer(&mut writer, &record)?;
        writer.write_all(b"\n")?;
        summary.lines_out += 1;
    }
    writer.flush()?;

    info!(
        "Exported {} of {} records to {}",
        summary.lines_out,
        summary.lines_in,
        output.display()
    );
    Ok(summary)
}
