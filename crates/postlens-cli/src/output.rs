//! Output formatting for the CLI.

use crate::config::OutputFormat;
use crate::error::Result;
use colored::*;
use postlens_domain::MediaMap;
use postlens_extractor::{ExportSummary, RunSummary};
use postlens_media::AugmentSummary;
use serde::Serialize;
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

/// Output formatter.
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self {
            format,
            color_enabled,
        }
    }

    /// Format the outcome of an extraction run.
    pub fn format_run_summary(&self, summary: &RunSummary) -> Result<String> {
        let stopped = if summary.stopped_at_limit { "yes" } else { "no" };
        self.format_counts(
            summary,
            &[
                ("Corpus files", summary.files.to_string()),
                ("Posts seen", summary.posts_seen.to_string()),
                ("Processed", summary.processed.to_string()),
                ("Skipped (resumed)", summary.skipped_resumed.to_string()),
                ("Skipped (no id)", summary.skipped_no_id.to_string()),
                ("Unparsed output", summary.degraded.to_string()),
                ("Bad videos", summary.bad_videos.to_string()),
                ("Stopped at limit", stopped.to_string()),
            ],
        )
    }

    /// Format the outcome of an export.
    pub fn format_export_summary(&self, summary: &ExportSummary) -> Result<String> {
        if self.format == OutputFormat::Json {
            return Ok(serde_json::to_string_pretty(&serde_json::json!({
                "in": summary.lines_in,
                "out": summary.lines_out,
            }))?);
        }
        Ok(self.success(&format!(
            "Exported {} of {} records",
            summary.lines_out, summary.lines_in
        )))
    }

    /// Format the outcome of an augment pass.
    pub fn format_augment_summary(&self, summary: &AugmentSummary) -> Result<String> {
        if self.format == OutputFormat::Json {
            return Ok(serde_json::to_string_pretty(&serde_json::json!({
                "posts": summary.posts,
                "posts_linked": summary.posts_linked,
                "links": summary.links,
            }))?);
        }
        Ok(self.success(&format!(
            "Linked {} media file(s) across {} of {} posts",
            summary.links, summary.posts_linked, summary.posts
        )))
    }

    /// Format a media map, as counts in table mode.
    pub fn format_media_map(&self, map: &MediaMap) -> Result<String> {
        self.format_counts(
            map,
            &[
                ("Images matched", map.images.len().to_string()),
                ("Videos matched", map.videos.len().to_string()),
            ],
        )
    }

    fn format_counts<T: Serialize>(&self, value: &T, rows: &[(&str, String)]) -> Result<String> {
        if self.format == OutputFormat::Json {
            return Ok(serde_json::to_string_pretty(value)?);
        }

        let mut builder = Builder::default();
        builder.push_record(["Metric", "Count"]);
        for (label, count) in rows {
            builder.push_record([*label, count.as_str()]);
        }

        let mut table = builder.build();
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()));

        Ok(table.to_string())
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    /// Format an info message.
    pub fn info(&self, message: &str) -> String {
        self.colorize(&format!("ℹ {}", message), "blue")
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "green" => text.green().to_string(),
            "blue" => text.blue().to_string(),
            "yellow" => text.yellow().to_string(),
            _ => text.to_string(),
        }
    }
}
