//! Postlens Extractor
//!
//! Runs a crawled corpus through media resolution and a multimodal model,
//! one post at a time, and records every result durably.
//!
//! # Architecture
//!
//! ```text
//! corpus/*.json → Post → MediaResolver → PromptBuilder → InferenceEngine
//!                                                          ↓
//!                          snapshot/{post_id}.json ← Journal (JSONL)
//! ```
//!
//! # Durability
//!
//! The journal is append-only; each processed post adds exactly one line.
//! In resume mode the run starts by scanning it and skips every post already
//! present, so an interrupted run is recovered by simply running again.
//!
//! # Example Usage
//!
//! ```no_run
//! use postlens_extractor::{Extractor, ExtractorConfig};
//! use postlens_llm::MockEngine;
//! use postlens_media::MockFetcher;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut config = ExtractorConfig::for_root("data/weibo");
//! config.resume = true;
//!
//! let extractor = Extractor::new(MockEngine::default(), MockFetcher::new(), config)?;
//! let summary = extractor.run().await?;
//!
//! println!("Processed: {} posts", summary.processed);
//! println!("Bad videos: {}", summary.bad_videos);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod config;
mod corpus;
mod error;
mod export;
mod extractor;
mod failure_log;
mod journal;
mod parser;
mod prompt;
mod types;

#[cfg(test)]
mod tests;

pub use config::ExtractorConfig;
pub use corpus::{discover_corpus_files, load_corpus};
pub use error::ExtractorError;
pub use export::{export_journal, export_record, rewrite_media_path, ExportOptions, ExportSummary};
pub use extractor::{Extractor, RunContext};
pub use failure_log::FailureLog;
pub use journal::{read_entries, Journal, ResumeSet};
pub use parser::parse_extraction;
pub use prompt::{PromptBuilder, SYSTEM_INSTRUCTION};
pub use types::RunSummary;
