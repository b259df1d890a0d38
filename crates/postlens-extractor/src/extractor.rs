//! Core Extractor implementation

use crate::config::ExtractorConfig;
use crate::corpus::{discover_corpus_files, load_corpus};
use crate::error::ExtractorError;
use crate::failure_log::FailureLog;
use crate::journal::{Journal, ResumeSet};
use crate::parser::parse_extraction;
use crate::prompt::PromptBuilder;
use crate::types::RunSummary;
use chrono::Utc;
use postlens_domain::{
    BadVideoRecord, ExtractionResult, JournalEntry, JournalMeta, MediaUsed, Post,
};
use postlens_llm::{select_text, GenerationRequest, InferenceEngine, LlmError, PrepareOutcome, PreparedRequest};
use postlens_media::{LocalFileIndex, MediaFetcher, MediaResolver};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Mutable state of one run, built from the journal at start
///
/// The journal and snapshot directory are owned here for the whole run.
pub struct RunContext {
    resume: ResumeSet,
    journal: Journal,
    failures: FailureLog,
    summary: RunSummary,
}

impl RunContext {
    /// Open the journal and, in resume mode, load the ids it already holds
    pub fn open(config: &ExtractorConfig) -> Result<Self, ExtractorError> {
        let resume = if config.resume {
            ResumeSet::scan(&config.journal_path)?
        } else {
            ResumeSet::default()
        };
        Ok(Self {
            resume,
            journal: Journal::open(&config.journal_path, &config.snapshot_dir)?,
            failures: FailureLog::new(&config.bad_video_log),
            summary: RunSummary::default(),
        })
    }

    /// Counters so far
    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }
}

/// Runs every post of a corpus through media resolution, the model and the journal
pub struct Extractor<E, F> {
    engine: Arc<E>,
    resolver: MediaResolver<F>,
    config: ExtractorConfig,
}

impl<E, F> Extractor<E, F>
where
    E: InferenceEngine,
    F: MediaFetcher,
{
    /// Create a new Extractor
    pub fn new(engine: E, fetcher: F, config: ExtractorConfig) -> Result<Self, ExtractorError> {
        config.validate().map_err(ExtractorError::Config)?;
        let resolver = MediaResolver::new(fetcher, config.resolve_options())?;
        Ok(Self {
            engine: Arc::new(engine),
            resolver,
            config,
        })
    }

    /// Use a prebuilt content index for `media_root`
    pub fn with_index(mut self, media_root: impl Into<PathBuf>, index: LocalFileIndex) -> Self {
        self.resolver = self.resolver.with_index(media_root, index);
        self
    }

    /// Configuration of this extractor
    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Process the whole corpus
    ///
    /// Bad-video records are flushed whether the run completes, stops at the
    /// limit or fails.
    pub async fn run(&self) -> Result<RunSummary, ExtractorError> {
        let mut ctx = RunContext::open(&self.config)?;
        let outcome = self.run_with(&mut ctx).await;
        let flushed = ctx.failures.flush();

        match outcome {
            Ok(()) => {
                flushed?;
                let summary = ctx.summary;
                info!(
                    "Run finished: {} processed, {} resumed, {} degraded, {} bad videos",
                    summary.processed, summary.skipped_resumed, summary.degraded, summary.bad_videos
                );
                Ok(summary)
            }
            Err(e) => {
                if let Err(flush_error) = flushed {
                    warn!("Could not write bad-video log: {}", flush_error);
                }
                Err(e)
            }
        }
    }

    /// Process the corpus against an existing context
    pub async fn run_with(&self, ctx: &mut RunContext) -> Result<(), ExtractorError> {
        let files = discover_corpus_files(&self.config.corpus_root, &self.config.snapshot_dir);
        info!(
            "Found {} corpus files under {}",
            files.len(),
            self.config.corpus_root.display()
        );

        for file in files {
            let corpus = load_corpus(&file)?;
            ctx.summary.files += 1;
            let media_root = self.media_root_for(&file);
            info!("Processing {} ({} posts)", file.display(), corpus.weibo.len());

            for post in &corpus.weibo {
                ctx.summary.posts_seen += 1;
                if post.id.is_empty() {
                    ctx.summary.skipped_no_id += 1;
                    continue;
                }
                if self.config.resume && ctx.resume.contains(&post.id) {
                    debug!("Post {} already in journal", post.id);
                    ctx.summary.skipped_resumed += 1;
                    continue;
                }

                let entry = self.extract_post(ctx, post, &file, &media_root).await?;
                ctx.journal.record(&entry)?;
                ctx.resume.insert(post.id.clone());
                ctx.summary.processed += 1;
                if entry.result.is_degraded() {
                    ctx.summary.degraded += 1;
                }
                info!(
                    "Post {} done ({} images, {} videos)",
                    post.id,
                    entry.result.media_used.images.len(),
                    entry.result.media_used.videos.len()
                );

                if self.config.limit > 0 && ctx.summary.processed >= self.config.limit {
                    info!("Reached limit of {} posts, stopping", self.config.limit);
                    ctx.summary.stopped_at_limit = true;
                    return Ok(());
                }
            }
        }
        Ok(())
    }

    fn media_root_for(&self, corpus_file: &Path) -> PathBuf {
        self.config.media_root.clone().unwrap_or_else(|| {
            corpus_file
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default()
        })
    }

    /// Resolve media, query the model and build the journal entry for one post
    async fn extract_post(
        &self,
        ctx: &mut RunContext,
        post: &Post,
        corpus_file: &Path,
        media_root: &Path,
    ) -> Result<JournalEntry, ExtractorError> {
        let resolved = self.resolver.resolve(post, media_root).await;
        let request = PromptBuilder::new(&post.id, &post.content)
            .request(&resolved.images, resolved.video.as_ref());

        let (prepared, video) = match self.engine.prepare(&request).await? {
            PrepareOutcome::Ready(prepared) => (prepared, resolved.video.clone()),
            PrepareOutcome::VideoUndecodable { path, error } => {
                warn!("Post {}: dropping undecodable video {}: {}", post.id, path.display(), error);
                ctx.failures.push(BadVideoRecord {
                    post_id: post.id.clone(),
                    video_path: path.display().to_string(),
                    error,
                    media_root: media_root.display().to_string(),
                });
                ctx.summary.bad_videos += 1;
                (self.prepare_images_only(&request).await?, None)
            }
        };

        let outputs = self.engine.generate(std::slice::from_ref(&prepared)).await?;
        let text = select_text(&outputs);
        debug!("Post {}: {} chars of model output", post.id, text.len());

        Ok(JournalEntry {
            meta: JournalMeta {
                post_id: post.id.clone(),
                source_corpus_file: corpus_file.display().to_string(),
                created_at: Utc::now().to_rfc3339(),
                model_id: self.engine.model_id().to_string(),
                publish_time: Some(post.publish_time.clone()).filter(|t| !t.is_empty()),
            },
            input: post.clone(),
            result: ExtractionResult {
                post_id: post.id.clone(),
                extraction: parse_extraction(&post.id, &text),
                media_used: MediaUsed {
                    images: resolved.images.iter().map(|p| p.display().to_string()).collect(),
                    videos: video.iter().map(|p| p.display().to_string()).collect(),
                },
            },
        })
    }

    async fn prepare_images_only(
        &self,
        request: &GenerationRequest,
    ) -> Result<PreparedRequest, ExtractorError> {
        match self.engine.prepare(&request.without_videos()).await? {
            PrepareOutcome::Ready(prepared) => Ok(prepared),
            PrepareOutcome::VideoUndecodable { path, error } => Err(LlmError::Media {
                path: path.display().to_string(),
                reason: error,
            }
            .into()),
        }
    }
}
