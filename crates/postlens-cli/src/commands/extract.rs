//! Extract command implementation.

use crate::cli::ExtractArgs;
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use postlens_extractor::{Extractor, ExtractorConfig};
use postlens_llm::{EngineConfig, OpenAiCompatEngine};
use postlens_media::HttpFetcher;
use tracing::info;

/// Execute the extract command.
pub async fn execute_extract(args: ExtractArgs, config: &Config, formatter: &Formatter) -> Result<()> {
    let extractor_config = extractor_config(&args, config)?;
    let engine_config = engine_config(&args, config)?;
    info!(
        "Extracting with {} at {}",
        engine_config.model, engine_config.endpoint
    );

    let fetcher = HttpFetcher::new(extractor_config.fetch_timeout())?;
    let engine = OpenAiCompatEngine::new(engine_config)?;
    let extractor = Extractor::new(engine, fetcher, extractor_config)?;
    let summary = extractor.run().await?;

    println!("{}", formatter.format_run_summary(&summary)?);
    if summary.bad_videos > 0 {
        println!(
            "{}",
            formatter.warning(&format!(
                "{} video(s) could not be decoded, see {}",
                summary.bad_videos,
                extractor.config().bad_video_log.display()
            ))
        );
    }
    Ok(())
}

/// File configuration with command-line overrides applied.
pub fn extractor_config(args: &ExtractArgs, config: &Config) -> Result<ExtractorConfig> {
    let mut merged = config.extractor.clone();

    if let Some(root) = &args.corpus_root {
        merged.corpus_root = root.clone();
    }
    if let Some(media_root) = &args.media_root {
        merged.media_root = Some(media_root.clone());
    }
    if let Some(max_images) = args.max_images {
        merged.max_images = max_images;
    }
    if let Some(limit) = args.limit {
        merged.limit = limit;
    }
    if let Some(journal) = &args.journal {
        merged.journal_path = journal.clone();
    }
    if let Some(dir) = &args.snapshot_dir {
        merged.snapshot_dir = dir.clone();
    }
    if let Some(log) = &args.bad_video_log {
        merged.bad_video_log = log.clone();
    }
    if let Some(secs) = args.fetch_timeout {
        merged.fetch_timeout_secs = secs;
    }
    if let Some(allow) = args.allow_remote_download {
        merged.allow_remote_download = allow;
    }
    if let Some(skip) = args.skip_videos {
        merged.skip_videos = skip;
    }
    if let Some(resume) = args.resume {
        merged.resume = resume;
    }
    if let Some(hash_match) = args.hash_match {
        merged.hash_match = hash_match;
    }

    merged.validate().map_err(CliError::Config)?;
    Ok(merged)
}

/// Engine configuration with command-line overrides applied.
pub fn engine_config(args: &ExtractArgs, config: &Config) -> Result<EngineConfig> {
    let mut merged = config.engine.clone();

    if let Some(endpoint) = &args.endpoint {
        merged.endpoint = endpoint.clone();
    }
    if let Some(model) = &args.model {
        merged.model = model.clone();
    }
    if let Some(var) = &args.api_key_env {
        merged.api_key_env = Some(var.clone());
    }
    if let Some(candidates) = args.candidates {
        merged.candidates = candidates;
    }

    merged.validate().map_err(CliError::Config)?;
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_flags_override_file_config() {
        let mut config = Config::default();
        config.extractor.corpus_root = "from-file".into();
        config.extractor.limit = 9;
        config.extractor.resume = true;

        let args = ExtractArgs {
            limit: Some(2),
            skip_videos: Some(true),
            hash_match: Some(false),
            ..Default::default()
        };
        let merged = extractor_config(&args, &config).unwrap();
        assert_eq!(merged.corpus_root, PathBuf::from("from-file"));
        assert_eq!(merged.limit, 2);
        assert!(merged.resume);
        assert!(merged.skip_videos);
        assert!(!merged.hash_match);
    }

    #[test]
    fn test_flags_turn_file_config_off() {
        let mut config = Config::default();
        config.extractor.corpus_root = "from-file".into();
        config.extractor.allow_remote_download = true;
        config.extractor.resume = true;
        config.extractor.hash_match = false;

        let args = ExtractArgs {
            allow_remote_download: Some(false),
            resume: Some(false),
            hash_match: Some(true),
            ..Default::default()
        };
        let merged = extractor_config(&args, &config).unwrap();
        assert!(!merged.allow_remote_download);
        assert!(!merged.resume);
        assert!(merged.hash_match);
    }

    #[test]
    fn test_missing_corpus_root_is_config_error() {
        let result = extractor_config(&ExtractArgs::default(), &Config::default());
        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[test]
    fn test_engine_overrides() {
        let args = ExtractArgs {
            endpoint: Some("http://gpu:9000".into()),
            candidates: Some(2),
            ..Default::default()
        };
        let merged = engine_config(&args, &Config::default()).unwrap();
        assert_eq!(merged.endpoint, "http://gpu:9000");
        assert_eq!(merged.candidates, 2);
        assert_eq!(merged.model, EngineConfig::default().model);
    }
}
