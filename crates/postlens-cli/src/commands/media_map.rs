//! Media-map command implementation.

use crate::cli::MediaMapArgs;
use crate::error::Result;
use crate::output::Formatter;
use postlens_extractor::load_corpus;
use postlens_media::{build_media_map, HttpFetcher, MediaFetcher, MediaMapOptions};
use std::fs;
use std::time::Duration;

/// Execute the media-map command.
pub async fn execute_media_map(args: MediaMapArgs, formatter: &Formatter) -> Result<()> {
    let fetcher = HttpFetcher::new(Duration::from_secs(args.fetch_timeout))?;
    run_media_map(&args, &fetcher, formatter).await
}

/// Build and write the map using `fetcher` for downloads.
pub async fn run_media_map<F: MediaFetcher>(
    args: &MediaMapArgs,
    fetcher: &F,
    formatter: &Formatter,
) -> Result<()> {
    let corpus = load_corpus(&args.corpus_file)?;
    let options = MediaMapOptions {
        skip_images: args.skip_image,
        skip_videos: args.skip_video,
    };
    let map = build_media_map(fetcher, &corpus, &args.media_root, options).await?;

    if let Some(parent) = args.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(&args.output, serde_json::to_string_pretty(&map)?)?;

    println!("{}", formatter.format_media_map(&map)?);
    println!("{}", formatter.info(&format!("Wrote {}", args.output.display())));
    Ok(())
}
