//! Augment command implementation.

use crate::cli::AugmentArgs;
use crate::error::Result;
use crate::output::Formatter;
use postlens_extractor::load_corpus;
use postlens_media::augment_corpus;
use std::fs;

/// Execute the augment command.
pub fn execute_augment(args: AugmentArgs, formatter: &Formatter) -> Result<()> {
    let mut corpus = load_corpus(&args.corpus_file)?;
    let summary = augment_corpus(&mut corpus, &args.media_root);

    let output = args.output.as_ref().unwrap_or(&args.corpus_file);
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(output, serde_json::to_string_pretty(&corpus)?)?;

    println!("{}", formatter.format_augment_summary(&summary)?);
    Ok(())
}
