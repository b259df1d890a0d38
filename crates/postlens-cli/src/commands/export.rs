//! Export command implementation.

use crate::cli::ExportArgs;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use postlens_extractor::{export_journal, ExportOptions};

/// Execute the export command.
pub fn execute_export(args: ExportArgs, formatter: &Formatter) -> Result<()> {
    if args.media_base_url.trim().is_empty() {
        return Err(CliError::InvalidInput("--media-base-url must not be empty".to_string()));
    }
    let options = ExportOptions {
        media_base_url: args.media_base_url,
        local_prefix: args.local_prefix,
    };
    let summary = export_journal(&args.input, &args.output, &options)?;

    println!("{}", formatter.format_export_summary(&summary)?);
    Ok(())
}
