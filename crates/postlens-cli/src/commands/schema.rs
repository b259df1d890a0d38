//! Schema command implementation.

use crate::cli::SchemaArgs;
use crate::error::Result;
use postlens_domain::{schema_contract, Extraction};

/// Execute the schema command.
pub fn execute_schema(args: SchemaArgs) -> Result<()> {
    println!("{}", render_schema(&args)?);
    Ok(())
}

/// The decoding schema, or the empty extraction for `--template`.
pub fn render_schema(args: &SchemaArgs) -> Result<String> {
    let rendered = match &args.template {
        Some(post_id) => serde_json::to_string_pretty(&Extraction::empty(post_id.as_str()))?,
        None => serde_json::to_string_pretty(schema_contract())?,
    };
    Ok(rendered)
}
