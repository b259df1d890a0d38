//! Postlens CLI - structured extraction over crawled social-media corpora.

use clap::Parser;
use postlens_cli::commands;
use postlens_cli::{Cli, Command, Config, Formatter};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Log to stderr so summaries on stdout stay machine-readable
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> postlens_cli::Result<()> {
    let config = Config::load(cli.config.as_deref())?;

    let format = cli
        .format
        .map(Into::into)
        .unwrap_or(config.settings.format);
    let color_enabled = !cli.no_color && config.settings.color;
    let formatter = Formatter::new(format, color_enabled);

    match cli.command {
        Command::Extract(args) => commands::execute_extract(args, &config, &formatter).await?,
        Command::MediaMap(args) => commands::execute_media_map(args, &formatter).await?,
        Command::Augment(args) => commands::execute_augment(args, &formatter)?,
        Command::Export(args) => commands::execute_export(args, &formatter)?,
        Command::Schema(args) => commands::execute_schema(args)?,
    }

    Ok(())
}
