//! CLI command definitions and argument parsing.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Postlens CLI - structured extraction over crawled social-media corpora.
#[derive(Debug, Parser)]
#[command(name = "postlens")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<CliFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Configuration file path (default: ~/.postlens/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum CliFormat {
    /// Table format (default)
    Table,
    /// JSON format
    Json,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run extraction over every corpus file under a root
    Extract(ExtractArgs),

    /// Map a corpus file's media URLs to byte-identical local files
    MediaMap(MediaMapArgs),

    /// Record naming-convention media hits onto each post of a corpus file
    Augment(AugmentArgs),

    /// Rewrite a journal for publishing
    Export(ExportArgs),

    /// Print the extraction schema
    Schema(SchemaArgs),
}

/// Arguments for the extract command.
///
/// Every flag overrides the matching `[extractor]` / `[engine]` config value.
#[derive(Debug, Default, Args)]
pub struct ExtractArgs {
    /// Directory searched recursively for corpus `.json` files
    #[arg(long)]
    pub corpus_root: Option<PathBuf>,

    /// Media root (default: each corpus file's directory)
    #[arg(long)]
    pub media_root: Option<PathBuf>,

    /// Maximum images per post
    #[arg(long)]
    pub max_images: Option<usize>,

    /// Keep downloads when no local file matches (`--allow-remote-download=false` disables)
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub allow_remote_download: Option<bool>,

    /// Never send videos to the model
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub skip_videos: Option<bool>,

    /// Skip posts already in the journal
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub resume: Option<bool>,

    /// Stop after this many processed posts (0 = unlimited)
    #[arg(long)]
    pub limit: Option<usize>,

    /// Journal path
    #[arg(long)]
    pub journal: Option<PathBuf>,

    /// Snapshot directory
    #[arg(long)]
    pub snapshot_dir: Option<PathBuf>,

    /// Bad-video log path
    #[arg(long)]
    pub bad_video_log: Option<PathBuf>,

    /// Content-hash matching (`--hash-match=false` disables)
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub hash_match: Option<bool>,

    /// Download timeout in seconds
    #[arg(long)]
    pub fetch_timeout: Option<u64>,

    /// OpenAI-compatible server base URL
    #[arg(long, env = "POSTLENS_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Model served by the endpoint
    #[arg(long, env = "POSTLENS_MODEL")]
    pub model: Option<String>,

    /// Environment variable holding the API key
    #[arg(long)]
    pub api_key_env: Option<String>,

    /// Candidates sampled per post
    #[arg(long)]
    pub candidates: Option<u32>,
}

/// Arguments for the media-map command.
#[derive(Debug, Args)]
pub struct MediaMapArgs {
    /// Corpus file to scan
    #[arg(long)]
    pub corpus_file: PathBuf,

    /// Media root holding img/ and video/
    #[arg(long)]
    pub media_root: PathBuf,

    /// Where to write the map
    #[arg(short, long)]
    pub output: PathBuf,

    /// Leave images out
    #[arg(long)]
    pub skip_image: bool,

    /// Leave videos out
    #[arg(long)]
    pub skip_video: bool,

    /// Download timeout in seconds
    #[arg(long, default_value = "60")]
    pub fetch_timeout: u64,
}

/// Arguments for the augment command.
#[derive(Debug, Args)]
pub struct AugmentArgs {
    /// Corpus file to augment
    #[arg(long)]
    pub corpus_file: PathBuf,

    /// Media root holding img/ and video/
    #[arg(long)]
    pub media_root: PathBuf,

    /// Output file (default: rewrite the corpus file in place)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for the export command.
#[derive(Debug, Args)]
pub struct ExportArgs {
    /// Journal to read
    #[arg(short, long)]
    pub input: PathBuf,

    /// Where to write exported records
    #[arg(short, long)]
    pub output: PathBuf,

    /// Public base URL of the media tree
    #[arg(long)]
    pub media_base_url: String,

    /// Local prefix stripped from stored media paths
    #[arg(long)]
    pub local_prefix: Option<String>,
}

/// Arguments for the schema command.
#[derive(Debug, Args)]
pub struct SchemaArgs {
    /// Print the empty extraction for this post id instead
    #[arg(long)]
    pub template: Option<String>,
}

impl From<CliFormat> for crate::config::OutputFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Table => crate::config::OutputFormat::Table,
            CliFormat::Json => crate::config::OutputFormat::Json,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_command() {
        let cli = Cli::parse_from([
            "postlens",
            "extract",
            "--corpus-root",
            "data/weibo",
            "--resume",
            "--limit",
            "5",
        ]);
        match cli.command {
            Command::Extract(args) => {
                assert_eq!(args.corpus_root, Some(PathBuf::from("data/weibo")));
                assert_eq!(args.resume, Some(true));
                assert_eq!(args.limit, Some(5));
                assert_eq!(args.skip_videos, None);
            }
            _ => panic!("Expected Extract command"),
        }
    }

    #[test]
    fn test_bool_flags_take_explicit_values() {
        let cli = Cli::parse_from([
            "postlens",
            "extract",
            "--allow-remote-download=false",
            "--hash-match=false",
            "--skip-videos",
            "--resume=true",
        ]);
        match cli.command {
            Command::Extract(args) => {
                assert_eq!(args.allow_remote_download, Some(false));
                assert_eq!(args.hash_match, Some(false));
                assert_eq!(args.skip_videos, Some(true));
                assert_eq!(args.resume, Some(true));
            }
            _ => panic!("Expected Extract command"),
        }
        assert!(Cli::try_parse_from(["postlens", "extract", "--resume=maybe"]).is_err());
    }

    #[test]
    fn test_export_requires_base_url() {
        let result = Cli::try_parse_from(["postlens", "export", "-i", "a.jsonl", "-o", "b.jsonl"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["postlens", "schema", "--format", "json", "-v"]);
        assert!(cli.verbose);
        assert!(matches!(cli.format, Some(CliFormat::Json)));
    }

    #[test]
    fn test_media_map_command() {
        let cli = Cli::parse_from([
            "postlens",
            "media-map",
            "--corpus-file",
            "u.json",
            "--media-root",
            "m",
            "-o",
            "map.json",
            "--skip-video",
        ]);
        match cli.command {
            Command::MediaMap(args) => {
                assert!(args.skip_video);
                assert_eq!(args.fetch_timeout, 60);
            }
            _ => panic!("Expected MediaMap command"),
        }
    }
}
