//! CLI commands and argument parsing

use crate::types::KeyType;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Cursor-based pagination over a MongoDB collection
#[derive(Parser, Debug)]
#[command(name = "solidafy-pager")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (YAML); MONGODB_* variables override it
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Checkpoint file (JSON)
    #[arg(short, long, global = true)]
    pub state: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Test the connection to the store
    Check,

    /// Fetch a single page
    Fetch {
        /// Key of the last document already seen
        #[arg(long)]
        after: Option<String>,

        /// How to read --after: auto, int, string or object-id
        #[arg(long, value_enum, default_value_t = KeyType::Auto)]
        key_type: KeyType,

        /// Page size (defaults to pagination.page_size)
        #[arg(short, long)]
        limit: Option<u32>,
    },

    /// Walk the collection page by page
    Walk {
        /// Page size (defaults to pagination.page_size)
        #[arg(short, long)]
        limit: Option<u32>,

        /// Stop after this many pages
        #[arg(long)]
        max_pages: Option<u64>,

        /// Continue from the checkpoint saved for this collection
        #[arg(long)]
        resume: bool,
    },
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one message per line)
    Json,
    /// Human-readable output
    Pretty,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_walk() {
        let cli = Cli::parse_from([
            "solidafy-pager",
            "--state",
            "state.json",
            "walk",
            "--limit",
            "50",
            "--max-pages",
            "3",
            "--resume",
        ]);
        assert_eq!(cli.state, Some(PathBuf::from("state.json")));
        assert_eq!(cli.format, OutputFormat::Json);
        match cli.command {
            Commands::Walk {
                limit,
                max_pages,
                resume,
            } => {
                assert_eq!(limit, Some(50));
                assert_eq!(max_pages, Some(3));
                assert!(resume);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_fetch_with_global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "solidafy-pager",
            "fetch",
            "--after",
            "573a1390f29313caabcd4135",
            "-f",
            "pretty",
            "-v",
        ]);
        assert!(cli.verbose);
        assert_eq!(cli.format, OutputFormat::Pretty);
        assert!(matches!(
            cli.command,
            Commands::Fetch {
                after: Some(_),
                key_type: KeyType::Auto,
                limit: None
            }
        ));
    }

    #[test]
    fn test_parse_fetch_key_type() {
        let cli = Cli::parse_from([
            "solidafy-pager",
            "fetch",
            "--after",
            "25",
            "--key-type",
            "string",
        ]);
        assert!(matches!(
            cli.command,
            Commands::Fetch {
                key_type: KeyType::String,
                ..
            }
        ));

        let cli = Cli::parse_from(["solidafy-pager", "fetch", "--key-type", "oid"]);
        assert!(matches!(
            cli.command,
            Commands::Fetch {
                key_type: KeyType::ObjectId,
                ..
            }
        ));

        assert!(
            Cli::try_parse_from(["solidafy-pager", "fetch", "--key-type", "float"]).is_err()
        );
    }

    #[test]
    fn test_parse_rejects_unknown_format() {
        assert!(Cli::try_parse_from(["solidafy-pager", "-f", "parquet", "check"]).is_err());
    }
}
