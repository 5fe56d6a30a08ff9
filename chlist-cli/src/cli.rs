use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "chlist",
    about = "Chlist - CLI tool for browsing channel listings and resolving their streams",
    version,
    author
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Request timeout in seconds [config: timeout_secs, default 30]
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Number of retry attempts [config: retries, default 3]
    #[arg(long, global = true)]
    pub retries: Option<u32>,

    /// Hand DASH and HLS manifests to the adaptive input stream
    #[arg(long, global = true)]
    pub adaptive: bool,

    /// Proxy URL (supports http, https, socks5)
    #[arg(long, global = true)]
    pub proxy: Option<String>,

    /// Proxy username (if proxy requires authentication)
    #[arg(long, global = true)]
    pub proxy_username: Option<String>,

    /// Proxy password (if proxy requires authentication)
    #[arg(long, global = true)]
    pub proxy_password: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List a channel's main list, or one of its folders
    List {
        /// Channel code, e.g. "svt" or "vtm"
        channel: String,

        /// Folder to open, as item numbers from the main list (e.g. "10/3")
        #[arg(short, long, conflicts_with = "url")]
        path: Option<String>,

        /// Folder url to open directly
        #[arg(short, long)]
        url: Option<String>,

        /// Output format [config: output, default pretty]
        #[arg(short, long)]
        output: Option<OutputFormat>,

        /// Save output to file
        #[arg(short = 'O', long)]
        output_file: Option<PathBuf>,
    },

    /// Search a channel
    Search {
        /// Channel code, e.g. "svt"
        channel: String,

        /// The search term
        query: String,

        /// Output format [config: output, default pretty]
        #[arg(short, long)]
        output: Option<OutputFormat>,

        /// Save output to file
        #[arg(short = 'O', long)]
        output_file: Option<PathBuf>,
    },

    /// Resolve the streams of a video url
    Resolve {
        /// The URL of the video
        #[arg(short, long)]
        url: String,

        /// Channel code, detected from the url when omitted
        #[arg(long)]
        channel: Option<String>,

        /// The cookies to use for the request
        #[arg(long)]
        cookies: Option<String>,

        /// Output format [config: output, default pretty]
        #[arg(short, long)]
        output: Option<OutputFormat>,

        /// Save output to file
        #[arg(short = 'O', long)]
        output_file: Option<PathBuf>,

        /// Filter streams by quality (e.g., "1280x720")
        #[arg(long)]
        quality: Option<String>,

        /// Filter streams by format (e.g., "hls", "dash")
        #[arg(long)]
        format: Option<String>,

        /// Auto-select the highest bitrate stream without prompt
        #[arg(long)]
        auto_select: bool,
    },

    /// List supported channels
    Channels {
        /// Show detailed information about each channel
        #[arg(short, long)]
        detailed: bool,

        /// Output format [config: output, default pretty]
        #[arg(short, long)]
        output: Option<OutputFormat>,
    },

    /// Generate shell completions
    Completions {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },

    /// Show configuration information
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,

        /// Reset configuration to defaults
        #[arg(long)]
        reset: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    /// Pretty-printed human-readable output
    #[default]
    Pretty,
    /// JSON output
    Json,
    /// Compact JSON output
    JsonCompact,
    /// Table format
    Table,
    /// CSV format
    Csv,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Pretty => write!(f, "pretty"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::JsonCompact => write!(f, "json-compact"),
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}

/// Parses a `--path` value of 1-based item numbers, e.g. "10/3".
pub fn parse_item_path(path: &str) -> Result<Vec<usize>, String> {
    path.split('/')
        .filter(|part| !part.trim().is_empty())
        .map(|part| {
            part.trim()
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .ok_or_else(|| format!("invalid item number '{part}'"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_item_path() {
        assert_eq!(parse_item_path("10/3"), Ok(vec![9, 2]));
        assert_eq!(parse_item_path("/2/"), Ok(vec![1]));
        assert!(parse_item_path("0").is_err());
        assert!(parse_item_path("a/1").is_err());
    }

    #[test]
    fn test_args_parse_resolve() {
        let args = Args::parse_from([
            "chlist",
            "resolve",
            "--url",
            "https://www.svtplay.se/video/jXvGqb",
            "--auto-select",
            "-o",
            "json",
        ]);
        match args.command {
            Commands::Resolve {
                url,
                auto_select,
                output,
                ..
            } => {
                assert_eq!(url, "https://www.svtplay.se/video/jXvGqb");
                assert!(auto_select);
                assert_eq!(output, Some(OutputFormat::Json));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_unset_flags_stay_unset() {
        let args = Args::parse_from(["chlist", "list", "svt", "--path", "10"]);
        assert_eq!(args.timeout, None);
        assert_eq!(args.retries, None);
        match args.command {
            Commands::List { output, path, .. } => {
                assert_eq!(output, None);
                assert_eq!(path.as_deref(), Some("10"));
            }
            other => panic!("unexpected command: {other:?}"),
        }

        let args = Args::parse_from(["chlist", "--timeout", "5", "channels", "-o", "json-compact"]);
        assert_eq!(args.timeout, Some(5));
        assert!(matches!(
            args.command,
            Commands::Channels {
                output: Some(OutputFormat::JsonCompact),
                ..
            }
        ));
    }
}
