//! Command-line interface definitions for the news crawler.
//!
//! All arguments can be provided via command-line flags or environment variables.

use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for one crawl run.
///
/// Flags given here override the `settings` block of the YAML configuration.
///
/// # Examples
///
/// ```sh
/// # Crawl the built-in sources and write JSON
/// newsdesk_crawler -j ./json
///
/// # Custom sources, attach to an existing Chrome
/// newsdesk_crawler -j ./json -c sources.yaml --chrome-url ws://127.0.0.1:9222
///
/// # Static sites only, no Chrome at all
/// newsdesk_crawler -j ./json --http-only
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Output directory for the JSON crawl result
    #[arg(short, long)]
    pub json_output_dir: String,

    /// Optional path to a YAML file with settings and source profiles
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// DevTools URL of a running Chrome to connect to instead of launching one
    #[arg(long, env = "CHROMIUM_REMOTE_DEBUGGING_URL")]
    pub chrome_url: Option<String>,

    /// Timeout for a single page load, in seconds
    #[arg(long)]
    pub nav_timeout_secs: Option<u64>,

    /// Hard deadline per source, in seconds (0 disables it)
    #[arg(long)]
    pub source_timeout_secs: Option<u64>,

    /// Cap on candidate links taken from one listing page
    #[arg(long)]
    pub max_links: Option<usize>,

    /// Fetch every source over plain HTTP, never starting Chrome
    #[arg(long)]
    pub http_only: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from([
            "newsdesk_crawler",
            "--json-output-dir",
            "./json",
            "--config",
            "sources.yaml",
        ]);

        assert_eq!(cli.json_output_dir, "./json");
        assert_eq!(cli.config, Some(PathBuf::from("sources.yaml")));
        assert!(!cli.http_only);
        assert_eq!(cli.nav_timeout_secs, None);
    }

    #[test]
    fn test_cli_short_flags() {
        let cli = Cli::parse_from(["newsdesk_crawler", "-j", "/tmp/json", "-c", "/etc/crawl.yaml"]);

        assert_eq!(cli.json_output_dir, "/tmp/json");
        assert_eq!(cli.config, Some(PathBuf::from("/etc/crawl.yaml")));
    }
}
