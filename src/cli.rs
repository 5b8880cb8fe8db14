// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// Two subcommands:
// - site: crawl a real website over HTTP
// - demo: crawl a small built-in site held in memory (no network needed)
// =============================================================================

use std::time::Duration;

use clap::{Parser, Subcommand};

use site_crawler::config::{CrawlConfig, DEFAULT_MAX_DEPTH, DEFAULT_TIMEOUT_SECS};

#[derive(Parser, Debug)]
#[command(
    name = "site-crawler",
    version,
    about = "Crawl a website concurrently, visiting every page once",
    long_about = "site-crawler starts from a URL, follows links up to a maximum depth and \
                  fetches every distinct page exactly once, many pages at a time."
)]
pub struct Cli {
    /// Log what the crawler is doing (claims, skips, failures) to stderr
    ///
    /// RUST_LOG overrides this when set.
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Crawl a website
    ///
    /// Example: site-crawler site https://example.com --max-depth 2
    Site {
        /// Website URL to start from (e.g., https://example.com)
        website_url: String,

        /// Print the crawl report as JSON instead of a table
        #[arg(long)]
        json: bool,

        /// Maximum crawl depth
        ///
        /// Depth 1 = just the starting page
        /// Depth 2 = starting page + all pages it links to
        /// etc.
        #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
        max_depth: usize,

        /// Per-request timeout in seconds
        #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
        timeout_secs: u64,

        /// Only follow links on the starting URL's domain
        #[arg(long)]
        same_domain: bool,
    },

    /// Crawl the built-in golang.org sample site
    Demo {
        /// Print the crawl report as JSON instead of a table
        #[arg(long)]
        json: bool,

        /// Maximum crawl depth
        #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
        max_depth: usize,
    },
}

impl Commands {
    /// Builds the crawl configuration for this subcommand.
    pub fn config(&self) -> CrawlConfig {
        match self {
            Commands::Site {
                max_depth,
                timeout_secs,
                same_domain,
                ..
            } => CrawlConfig::default()
                .with_max_depth(*max_depth)
                .with_request_timeout(Duration::from_secs(*timeout_secs))
                .with_same_domain(*same_domain),
            Commands::Demo { max_depth, .. } => CrawlConfig::default().with_max_depth(*max_depth),
        }
    }

    pub fn json(&self) -> bool {
        match self {
            Commands::Site { json, .. } | Commands::Demo { json, .. } => *json,
        }
    }
}
