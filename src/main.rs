// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Install the tracing subscriber (logs go to stderr)
// 3. Build a fetcher for the subcommand and run the crawl
// 4. Print the results as a table or as JSON
// 5. Exit with proper code (0 = all pages fetched, 1 = some failed, 2 = error)
// =============================================================================

mod cli;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use site_crawler::{
    CannedFetcher, ConsoleReporter, CrawlReport, Crawler, FetchOutcome, HttpFetcher,
};

const DEMO_SEED: &str = "http://golang.org/";

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let exit_code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

// RUST_LOG wins when it is set; otherwise --verbose picks the level
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "site_crawler=debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

// Returns:
//   Ok(0) = every visited page was fetched
//   Ok(1) = at least one page failed to fetch
//   Err = unexpected error
async fn run(cli: Cli) -> Result<i32> {
    let config = cli.command.config();
    let json = cli.command.json();

    let (seed, crawler) = match &cli.command {
        Commands::Site { website_url, .. } => {
            let mut fetcher = HttpFetcher::new(&config)?;
            if config.same_domain {
                fetcher = fetcher.restrict_to_domain_of(website_url)?;
            }
            (website_url.clone(), Crawler::new(fetcher))
        }
        Commands::Demo { .. } => {
            (DEMO_SEED.to_string(), Crawler::new(CannedFetcher::golang_fixture()))
        }
    };

    // In JSON mode only the final report goes to stdout
    let crawler = if json {
        crawler
    } else {
        println!("🔍 Crawling: {}", seed);
        println!("📊 Max crawl depth: {}\n", config.max_depth);
        crawler.with_reporter(ConsoleReporter)
    };

    let report = crawler.crawl(&seed, config.max_depth).await;

    print_report(&report, json)?;

    if report.failed().next().is_some() {
        Ok(1)
    } else {
        Ok(0)
    }
}

fn print_report(report: &CrawlReport, json: bool) -> Result<()> {
    if json {
        let json_output = serde_json::to_string_pretty(report)?;
        println!("{}", json_output);
    } else {
        print_table(report);
    }
    Ok(())
}

// Prints results as a human-readable table in the terminal
fn print_table(report: &CrawlReport) {
    println!();
    println!("{:<60} {:<10} {:<30}", "URL", "STATUS", "DETAILS");
    println!("{}", "=".repeat(100));

    for (url, outcome) in &report.pages {
        // Truncate URL if too long for display
        let url_display = if url.chars().count() > 57 {
            format!("{}...", url.chars().take(57).collect::<String>())
        } else {
            url.clone()
        };

        let (status, details) = match outcome {
            FetchOutcome::Fetched { content, links } => {
                ("✅ OK", format!("{} link(s), {:?}", links.len(), content))
            }
            FetchOutcome::Failed { error } => ("❌ FAILED", error.to_string()),
        };

        println!("{:<60} {:<10} {:<30}", url_display, status, details);
    }

    println!();

    let ok_count = report.fetched().count();
    let failed_count = report.len() - ok_count;

    println!("📊 Summary:");
    println!("   ✅ Fetched: {}", ok_count);
    println!("   ❌ Failed: {}", failed_count);
    println!("   📋 Total: {}", report.len());
}
