// src/lib.rs
// =============================================================================
// site-crawler: a concurrent, depth-bounded site crawler.
//
// Start from a seed URL, follow links up to a maximum depth, fetch every
// distinct page exactly once, and report what each page contains.
//
// Modules:
// - fetch: how pages are retrieved (the Fetcher trait + implementations)
// - crawl: the concurrent traversal engine
// - report: where per-page results are sent while crawling
// - config: runtime settings for a crawl
// =============================================================================

pub mod config;
pub mod crawl;
pub mod fetch;
pub mod report;

pub use config::CrawlConfig;
pub use crawl::{CrawlReport, Crawler, FetchOutcome, VisitedSet};
pub use fetch::{CannedFetcher, FetchError, Fetcher, HttpFetcher, Page};
pub use report::{ConsoleReporter, Reporter, SilentReporter};
