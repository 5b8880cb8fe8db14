// src/report.rs
// =============================================================================
// Where per-page results go while a crawl is running.
//
// The engine reports each page the moment it is fetched (or fails), from
// whichever task fetched it. Reports therefore arrive in no particular order.
// The full, ordered result set is returned separately as a CrawlReport once
// the crawl finishes.
// =============================================================================

use crate::fetch::FetchError;

/// Receives one call per fetched resource.
pub trait Reporter: Send + Sync {
    /// A resource was fetched successfully.
    fn found(&self, id: &str, content: &str);

    /// A resource could not be fetched. The crawl carries on without it.
    fn failed(&self, id: &str, error: &FetchError);
}

impl<R: Reporter + ?Sized> Reporter for std::sync::Arc<R> {
    fn found(&self, id: &str, content: &str) {
        (**self).found(id, content)
    }

    fn failed(&self, id: &str, error: &FetchError) {
        (**self).failed(id, error)
    }
}

/// Prints results as they happen: pages to stdout, failures to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn found(&self, id: &str, content: &str) {
        println!("found: {} {:?}", id, content);
    }

    fn failed(&self, _id: &str, error: &FetchError) {
        eprintln!("❌ {}", error);
    }
}

/// Discards every report (JSON output, tests).
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentReporter;

impl Reporter for SilentReporter {
    fn found(&self, _id: &str, _content: &str) {}

    fn failed(&self, _id: &str, _error: &FetchError) {}
}
