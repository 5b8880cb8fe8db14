// src/fetch/canned.rs
// =============================================================================
// A Fetcher that serves canned results from memory.
//
// Used by the `demo` subcommand and by the tests: every crawl against it is
// deterministic and needs no network. It also counts how many times each id
// was fetched, which is how the tests prove a page is visited at most once.
// =============================================================================

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{FetchError, Fetcher, Page};

/// In-memory fetcher backed by a fixed id -> page map.
#[derive(Debug, Default)]
pub struct CannedFetcher {
    pages: HashMap<String, Page>,
    calls: Mutex<HashMap<String, usize>>,
}

impl CannedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a page with the given content and outgoing links.
    pub fn with_page(mut self, id: &str, content: &str, links: &[&str]) -> Self {
        let links = links.iter().map(|link| link.to_string()).collect();
        self.pages.insert(id.to_string(), Page::new(content, links));
        self
    }

    /// The small golang.org site used by the `demo` subcommand.
    ///
    /// `/cmd/` is linked from several pages but has no entry, so a crawl of
    /// this graph always reports one not-found error.
    pub fn golang_fixture() -> Self {
        Self::new()
            .with_page(
                "http://golang.org/",
                "The Go Programming Language",
                &["http://golang.org/pkg/", "http://golang.org/cmd/"],
            )
            .with_page(
                "http://golang.org/pkg/",
                "Packages",
                &[
                    "http://golang.org/",
                    "http://golang.org/cmd/",
                    "http://golang.org/pkg/fmt/",
                    "http://golang.org/pkg/os/",
                ],
            )
            .with_page(
                "http://golang.org/pkg/fmt/",
                "Package fmt",
                &["http://golang.org/", "http://golang.org/pkg/"],
            )
            .with_page(
                "http://golang.org/pkg/os/",
                "Package os",
                &["http://golang.org/", "http://golang.org/pkg/"],
            )
    }

    /// How many times `id` has been fetched so far.
    pub fn fetch_count(&self, id: &str) -> usize {
        self.lock_calls().get(id).copied().unwrap_or(0)
    }

    /// Total number of fetch calls across all ids.
    pub fn total_fetches(&self) -> usize {
        self.lock_calls().values().sum()
    }

    fn lock_calls(&self) -> std::sync::MutexGuard<'_, HashMap<String, usize>> {
        // A poisoned counter is still a valid counter
        self.calls.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Fetcher for CannedFetcher {
    async fn fetch(&self, id: &str) -> Result<Page, FetchError> {
        *self.lock_calls().entry(id.to_string()).or_insert(0) += 1;

        self.pages
            .get(id)
            .cloned()
            .ok_or_else(|| FetchError::NotFound { url: id.to_string() })
    }
}
