// src/config.rs
// =============================================================================
// Runtime configuration for a crawl.
//
// The CLI fills this in from its flags; library users build it with
// `CrawlConfig::default()` and the `with_*` setters.
// =============================================================================

use std::time::Duration;

use serde::Serialize;

pub const DEFAULT_MAX_DEPTH: usize = 4;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrawlConfig {
    /// Number of link levels to follow; the seed itself is level 1
    pub max_depth: usize,
    /// Per-request timeout for the HTTP fetcher
    pub request_timeout: Duration,
    /// User-Agent header sent by the HTTP fetcher
    pub user_agent: String,
    /// Only follow links on the seed's domain
    pub same_domain: bool,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
            same_domain: false,
        }
    }
}

impl CrawlConfig {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_same_domain(mut self, same_domain: bool) -> Self {
        self.same_domain = same_domain;
        self
    }
}
