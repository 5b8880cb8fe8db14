// src/fetch/mod.rs
// =============================================================================
// This module defines how the crawler retrieves a resource.
//
// The crawl engine never talks to the network directly. It asks a `Fetcher`
// for a resource and gets back either a `Page` (content + outgoing links) or
// a `FetchError`. Anything that implements the trait can drive a crawl:
//
// Submodules:
// - http: a real fetcher built on reqwest + scraper
// - canned: an in-memory fetcher backed by a fixed map (demo + tests)
// =============================================================================

mod canned;
mod http;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

pub use canned::CannedFetcher;
pub use http::HttpFetcher;

/// A successfully fetched resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    /// Short summary of the resource's content (e.g. the page title)
    pub content: String,
    /// Outgoing links, in the order they appear on the page
    pub links: Vec<String>,
}

impl Page {
    pub fn new(content: impl Into<String>, links: Vec<String>) -> Self {
        Self {
            content: content.into(),
            links,
        }
    }
}

/// Why a resource could not be fetched.
///
/// The crawl engine treats every variant the same way: the node yields no
/// content and no children. The variants only exist to give better messages.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FetchError {
    #[error("not found: {url}")]
    NotFound { url: String },

    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("request timed out: {url}")]
    Timeout { url: String },

    #[error("network error for {url}: {reason}")]
    Network { url: String, reason: String },
}

/// Resolves a resource identifier to its content and outgoing links.
///
/// Implementations must be shareable across tasks: the engine calls `fetch`
/// concurrently from many spawned traversals.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, id: &str) -> Result<Page, FetchError>;
}

#[async_trait]
impl<F: Fetcher + ?Sized> Fetcher for std::sync::Arc<F> {
    async fn fetch(&self, id: &str) -> Result<Page, FetchError> {
        (**self).fetch(id).await
    }
}
