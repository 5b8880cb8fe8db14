// src/crawl/mod.rs
// =============================================================================
// This module handles the crawl itself.
//
// Features:
// - Depth-bounded, recursive crawling starting from a seed
// - One concurrent tokio task per discovered link
// - Every resource fetched at most once per crawl session
// - The crawl only returns once all of its tasks have finished
//
// Submodules:
// - visited: the shared "who has claimed what" map of a session
// - engine: the traversal itself and the CrawlReport it produces
// =============================================================================

mod engine;
mod visited;

pub use engine::{CrawlReport, Crawler};
pub use visited::{FetchOutcome, VisitedSet};
