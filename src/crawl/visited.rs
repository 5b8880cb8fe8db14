// src/crawl/visited.rs
// =============================================================================
// The set of resources a crawl session has already claimed.
//
// Every traversal task shares one VisitedSet. Before fetching a resource a
// task must win `try_claim` for it; exactly one task ever wins for a given
// id, so each resource is fetched at most once no matter how many paths
// lead to it. After the fetch, the winner stores the outcome with `record`.
//
// The lock is only held for the map operation itself, never across a fetch,
// so claims from different tasks never wait on each other's network I/O.
// =============================================================================

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use serde::Serialize;
use tracing::warn;

use crate::fetch::{FetchError, Page};

/// What happened when a resource was fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FetchOutcome {
    Fetched { content: String, links: Vec<String> },
    Failed { error: FetchError },
}

impl FetchOutcome {
    pub fn is_fetched(&self) -> bool {
        matches!(self, FetchOutcome::Fetched { .. })
    }
}

impl From<Result<Page, FetchError>> for FetchOutcome {
    fn from(result: Result<Page, FetchError>) -> Self {
        match result {
            Ok(page) => FetchOutcome::Fetched {
                content: page.content,
                links: page.links,
            },
            Err(error) => FetchOutcome::Failed { error },
        }
    }
}

#[derive(Debug)]
enum Entry {
    // Some task won the claim and is fetching
    Claimed,
    Done(FetchOutcome),
}

/// Concurrency-safe map of resource id -> fetch state for one crawl session.
#[derive(Debug, Default)]
pub struct VisitedSet {
    entries: Mutex<HashMap<String, Entry>>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `id` for fetching.
    ///
    /// Returns `true` for exactly one caller per id; every later caller gets
    /// `false` and must neither fetch nor recurse.
    pub fn try_claim(&self, id: &str) -> bool {
        // The check and the insert happen under the same guard, so two tasks
        // can never both see "absent" for the same id
        let mut entries = self.lock();

        // Claimed or already done: somebody else owns this id
        if entries.contains_key(id) {
            return false;
        }

        // Mark it as ours. The outcome is filled in by `record` after the
        // fetch, which runs with the lock released
        entries.insert(id.to_string(), Entry::Claimed);
        true
    }

    /// Stores the outcome for a claimed id.
    ///
    /// An outcome, once recorded, is never replaced.
    pub fn record(&self, id: &str, outcome: FetchOutcome) {
        let mut entries = self.lock();
        match entries.get_mut(id) {
            // First outcome wins; a second record is a caller bug
            Some(Entry::Done(_)) => warn!(%id, "outcome already recorded, keeping the first"),
            // The normal path: Claimed -> Done
            Some(entry) => *entry = Entry::Done(outcome),
            // Recorded without claiming first. Keep the outcome anyway
            None => {
                warn!(%id, "recording an outcome for an unclaimed id");
                entries.insert(id.to_string(), Entry::Done(outcome));
            }
        }
    }

    /// Number of claimed ids, recorded or still in flight.
    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    /// Every recorded outcome, ordered by id.
    ///
    /// Ids that were claimed but never recorded (their task panicked) are
    /// left out.
    pub fn outcomes(&self) -> BTreeMap<String, FetchOutcome> {
        // Copy out under the lock; the BTreeMap gives a stable id order
        self.lock()
            .iter()
            .filter_map(|(id, entry)| match entry {
                Entry::Done(outcome) => Some((id.clone(), outcome.clone())),
                Entry::Claimed => None,
            })
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        // The map is consistent after every operation, so a poisoned lock is
        // still safe to use
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

// -----------------------------------------------------------------------------
// NOTES:
//
// 1. Why a std Mutex and not tokio::sync::Mutex?
//    - The lock is only held for one HashMap operation
//    - It is never held across an .await, so no task ever sleeps holding it
//    - A std Mutex is cheaper for short critical sections like these
//
// 2. Why claim before fetching instead of checking after?
//    - If two tasks both fetched first and checked later, both would pay for
//      the network request, and on a cyclic site both would keep recursing
//    - Claiming first means the loser stops before doing any work
//
// 3. What is unwrap_or_else(|poisoned| poisoned.into_inner())?
//    - A Mutex becomes "poisoned" if a thread panics while holding it
//    - lock() then returns Err, but the guard is still inside the error
//    - Our map is never left half-updated, so we take the guard and go on
// -----------------------------------------------------------------------------
