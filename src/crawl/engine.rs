// src/crawl/engine.rs
// =============================================================================
// The recursive, concurrent crawl engine.
//
// How a single visit works:
// 1. Out of depth budget? Stop.
// 2. Claim the id in the session's VisitedSet. Someone else got it? Stop.
// 3. Fetch it, record the outcome and report it.
// 4. Spawn one tokio task per outgoing link into a JoinSet, with one less
//    level of budget.
// 5. Join every child in that JoinSet before finishing.
//
// Step 5 is what makes `Crawler::crawl` return only after the entire
// reachable, depth-bounded tree has been processed: each visit finishes
// after its children, and they finish after theirs.
//
// Failures stay local. A fetch error ends that branch only, and a child
// task that panics is logged and otherwise ignored by its parent. The seed
// runs in its own task too, so a panic there is absorbed the same way.
//
// Dropping the `crawl` future (a timeout, a cancelled request) drops the
// seed's JoinSet, which aborts the seed task, which drops its own JoinSet,
// and so on down the tree. No fetch outlives the crawl that started it.
// =============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use serde::Serialize;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, debug_span, error, info, warn, Instrument};

use super::visited::{FetchOutcome, VisitedSet};
use crate::fetch::{FetchError, Fetcher};
use crate::report::{Reporter, SilentReporter};

/// Everything a crawl session learned, keyed by resource id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrawlReport {
    pub seed: String,
    pub max_depth: usize,
    pub pages: BTreeMap<String, FetchOutcome>,
}

impl CrawlReport {
    /// Number of resources that were fetched or failed.
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&FetchOutcome> {
        self.pages.get(id)
    }

    /// Successfully fetched resources as `(id, content)`.
    pub fn fetched(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pages.iter().filter_map(|(id, outcome)| match outcome {
            FetchOutcome::Fetched { content, .. } => Some((id.as_str(), content.as_str())),
            FetchOutcome::Failed { .. } => None,
        })
    }

    /// Resources that could not be fetched as `(id, error)`.
    pub fn failed(&self) -> impl Iterator<Item = (&str, &FetchError)> {
        self.pages.iter().filter_map(|(id, outcome)| match outcome {
            FetchOutcome::Failed { error } => Some((id.as_str(), error)),
            FetchOutcome::Fetched { .. } => None,
        })
    }
}

/// Drives crawls with a fetcher and a reporter.
///
/// A `Crawler` can run any number of crawls, even at the same time; each
/// call to [`Crawler::crawl`] gets its own visited set.
#[derive(Clone)]
pub struct Crawler {
    fetcher: Arc<dyn Fetcher>,
    reporter: Arc<dyn Reporter>,
}

impl std::fmt::Debug for Crawler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Crawler").finish_non_exhaustive()
    }
}

// State shared by every task of one crawl session
struct Session {
    fetcher: Arc<dyn Fetcher>,
    reporter: Arc<dyn Reporter>,
    visited: VisitedSet,
}

impl Crawler {
    pub fn new(fetcher: impl Fetcher + 'static) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            reporter: Arc::new(SilentReporter),
        }
    }

    /// Sends per-page results to `reporter` while crawling.
    pub fn with_reporter(mut self, reporter: impl Reporter + 'static) -> Self {
        self.reporter = Arc::new(reporter);
        self
    }

    /// Crawls everything reachable from `seed` within `max_depth` levels.
    ///
    /// The seed is level 1, so `max_depth == 0` fetches nothing. Returns once
    /// every spawned traversal has finished. If the returned future is
    /// dropped early, every traversal it started is aborted.
    pub async fn crawl(&self, seed: &str, max_depth: usize) -> CrawlReport {
        info!(seed = %seed, max_depth = max_depth, "starting crawl");

        // A fresh visited set per call: crawls never see each other's pages
        let session = Arc::new(Session {
            fetcher: Arc::clone(&self.fetcher),
            reporter: Arc::clone(&self.reporter),
            visited: VisitedSet::new(),
        });

        // The seed gets a task like every other node, so it is joined (and
        // aborted on drop) the same way
        let mut root = JoinSet::new();
        root.spawn(visit(Arc::clone(&session), seed.to_string(), max_depth));
        join_all(&mut root).await;

        let report = CrawlReport {
            seed: seed.to_string(),
            max_depth,
            pages: session.visited.outcomes(),
        };

        info!(
            seed = %seed,
            pages = report.len(),
            claimed = session.visited.len(),
            failed = report.failed().count(),
            "crawl finished"
        );
        report
    }
}

// Boxed because the future spawns copies of itself
fn visit(session: Arc<Session>, id: String, depth: usize) -> BoxFuture<'static, ()> {
    let span = debug_span!("visit", %id, depth);

    async move {
        // Out of budget: this node is past max_depth, don't even claim it
        if depth == 0 {
            return;
        }

        // Lost the race (or it was visited earlier): nothing to do
        if !session.visited.try_claim(&id) {
            debug!("already claimed, skipping");
            return;
        }

        // The slow part. No lock is held here, so siblings and cousins
        // fetch at the same time
        let result = session.fetcher.fetch(&id).await;

        // Report right away, and keep the links to follow (none on failure)
        let links = match &result {
            Ok(page) => {
                debug!(links = page.links.len(), "fetched");
                session.reporter.found(&id, &page.content);
                page.links.clone()
            }
            Err(error) => {
                warn!(%error, "fetch failed");
                session.reporter.failed(&id, error);
                Vec::new()
            }
        };
        session.visited.record(&id, result.into());

        // One task per link, in page order. Each child carries one less
        // level of budget and shares the same session
        let mut children = JoinSet::new();
        for link in links {
            children.spawn(visit(Arc::clone(&session), link, depth - 1));
        }

        // Don't finish until the whole subtree has
        join_all(&mut children).await;
    }
    .instrument(span)
    .boxed()
}

// Waits for every task in `set`; a failed child is logged, never propagated
async fn join_all(set: &mut JoinSet<()>) {
    while let Some(joined) = set.join_next().await {
        if let Err(err) = joined {
            log_join_error(&err);
        }
    }
}

fn log_join_error(err: &JoinError) {
    if err.is_panic() {
        error!(%err, "traversal panicked");
    } else {
        debug!(%err, "traversal cancelled");
    }
}

// -----------------------------------------------------------------------------
// NOTES:
//
// 1. Why does visit() return a BoxFuture?
//    - visit() spawns more visit() futures, so its future type would contain
//      itself and have infinite size
//    - Boxing gives it a fixed size (a pointer), which breaks the cycle
//
// 2. Why JoinSet instead of a Vec of JoinHandles?
//    - Dropping a JoinHandle detaches its task; it keeps running
//    - Dropping a JoinSet aborts every task still in it
//    - So cancelling a parent cancels its children, all the way down
//
// 3. What is a JoinError?
//    - What join_next() gives back when a task did not return normally
//    - is_panic(): the task panicked (e.g. a buggy fetcher)
//    - is_cancelled(): the task was aborted
//
// 4. Why Arc<Session>?
//    - Every spawned task needs the fetcher, reporter and visited set
//    - Tasks are 'static, so they can't borrow; Arc gives shared ownership
//    - Cloning an Arc only bumps a reference count
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{CannedFetcher, Page};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::Barrier;

    // Remembers every report it receives
    #[derive(Default)]
    struct RecordingReporter {
        found: Mutex<Vec<(String, String)>>,
        failed: Mutex<Vec<String>>,
    }

    impl Reporter for RecordingReporter {
        fn found(&self, id: &str, content: &str) {
            self.found
                .lock()
                .unwrap()
                .push((id.to_string(), content.to_string()));
        }

        fn failed(&self, id: &str, _error: &FetchError) {
            self.failed.lock().unwrap().push(id.to_string());
        }
    }

    // Sleeps before delegating, so concurrent branches really overlap
    struct SlowFetcher {
        inner: Arc<CannedFetcher>,
        delay: Duration,
    }

    #[async_trait]
    impl Fetcher for SlowFetcher {
        async fn fetch(&self, id: &str) -> Result<Page, FetchError> {
            tokio::time::sleep(self.delay).await;
            self.inner.fetch(id).await
        }
    }

    // Blocks fetches of the given ids until all of them are in flight at once
    struct BarrierFetcher {
        inner: CannedFetcher,
        gated: Vec<String>,
        barrier: Barrier,
    }

    #[async_trait]
    impl Fetcher for BarrierFetcher {
        async fn fetch(&self, id: &str) -> Result<Page, FetchError> {
            if self.gated.iter().any(|gated| gated == id) {
                self.barrier.wait().await;
            }
            self.inner.fetch(id).await
        }
    }

    // Panics on one id
    struct PanickingFetcher {
        inner: CannedFetcher,
        poison: String,
    }

    #[async_trait]
    impl Fetcher for PanickingFetcher {
        async fn fetch(&self, id: &str) -> Result<Page, FetchError> {
            if id == self.poison {
                panic!("fetcher blew up on {}", id);
            }
            self.inner.fetch(id).await
        }
    }

    #[tokio::test]
    async fn test_back_link_is_not_refetched() {
        let fetcher = Arc::new(
            CannedFetcher::new()
                .with_page("A", "page A", &["B", "C"])
                .with_page("B", "page B", &["A"])
                .with_page("C", "page C", &[]),
        );
        let crawler = Crawler::new(Arc::clone(&fetcher));

        let report = crawler.crawl("A", 2).await;

        assert_eq!(report.len(), 3);
        for id in ["A", "B", "C"] {
            assert_eq!(fetcher.fetch_count(id), 1, "{} fetched once", id);
            assert!(report.get(id).unwrap().is_fetched());
        }
        assert_eq!(fetcher.total_fetches(), 3);
    }

    #[tokio::test]
    async fn test_zero_depth_fetches_nothing() {
        let fetcher = Arc::new(CannedFetcher::new().with_page("X", "page X", &["Y"]));
        let crawler = Crawler::new(Arc::clone(&fetcher));

        let report = crawler.crawl("X", 0).await;

        assert!(report.is_empty());
        assert_eq!(fetcher.total_fetches(), 0);
    }

    #[tokio::test]
    async fn test_missing_seed_reports_one_error() {
        let fetcher = Arc::new(CannedFetcher::new().with_page("A", "page A", &[]));
        let reporter = Arc::new(RecordingReporter::default());
        let crawler = Crawler::new(Arc::clone(&fetcher)).with_reporter(Arc::clone(&reporter));

        let report = crawler.crawl("Z", 3).await;

        assert_eq!(report.len(), 1);
        assert_eq!(
            report.failed().collect::<Vec<_>>(),
            vec![("Z", &FetchError::NotFound { url: "Z".to_string() })]
        );
        assert_eq!(*reporter.failed.lock().unwrap(), vec!["Z".to_string()]);
        assert!(reporter.found.lock().unwrap().is_empty());
        assert_eq!(fetcher.total_fetches(), 1);
    }

    #[tokio::test]
    async fn test_depth_bound() {
        let fetcher = Arc::new(
            CannedFetcher::new()
                .with_page("a", "A", &["b"])
                .with_page("b", "B", &["c"])
                .with_page("c", "C", &["d"])
                .with_page("d", "D", &[]),
        );
        let crawler = Crawler::new(Arc::clone(&fetcher));

        let report = crawler.crawl("a", 2).await;

        assert_eq!(report.pages.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(fetcher.fetch_count("c"), 0);
        assert_eq!(fetcher.fetch_count("d"), 0);
    }

    #[tokio::test]
    async fn test_cycle_terminates() {
        let fetcher = Arc::new(
            CannedFetcher::new()
                .with_page("a", "A", &["b", "a"])
                .with_page("b", "B", &["c", "a"])
                .with_page("c", "C", &["a", "b", "c"]),
        );
        let crawler = Crawler::new(Arc::clone(&fetcher));

        let report = tokio::time::timeout(Duration::from_secs(5), crawler.crawl("a", 1_000))
            .await
            .expect("crawl of a cyclic graph should terminate");

        assert_eq!(report.len(), 3);
        assert_eq!(fetcher.total_fetches(), 3);
    }

    #[tokio::test]
    async fn test_error_does_not_stop_siblings() {
        let fetcher = Arc::new(
            CannedFetcher::new()
                .with_page("root", "Root", &["missing", "b"])
                .with_page("b", "B", &["c"])
                .with_page("c", "C", &[]),
        );
        let crawler = Crawler::new(Arc::clone(&fetcher));

        let report = crawler.crawl("root", 3).await;

        assert_eq!(
            report.fetched().map(|(id, _)| id).collect::<Vec<_>>(),
            vec!["b", "c", "root"]
        );
        assert_eq!(
            report.failed().map(|(id, _)| id).collect::<Vec<_>>(),
            vec!["missing"]
        );
    }

    #[tokio::test]
    async fn test_golang_fixture() {
        let fetcher = Arc::new(CannedFetcher::golang_fixture());
        let reporter = Arc::new(RecordingReporter::default());
        let crawler = Crawler::new(Arc::clone(&fetcher)).with_reporter(Arc::clone(&reporter));

        let report = crawler.crawl("http://golang.org/", 4).await;

        assert_eq!(report.len(), 5);
        assert_eq!(report.fetched().count(), 4);
        assert_eq!(
            report.failed().map(|(id, _)| id).collect::<Vec<_>>(),
            vec!["http://golang.org/cmd/"]
        );
        assert_eq!(fetcher.total_fetches(), 5);

        let mut found = reporter.found.lock().unwrap().clone();
        found.sort();
        assert_eq!(
            found,
            vec![
                ("http://golang.org/".to_string(), "The Go Programming Language".to_string()),
                ("http://golang.org/pkg/".to_string(), "Packages".to_string()),
                ("http://golang.org/pkg/fmt/".to_string(), "Package fmt".to_string()),
                ("http://golang.org/pkg/os/".to_string(), "Package os".to_string()),
            ]
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_siblings_fetch_concurrently() {
        // B and C each wait until the other is being fetched too. A serial
        // crawler would hang here.
        let fetcher = BarrierFetcher {
            inner: CannedFetcher::new()
                .with_page("A", "page A", &["B", "C"])
                .with_page("B", "page B", &[])
                .with_page("C", "page C", &[]),
            gated: vec!["B".to_string(), "C".to_string()],
            barrier: Barrier::new(2),
        };
        let crawler = Crawler::new(fetcher);

        let report = tokio::time::timeout(Duration::from_secs(5), crawler.crawl("A", 2))
            .await
            .expect("sibling fetches should overlap");

        assert_eq!(report.fetched().count(), 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_many_paths_one_fetch_each() {
        // Every hub links to every other hub and to one shared leaf, so each
        // id is reached through dozens of racing branches.
        let hubs: Vec<String> = (0..12).map(|i| format!("hub-{}", i)).collect();
        let mut hub_links: Vec<&str> = hubs.iter().map(String::as_str).collect();
        hub_links.push("leaf");

        let mut canned = CannedFetcher::new()
            .with_page("root", "Root", &hub_links)
            .with_page("leaf", "Leaf", &["root"]);
        for hub in &hubs {
            canned = canned.with_page(hub, hub, &hub_links);
        }
        let canned = Arc::new(canned);

        let crawler = Crawler::new(SlowFetcher {
            inner: Arc::clone(&canned),
            delay: Duration::from_millis(2),
        });

        let report = crawler.crawl("root", 4).await;

        assert_eq!(report.len(), hubs.len() + 2);
        assert_eq!(canned.total_fetches(), hubs.len() + 2);
        for hub in &hubs {
            assert_eq!(canned.fetch_count(hub), 1);
        }
        assert_eq!(canned.fetch_count("leaf"), 1);
        assert_eq!(canned.fetch_count("root"), 1);
    }

    #[tokio::test]
    async fn test_panicking_branch_is_isolated() {
        let fetcher = PanickingFetcher {
            inner: CannedFetcher::new()
                .with_page("A", "page A", &["boom", "B"])
                .with_page("B", "page B", &[]),
            poison: "boom".to_string(),
        };
        let crawler = Crawler::new(fetcher);

        let report = crawler.crawl("A", 3).await;

        assert_eq!(report.pages.keys().collect::<Vec<_>>(), vec!["A", "B"]);
    }

    #[tokio::test]
    async fn test_panicking_seed_is_absorbed() {
        let fetcher = PanickingFetcher {
            inner: CannedFetcher::new(),
            poison: "s".to_string(),
        };
        let crawler = Crawler::new(fetcher);

        // Returns normally; the seed was claimed but has no outcome
        let report = crawler.crawl("s", 2).await;

        assert!(report.is_empty());
    }

    #[tokio::test]
    async fn test_dropped_crawl_stops_fetching() {
        // A long chain n0 -> n1 -> ... -> n39, one slow fetch per level
        let ids: Vec<String> = (0..40).map(|i| format!("n{}", i)).collect();
        let mut canned = CannedFetcher::new();
        for (i, id) in ids.iter().enumerate() {
            let links: Vec<&str> = ids.get(i + 1).map(String::as_str).into_iter().collect();
            canned = canned.with_page(id, id, &links);
        }
        let canned = Arc::new(canned);

        let crawler = Crawler::new(SlowFetcher {
            inner: Arc::clone(&canned),
            delay: Duration::from_millis(20),
        });

        let cut_short =
            tokio::time::timeout(Duration::from_millis(50), crawler.crawl("n0", 100)).await;
        assert!(cut_short.is_err());
        let at_drop = canned.total_fetches();

        // Long enough for many more levels if anything were still running
        tokio::time::sleep(Duration::from_millis(300)).await;

        assert_eq!(canned.total_fetches(), at_drop);
        assert!(at_drop < ids.len());
    }

    #[tokio::test]
    async fn test_sessions_do_not_share_state() {
        let fetcher = Arc::new(
            CannedFetcher::new()
                .with_page("A", "page A", &["B"])
                .with_page("B", "page B", &[]),
        );
        let crawler = Crawler::new(Arc::clone(&fetcher));

        let first = crawler.crawl("A", 2).await;
        let second = crawler.crawl("A", 2).await;

        assert_eq!(first, second);
        assert_eq!(fetcher.fetch_count("A"), 2);
        assert_eq!(fetcher.fetch_count("B"), 2);
    }

    #[tokio::test]
    async fn test_report_json_shape() {
        let fetcher = CannedFetcher::new().with_page("A", "page A", &["Z"]);
        let report = Crawler::new(fetcher).crawl("A", 2).await;

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["seed"], "A");
        assert_eq!(json["max_depth"], 2);
        assert_eq!(json["pages"]["A"]["status"], "fetched");
        assert_eq!(json["pages"]["A"]["content"], "page A");
        assert_eq!(json["pages"]["Z"]["status"], "failed");
        assert_eq!(json["pages"]["Z"]["error"]["kind"], "not_found");
    }
}
