// src/crawl/engine.rs
// =============================================================================
// The crawl engine: fetch a page, find its links, schedule the new ones.
//
// How it works:
// 1. The seed URL is admitted to the cache and submitted as the first task
// 2. The work queue runs each task on its own tokio task
// 3. A task fetches its URL (holding one of max_concurrent_requests permits)
//    - fetch failed       -> error entry, no children, done
//    - depth == max_depth -> entry with no children, done
//    - otherwise          -> resolve every link against the final URL,
//                            admit the new ones, give each a child slot,
//                            and submit one task per slot
// 4. When the queue reports that nothing is in flight, the tree is finished
//
// Every task writes only to the one slot it was given, so tasks never touch
// each other's entries. The only shared state is the URL cache and the queue.
//
// Rust concepts:
// - Arc<dyn Trait>: Shared, swappable implementations of Fetcher/LinkExtractor
// - Semaphore: Limits how many fetches run at the same time
// - self: Arc<Self>: A method that needs to move a shared handle into a task
// =============================================================================

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};
use url::Url;

use super::cache::UrlCache;
use super::error::CrawlError;
use super::queue::{QueueOutcome, Submitter, WorkQueue};
use super::resolve::resolve;
use super::settings::CrawlSettings;
use super::tree::{finish, CrawlEntry, PendingEntry};
use crate::fetch::{FetchedPage, Fetcher, LinkExtractor};

// One unit of crawl work: fetch `url` and put the result in `parent`'s slot
struct Task {
    depth: usize,
    url: String,
    parent: Arc<PendingEntry>,
    slot: usize,
}

/// Everything a crawl run produced.
#[derive(Debug)]
pub struct CrawlReport {
    /// The seed page's entry, or None if the run stopped before it was fetched
    pub root: Option<CrawlEntry>,
    pub outcome: QueueOutcome,
    /// How many distinct URLs were admitted (scheduled) during the run
    pub admitted: usize,
    pub elapsed: Duration,
}

impl CrawlReport {
    pub fn completed(&self) -> bool {
        self.outcome == QueueOutcome::Completed
    }
}

pub struct Crawler {
    settings: CrawlSettings,
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<dyn LinkExtractor>,
}

// Per-run state shared by every task of that run
struct Worker {
    settings: CrawlSettings,
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<dyn LinkExtractor>,
    cache: UrlCache,
    permits: Semaphore,
    submitter: Submitter,
}

impl Crawler {
    pub fn new(
        settings: CrawlSettings,
        fetcher: Arc<dyn Fetcher>,
        extractor: Arc<dyn LinkExtractor>,
    ) -> Self {
        Self {
            settings,
            fetcher,
            extractor,
        }
    }

    // Crawls from `seed` and returns when the crawl is finished
    //
    // Each call gets a fresh cache and queue, so a Crawler can be reused.
    pub async fn run(&self, seed: &str) -> CrawlReport {
        let started = Instant::now();
        let (queue, submitter) = WorkQueue::new(self.settings.max_queue_capacity());

        let worker = Arc::new(Worker {
            settings: self.settings.clone(),
            fetcher: Arc::clone(&self.fetcher),
            extractor: Arc::clone(&self.extractor),
            cache: UrlCache::new(),
            permits: Semaphore::new(self.settings.max_concurrent_requests()),
            submitter,
        });

        // Use the normalized form so links back to the seed are recognized.
        // An unparsable seed is crawled as-is and ends up as an error entry.
        let seed_url = Url::parse(seed)
            .map(|url| url.to_string())
            .unwrap_or_else(|_| seed.to_string());
        worker.cache.admit(&seed_url);

        info!(
            seed = %seed_url,
            max_depth = self.settings.max_depth(),
            max_concurrent = self.settings.max_concurrent_requests(),
            queue_capacity = self.settings.max_queue_capacity(),
            "starting crawl"
        );

        let root = PendingEntry::root();
        let seed_task = Task {
            depth: 0,
            url: seed_url.clone(),
            parent: Arc::clone(&root),
            slot: 0,
        };
        // The queue is empty and holds at least one job, so this can't block
        if let Err(err) = worker.schedule(seed_task).await {
            warn!("could not schedule seed: {}", err);
            root.fill(0, PendingEntry::failed(0, seed_url, err));
        }

        let outcome = queue.run(self.settings.deadline()).await;
        let admitted = worker.cache.len();
        drop(worker);

        let root = finish(root).children.into_iter().next().flatten();
        let elapsed = started.elapsed();

        info!(?outcome, admitted, ?elapsed, "crawl finished");

        CrawlReport {
            root,
            outcome,
            admitted,
            elapsed,
        }
    }
}

impl Worker {
    async fn schedule(self: &Arc<Self>, task: Task) -> Result<(), CrawlError> {
        let worker = Arc::clone(self);
        self.submitter.submit(worker.crawl(task)).await
    }

    // Returns a boxed future so that crawl -> schedule -> crawl has a
    // nameable type; an async fn here would be recursive and not provably Send
    fn crawl(self: Arc<Self>, task: Task) -> BoxFuture<'static, ()> {
        async move {
            let Task {
                depth,
                url,
                parent,
                slot,
            } = task;

            let page = match self.fetch(&url).await {
                Ok(page) => page,
                Err(err) => {
                    debug!(%url, depth, "fetch failed: {}", err);
                    parent.fill(slot, PendingEntry::failed(depth, url, err));
                    return;
                }
            };

            debug!(%url, depth, status = page.status, "fetched");

            if depth >= self.settings.max_depth() {
                parent.fill(slot, PendingEntry::new(depth, url, page.content_type, None, 0));
                return;
            }

            // Links are admitted before our entry is stored because the slot
            // count depends on them. The store itself can't fail: each slot
            // belongs to exactly one Task, and a Task runs once.
            let links = self.admit_links(&page);
            let entry = PendingEntry::new(depth, url, page.content_type, None, links.len());
            let Some(entry) = parent.fill(slot, entry) else {
                warn!(depth, slot, "slot already filled, dropping entry");
                return;
            };
            // We only write into our own entry from here on
            drop(parent);

            self.schedule_children(&entry, depth + 1, links).await;
        }
        .boxed()
    }

    // Submits one task per link, slot i for link i
    //
    // If the queue is already closed, the slot gets a QueueClosed error entry
    // so it is never left empty.
    async fn schedule_children(self: &Arc<Self>, entry: &Arc<PendingEntry>, depth: usize, links: Vec<String>) {
        for (index, link) in links.into_iter().enumerate() {
            let task = Task {
                depth,
                url: link.clone(),
                parent: Arc::clone(entry),
                slot: index,
            };
            if let Err(err) = self.schedule(task).await {
                warn!(url = %link, "could not schedule: {}", err);
                entry.fill(index, PendingEntry::failed(depth, link, err));
            }
        }
    }

    // Fetches while holding a concurrency permit, then pauses for wait_time
    async fn fetch(&self, url: &str) -> Result<FetchedPage, CrawlError> {
        // The semaphore is never closed, so acquire only fails after shutdown
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| CrawlError::QueueClosed)?;

        let result = self.fetcher.fetch(url).await;

        let wait = self.settings.wait_time();
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
        result
    }

    // Resolves every link on the page and keeps the ones seen for the first time
    //
    // The result is in page order. Links that don't resolve are dropped.
    fn admit_links(&self, page: &FetchedPage) -> Vec<String> {
        self.extractor
            .extract_links(&page.body)
            .into_iter()
            .filter_map(|raw| match resolve(&page.final_url, &raw) {
                Ok(url) => Some(url),
                Err(err) => {
                    debug!(base = %page.final_url, "dropping link: {}", err);
                    None
                }
            })
            .filter(|url| self.cache.admit(url))
            .collect()
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why drop(parent) in crawl()?
//    - The parent entry is only needed to store our own entry
//    - Letting go early means the tree has fewer shared references left
//      when the crawl ends, so finish() can move entries instead of copying
//
// 2. Why is the permit released before submitting children?
//    - submit() can wait when the queue is full
//    - If we held a permit while waiting, the tasks that would empty the
//      queue might be unable to fetch, and everything could get stuck
//
// 3. What is `let ... else`?
//    - Like if let, but the else branch must leave the function
//    - Keeps the happy path unindented
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawl::tree::UNKNOWN_CONTENT_TYPE;
    use crate::fetch::{HtmlLinkExtractor, HttpFetcher};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    // One link per line, nothing else
    struct LineExtractor;

    impl LinkExtractor for LineExtractor {
        fn extract_links(&self, body: &[u8]) -> Vec<String> {
            String::from_utf8_lossy(body)
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect()
        }
    }

    #[derive(Default)]
    struct FakePage {
        links: Vec<String>,
        delay: Duration,
        final_url: Option<String>,
    }

    // An in-memory website; unknown URLs fail like a dead host
    #[derive(Default)]
    struct FakeSite {
        pages: HashMap<String, FakePage>,
        calls: Mutex<Vec<String>>,
        running: AtomicUsize,
        max_running: AtomicUsize,
    }

    impl FakeSite {
        fn page(mut self, url: &str, links: &[&str]) -> Self {
            self.pages.insert(
                url.to_string(),
                FakePage {
                    links: links.iter().map(|l| l.to_string()).collect(),
                    ..FakePage::default()
                },
            );
            self
        }

        fn slow_page(mut self, url: &str, links: &[&str], delay: Duration) -> Self {
            self = self.page(url, links);
            if let Some(page) = self.pages.get_mut(url) {
                page.delay = delay;
            }
            self
        }

        fn redirect(mut self, url: &str, final_url: &str, links: &[&str]) -> Self {
            self = self.page(url, links);
            if let Some(page) = self.pages.get_mut(url) {
                page.final_url = Some(final_url.to_string());
            }
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Fetcher for FakeSite {
        async fn fetch(&self, url: &str) -> Result<FetchedPage, CrawlError> {
            self.calls.lock().unwrap().push(url.to_string());
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_running.fetch_max(now, Ordering::SeqCst);

            let result = match self.pages.get(url) {
                Some(page) => {
                    tokio::time::sleep(page.delay).await;
                    Ok(FetchedPage {
                        status: 200,
                        content_type: Some("text/html".to_string()),
                        final_url: page.final_url.clone().unwrap_or_else(|| url.to_string()),
                        body: page.links.join("\n").into_bytes(),
                    })
                }
                None => Err(CrawlError::Fetch {
                    url: url.to_string(),
                    reason: "Connection failed".to_string(),
                }),
            };

            self.running.fetch_sub(1, Ordering::SeqCst);
            result
        }
    }

    async fn crawl(site: Arc<FakeSite>, settings: CrawlSettings, seed: &str) -> CrawlReport {
        Crawler::new(settings, site, Arc::new(LineExtractor))
            .run(seed)
            .await
    }

    fn settings(max_depth: usize) -> CrawlSettings {
        CrawlSettings::new(max_depth, 0, 4, 8).unwrap()
    }

    fn child(entry: &CrawlEntry, index: usize) -> &CrawlEntry {
        entry.children[index].as_ref().unwrap()
    }

    fn child_urls(entry: &CrawlEntry) -> Vec<&str> {
        entry.children.iter().flatten().map(|c| c.url.as_str()).collect()
    }

    #[tokio::test]
    async fn test_depth_zero_is_a_single_leaf() {
        let site = Arc::new(FakeSite::default().page("https://s/", &["/a", "/b"]));

        let report = crawl(Arc::clone(&site), settings(0), "https://s/").await;

        assert!(report.completed());
        let root = report.root.unwrap();
        assert_eq!(root.url, "https://s/");
        assert_eq!(root.content_type, "text/html");
        assert!(root.children.is_empty());
        assert_eq!(site.calls(), vec!["https://s/"]);
    }

    #[tokio::test]
    async fn test_seed_failure_is_error_leaf() {
        let site = Arc::new(FakeSite::default());

        let report = crawl(site, settings(3), "https://down.example/").await;

        assert!(report.completed());
        let root = report.root.unwrap();
        assert!(matches!(root.error, Some(CrawlError::Fetch { .. })));
        assert!(root.children.is_empty());
        assert_eq!(root.content_type, UNKNOWN_CONTENT_TYPE);
    }

    #[tokio::test]
    async fn test_unparsable_seed_is_error_leaf() {
        let site = Arc::new(FakeSite::default());

        let report = crawl(site, settings(1), "not a url").await;

        let root = report.root.unwrap();
        assert_eq!(root.url, "not a url");
        assert!(root.error.is_some());
    }

    #[tokio::test]
    async fn test_duplicate_links_give_one_child() {
        let site = Arc::new(
            FakeSite::default()
                .page("https://s/dir/", &["/a", "/a", "https://s/a", "./b", "b"])
                .page("https://s/a", &[])
                .page("https://s/dir/b", &[]),
        );

        let report = crawl(site, settings(1), "https://s/dir/").await;

        let root = report.root.unwrap();
        assert_eq!(child_urls(&root), vec!["https://s/a", "https://s/dir/b"]);
        assert_eq!(report.admitted, 3);
    }

    #[tokio::test]
    async fn test_cycles_terminate_and_seed_is_not_refetched() {
        let site = Arc::new(
            FakeSite::default()
                .page("https://s/", &["/a"])
                .page("https://s/a", &["/b", "/"])
                .page("https://s/b", &["/a", "/"]),
        );

        let report = crawl(Arc::clone(&site), settings(10), "https://s/").await;

        assert!(report.completed());
        let root = report.root.unwrap();
        let a = child(&root, 0);
        assert_eq!(child_urls(a), vec!["https://s/b"]);
        assert!(child(a, 0).children.is_empty());

        let mut calls = site.calls();
        calls.sort();
        assert_eq!(calls, vec!["https://s/", "https://s/a", "https://s/b"]);
    }

    #[tokio::test]
    async fn test_max_depth_limits_fetching() {
        let site = Arc::new(
            FakeSite::default()
                .page("https://s/0", &["/1"])
                .page("https://s/1", &["/2"])
                .page("https://s/2", &["/3"])
                .page("https://s/3", &[]),
        );

        let report = crawl(Arc::clone(&site), settings(2), "https://s/0").await;

        let root = report.root.unwrap();
        let leaf = child(child(&root, 0), 0);
        assert_eq!(leaf.url, "https://s/2");
        assert_eq!(leaf.depth, 2);
        assert!(leaf.children.is_empty());
        assert!(!site.calls().contains(&"https://s/3".to_string()));
    }

    #[tokio::test]
    async fn test_child_depths_follow_parents() {
        let site = Arc::new(
            FakeSite::default()
                .page("https://s/", &["/a", "/b"])
                .page("https://s/a", &["/c", "/d"])
                .page("https://s/b", &["/e"]),
        );

        let report = crawl(site, settings(3), "https://s/").await;

        let root = report.root.unwrap();
        for entry in root.iter() {
            for c in entry.children.iter().flatten() {
                assert_eq!(c.depth, entry.depth + 1);
            }
            if entry.error.is_some() {
                assert!(entry.children.is_empty());
            }
        }
        assert_eq!(root.summary().pages, 6);
        // c, d and e don't exist
        assert_eq!(root.summary().failures, 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_child_order_matches_link_order() {
        // Earlier links answer later, so completion order is reversed
        let mut site = FakeSite::default().page("https://s/", &["/1", "/2", "/3", "/4", "/5"]);
        for i in 1..=5u64 {
            site = site.slow_page(&format!("https://s/{i}"), &[], Duration::from_millis(60 - i * 10));
        }

        let report = crawl(Arc::new(site), settings(1), "https://s/").await;

        let root = report.root.unwrap();
        assert_eq!(
            child_urls(&root),
            vec!["https://s/1", "https://s/2", "https://s/3", "https://s/4", "https://s/5"]
        );
    }

    #[tokio::test]
    async fn test_failed_child_does_not_affect_siblings() {
        let site = Arc::new(
            FakeSite::default()
                .page("https://s/", &["/ok", "/gone", "/also-ok"])
                .page("https://s/ok", &[])
                .page("https://s/also-ok", &[]),
        );

        let report = crawl(site, settings(1), "https://s/").await;

        let root = report.root.unwrap();
        assert!(child(&root, 0).is_ok());
        assert!(!child(&root, 1).is_ok());
        assert_eq!(child(&root, 1).url, "https://s/gone");
        assert!(child(&root, 2).is_ok());
    }

    #[tokio::test]
    async fn test_links_resolve_against_final_url() {
        let site = Arc::new(
            FakeSite::default()
                .redirect("https://s/old", "https://s/new/index.html", &["./x"])
                .page("https://s/new/x", &[]),
        );

        let report = crawl(site, settings(1), "https://s/old").await;

        let root = report.root.unwrap();
        assert_eq!(child_urls(&root), vec!["https://s/new/x"]);
        assert!(child(&root, 0).is_ok());
    }

    #[tokio::test]
    async fn test_unresolvable_links_are_dropped() {
        let site = Arc::new(FakeSite::default().page(
            "https://s/",
            &["mailto:me@s", "http://[::1", "javascript:void(0)", "/fine"],
        ));

        let report = crawl(site, settings(1), "https://s/").await;

        let root = report.root.unwrap();
        assert_eq!(child_urls(&root), vec!["https://s/fine"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_small_queue_applies_backpressure_and_finishes() {
        let links: Vec<String> = (0..50).map(|i| format!("/p{i}")).collect();
        let links: Vec<&str> = links.iter().map(String::as_str).collect();
        let site = Arc::new(FakeSite::default().page("https://s/", &links));

        let settings = CrawlSettings::new(1, 0, 1, 1).unwrap();
        let report = crawl(site, settings, "https://s/").await;

        assert!(report.completed());
        assert_eq!(report.root.unwrap().children.len(), 50);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_fetches_are_capped() {
        let links: Vec<String> = (0..12).map(|i| format!("/p{i}")).collect();
        let link_refs: Vec<&str> = links.iter().map(String::as_str).collect();
        let mut site = FakeSite::default().page("https://s/", &link_refs);
        for link in &links {
            site = site.slow_page(&format!("https://s{link}"), &[], Duration::from_millis(20));
        }
        let site = Arc::new(site);

        let settings = CrawlSettings::new(1, 0, 2, 16).unwrap();
        let report = crawl(Arc::clone(&site), settings, "https://s/").await;

        assert!(report.completed());
        assert!(site.max_running.load(Ordering::SeqCst) <= 2);
        assert_eq!(site.calls().len(), 13);
    }

    #[tokio::test]
    async fn test_wait_time_is_applied_per_fetch() {
        let site = Arc::new(
            FakeSite::default()
                .page("https://s/", &["/a", "/b"])
                .page("https://s/a", &[])
                .page("https://s/b", &[]),
        );

        let settings = CrawlSettings::new(1, 30, 1, 4).unwrap();
        let report = crawl(site, settings, "https://s/").await;

        assert!(report.elapsed >= Duration::from_millis(90));
    }

    #[tokio::test]
    async fn test_deadline_returns_partial_tree() {
        let site = Arc::new(
            FakeSite::default()
                .page("https://s/", &["/fast", "/stuck"])
                .page("https://s/fast", &[])
                .slow_page("https://s/stuck", &[], Duration::from_secs(3600)),
        );

        let settings = CrawlSettings::new(1, 0, 4, 4)
            .unwrap()
            .with_deadline(Duration::from_millis(200));
        let report = crawl(site, settings, "https://s/").await;

        assert_eq!(report.outcome, QueueOutcome::DeadlineReached);
        let root = report.root.unwrap();
        assert!(root.children[0].is_some());
        assert!(root.children[1].is_none());
        assert_eq!(root.summary().missing, 1);
    }

    #[tokio::test]
    async fn test_closed_queue_fills_child_slots_with_errors() {
        let (queue, submitter) = WorkQueue::new(4);
        // The queue never runs, so every submit is rejected
        drop(queue);

        let worker = Arc::new(Worker {
            settings: settings(3),
            fetcher: Arc::new(FakeSite::default()),
            extractor: Arc::new(LineExtractor),
            cache: UrlCache::new(),
            permits: Semaphore::new(1),
            submitter,
        });
        let entry = Arc::new(PendingEntry::new(1, "https://s/a".to_string(), None, None, 2));
        let links = vec!["https://s/b".to_string(), "https://s/c".to_string()];

        worker.schedule_children(&entry, 2, links).await;
        drop(worker);

        let entry = finish(entry);
        assert_eq!(entry.children.len(), 2);
        for (slot, url) in entry.children.iter().zip(["https://s/b", "https://s/c"]) {
            let slot = slot.as_ref().unwrap();
            assert_eq!(slot.url, url);
            assert_eq!(slot.depth, 2);
            assert_eq!(slot.error, Some(CrawlError::QueueClosed));
            assert!(slot.children.is_empty());
        }
        assert_eq!(entry.summary().missing, 0);
    }

    #[tokio::test]
    async fn test_crawl_over_http() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/")
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body(r#"<a href="/a">A</a> <a href="/b">B</a> <a href="/a">A again</a>"#)
            .create_async()
            .await;
        server
            .mock("GET", "/a")
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body(r#"<a href="/">Home</a> <a href="b">B</a>"#)
            .create_async()
            .await;
        server
            .mock("GET", "/b")
            .with_status(200)
            .with_header("content-type", "text/plain")
            .with_body("no links")
            .create_async()
            .await;

        let fetcher = HttpFetcher::new(Duration::from_secs(5), "crawl-tree-test").unwrap();
        let crawler = Crawler::new(settings(2), Arc::new(fetcher), Arc::new(HtmlLinkExtractor::new()));
        let seed = format!("{}/", server.url());
        let report = crawler.run(&seed).await;

        assert!(report.completed());
        let root = report.root.unwrap();
        assert_eq!(root.url, seed);
        assert_eq!(
            child_urls(&root),
            vec![format!("{}/a", server.url()), format!("{}/b", server.url())]
        );
        assert!(child(&root, 0).children.is_empty());
        assert_eq!(child(&root, 1).content_type, "text/plain");
        assert_eq!(root.summary().pages, 3);
    }
}
