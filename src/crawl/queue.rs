// src/crawl/queue.rs
// =============================================================================
// This module drives the crawl: a shared frontier of jobs and a fixed pool of
// workers pulling from it.
//
// How a job moves:
// 1. Fetch the page (429 or a transport error ends the job here)
// 2. Parse it and pull out everything the audits need, then drop the DOM
// 3. Record query matches and inline scripts
// 4. Probe the configured links and record the non-200 ones
// 5. Resolve and filter <a href> links, enqueue one child job per survivor
//    (unless this job was the last hop)
//
// There is no visited set. A page reachable along two paths inside the depth
// budget is fetched twice, and its findings are simply recorded twice.
//
// The run ends when the frontier is empty and no job is in flight. An
// outstanding-work counter goes up on every push and down when a job is
// finished (children already pushed), so it can only reach zero at the end.
// =============================================================================

use crate::checker::{
    audit_link, extract_anchor_hrefs, extract_attribute, extract_inline_scripts, FetchedPage, Transport,
};
use crate::crawl::job::Job;
use crate::crawl::results::{FindingSet, Findings};
use crate::crawl::scope::{self, Scope};
use crate::error::CrawlError;
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use reqwest::StatusCode;
use scraper::Html;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::task::JoinSet;
use tracing::{debug, info, info_span, warn, Instrument};
use url::Url;

// Link probes in flight at once for a single page
const PROBE_FANOUT: usize = 8;

/// Jobs waiting to be processed, plus a count of work not yet finished.
#[derive(Debug, Default)]
pub struct Frontier {
    queue: Mutex<VecDeque<Job>>,
    outstanding: AtomicUsize,
    notify: Notify,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, job: Job) {
        // Count first so a concurrent next() can't see "empty and idle"
        self.outstanding.fetch_add(1, Ordering::SeqCst);
        self.queue.lock().push_back(job);
        self.notify.notify_waiters();
    }

    /// Waits for the next job. Returns None once the queue is empty and
    /// every job handed out has been finished.
    pub async fn next(&self) -> Option<Job> {
        loop {
            // Registered before checking, so a push or finish in between
            // still wakes us
            let notified = self.notify.notified();

            let job = self.queue.lock().pop_front();
            if job.is_some() {
                return job;
            }
            if self.outstanding.load(Ordering::SeqCst) == 0 {
                return None;
            }

            notified.await;
        }
    }

    fn finish(&self) {
        if self.outstanding.fetch_sub(1, Ordering::SeqCst) == 1 {
            // That was the last one: release every idle worker
            self.notify.notify_waiters();
        }
    }

    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::SeqCst)
    }
}

// Finishes a dequeued job when dropped, even if processing panicked
struct Finished<'a>(&'a Frontier);

impl Drop for Finished<'_> {
    fn drop(&mut self) {
        self.0.finish();
    }
}

/// Run-wide settings for the orchestrator.
#[derive(Debug, Clone, Copy)]
pub struct CrawlSettings {
    /// Number of workers pulling from the frontier
    pub workers: usize,
    /// Print every in-scope link found (LogCrawledURLs)
    pub log_crawled_urls: bool,
    /// Print every page URL as it is processed (--debug)
    pub print_visited: bool,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            workers: 10,
            log_crawled_urls: false,
            print_visited: false,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CrawlSummary {
    pub pages_crawled: usize,
    pub pages_failed: usize,
    pub jobs_dispatched: usize,
}

impl CrawlSummary {
    fn absorb(&mut self, other: CrawlSummary) {
        self.pages_crawled += other.pages_crawled;
        self.pages_failed += other.pages_failed;
        self.jobs_dispatched += other.jobs_dispatched;
    }
}

#[derive(Debug)]
pub enum JobOutcome {
    Done { children: Vec<Job> },
    Failed(CrawlError),
}

// Everything a page's audits need, as owned data. The DOM itself is not
// Send and must be gone before the first await after parsing.
#[derive(Debug, Default)]
struct PageExtract {
    queried: Vec<String>,
    inline_scripts: Vec<String>,
    probe_targets: Vec<String>,
    hrefs: Vec<String>,
}

impl PageExtract {
    // Takes the page by value: the body is released when this returns,
    // whatever the outcome
    fn from_page(job: &Job, page: FetchedPage) -> Result<Self, CrawlError> {
        if !page.is_html() {
            return Err(CrawlError::Parse {
                url: job.url.to_string(),
                reason: format!(
                    "not an HTML document ({})",
                    page.content_type.as_deref().unwrap_or("unknown type")
                ),
            });
        }

        let document = Html::parse_document(&page.body);
        let spec = &job.spec;

        let mut queried = Vec::new();
        for query in &spec.log_queries {
            let values = extract_attribute(&document, &query.selector, &query.attribute);
            queried.extend(spec.filter_logged(values));
        }

        let inline_scripts = if spec.log_inline_js {
            extract_inline_scripts(&document)
        } else {
            Vec::new()
        };

        let probe_targets = spec
            .non_200_queries
            .iter()
            .flat_map(|query| extract_attribute(&document, &query.selector, &query.attribute))
            .collect();

        Ok(Self {
            queried,
            inline_scripts,
            probe_targets,
            hrefs: extract_anchor_hrefs(&document),
        })
    }
}

/// The crawl engine. Cheap to clone: every worker gets its own handle.
#[derive(Clone)]
pub struct Crawler {
    transport: Arc<dyn Transport>,
    findings: Arc<Findings>,
    scope: Arc<Scope>,
    settings: CrawlSettings,
}

impl Crawler {
    pub fn new(
        transport: Arc<dyn Transport>,
        findings: Arc<Findings>,
        scope: Scope,
        settings: CrawlSettings,
    ) -> Self {
        Self {
            transport,
            findings,
            scope: Arc::new(scope),
            settings,
        }
    }

    /// Crawls from `seed` until nothing is left, then returns the totals.
    /// Every finding has been recorded by the time this returns.
    pub async fn run(&self, seed: Job) -> CrawlSummary {
        let frontier = Arc::new(Frontier::new());
        frontier.push(seed);

        let mut workers = JoinSet::new();
        for id in 0..self.settings.workers.max(1) {
            let crawler = self.clone();
            let frontier = Arc::clone(&frontier);
            workers.spawn(crawler.work(frontier).instrument(info_span!("worker", id)));
        }

        let mut summary = CrawlSummary::default();
        while let Some(result) = workers.join_next().await {
            match result {
                Ok(part) => summary.absorb(part),
                Err(e) => warn!(error = %e, "worker stopped abnormally"),
            }
        }

        summary
    }

    async fn work(self, frontier: Arc<Frontier>) -> CrawlSummary {
        let mut summary = CrawlSummary::default();

        while let Some(job) = frontier.next().await {
            let _finished = Finished(&frontier);
            let url = job.url.clone();

            match self.process(job).await {
                JobOutcome::Done { children } => {
                    summary.pages_crawled += 1;
                    summary.jobs_dispatched += children.len();
                    for child in children {
                        frontier.push(child);
                    }
                }
                JobOutcome::Failed(e) => {
                    summary.pages_failed += 1;
                    warn!(%url, error = %e, "job failed");
                }
            }
        }

        summary
    }

    /// Runs one job through fetch, parse, audit and dispatch. Findings are
    /// recorded before this returns; the children are handed back for the
    /// caller to enqueue.
    pub async fn process(&self, job: Job) -> JobOutcome {
        debug!(url = %job.url, remaining_depth = job.remaining_depth, "fetching");

        let page = match self.transport.fetch(&job.url, &job.spec.headers).await {
            Ok(page) => page,
            Err(e) => return JobOutcome::Failed(e),
        };

        if page.status == StatusCode::TOO_MANY_REQUESTS.as_u16() {
            return JobOutcome::Failed(CrawlError::RateLimited {
                url: job.url.to_string(),
            });
        }

        let extract = match PageExtract::from_page(&job, page) {
            Ok(extract) => extract,
            Err(e) => return JobOutcome::Failed(e),
        };

        if self.settings.print_visited {
            println!("{}", job.url);
        }

        let page_url = job.url.as_str();
        self.findings.record(FindingSet::Queries, page_url, extract.queried);
        self.findings
            .record(FindingSet::InlineScripts, page_url, extract.inline_scripts);

        let broken = self.audit_links(&job, extract.probe_targets).await;
        self.findings.record(FindingSet::Non200, page_url, broken);

        let children = self.dispatch(&job, extract.hrefs);
        JobOutcome::Done { children }
    }

    // Resolves the probe targets against the page and keeps the anomalous
    // ones, in document order
    async fn audit_links(&self, job: &Job, targets: Vec<String>) -> Vec<String> {
        if targets.is_empty() {
            return Vec::new();
        }

        let links: Vec<Url> = targets
            .iter()
            .filter_map(|raw| match scope::resolve(raw, &job.url) {
                Ok(url) if scope::scheme_allowed(&url) => Some(url),
                Ok(_) => None,
                Err(e) => {
                    debug!(page = %job.url, error = %e, "skipping probe");
                    None
                }
            })
            .collect();

        let transport = self.transport.as_ref();
        let spec = &job.spec;

        stream::iter(links)
            .map(move |link| async move {
                let anomalous = audit_link(
                    transport,
                    &link,
                    &spec.headers,
                    &spec.excluded_status_codes,
                    &spec.excluded_urls,
                )
                .await;
                anomalous.then(|| link.to_string())
            })
            .buffered(PROBE_FANOUT)
            .filter_map(|found| async move { found })
            .collect()
            .await
    }

    /// Resolves raw hrefs and keeps the ones that may be crawled: http(s),
    /// not excluded, inside the target's scope.
    pub fn in_scope_links(&self, job: &Job, hrefs: Vec<String>) -> Vec<Url> {
        let mut links = Vec::new();

        for href in hrefs {
            if scope::is_fragment_only(&href) {
                continue;
            }

            let url = match scope::resolve(&href, &job.url) {
                Ok(url) => url,
                Err(e) => {
                    debug!(page = %job.url, error = %e, "dropping link");
                    continue;
                }
            };

            if !scope::scheme_allowed(&url) {
                continue;
            }
            if scope::is_excluded(url.as_str(), &job.spec.excluded_urls) {
                debug!(%url, "excluded");
                continue;
            }
            if !self.scope.contains(&url) {
                debug!(%url, scope = self.scope.domain(), "out of scope");
                continue;
            }

            if self.settings.log_crawled_urls {
                println!("{}", url);
            }
            links.push(url);
        }

        links
    }

    fn dispatch(&self, job: &Job, hrefs: Vec<String>) -> Vec<Job> {
        let links = self.in_scope_links(job, hrefs);

        if !job.can_spawn() {
            return Vec::new();
        }

        links.into_iter().map(|url| job.child(url)).collect()
    }
}

/// Logs the end-of-run totals.
pub fn log_summary(summary: &CrawlSummary, findings: &Findings) {
    info!(
        crawled = summary.pages_crawled,
        failed = summary.pages_failed,
        dispatched = summary.jobs_dispatched,
        query_pages = findings.pages(FindingSet::Queries),
        non_200_pages = findings.pages(FindingSet::Non200),
        inline_script_pages = findings.pages(FindingSet::InlineScripts),
        "crawl finished"
    );
}
