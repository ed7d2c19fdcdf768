// src/crawl/mod.rs
// =============================================================================
// This module handles the crawl itself.
//
// Features:
// - Depth-limited traversal from a single target URL
// - Confined to the target's registrable domain (subdomains included)
// - A fixed pool of workers sharing one frontier
// - Findings aggregated across workers, one lock per finding set
//
// Submodules:
// - job: the unit of work and its compiled audit settings
// - scope: URL resolution and the crawl/no-crawl rules
// - results: the three finding sets
// - queue: frontier, workers and the per-job state machine
// =============================================================================

mod job;
mod queue;
mod results;
mod scope;

pub use job::{AttributeQuery, AuditSpec, Job};
pub use queue::{log_summary, CrawlSettings, CrawlSummary, Crawler, Frontier, JobOutcome};
pub use results::{FindingSet, Findings};
pub use scope::{is_excluded, registrable_domain, resolve, same_origin, scheme_allowed, Scope};
