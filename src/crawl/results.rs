// src/crawl/results.rs
// =============================================================================
// Findings shared by every worker in a run.
//
// Three independent maps, page URL -> values, each behind its own lock so a
// worker recording inline scripts never waits on one recording broken links.
// Every page produces its complete value list before a single record() call,
// so there is no read-modify-write on a key.
// =============================================================================

use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};

/// The three finding sets of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FindingSet {
    /// Values matched by LogQueries (optionally filtered by LogURLRegex)
    Queries,
    /// Links that answered with a non-200, non-excluded status
    Non200,
    /// Bodies of <script> tags without src
    InlineScripts,
}

impl FindingSet {
    pub const ALL: [FindingSet; 3] = [FindingSet::Queries, FindingSet::InlineScripts, FindingSet::Non200];

    /// Name of the JSON file this set is persisted to.
    pub fn file_name(self) -> &'static str {
        match self {
            FindingSet::Queries => "logged-queries.json",
            FindingSet::InlineScripts => "inline-scripts.json",
            FindingSet::Non200 => "logged-non-200-queries.json",
        }
    }
}

type PageMap = RwLock<HashMap<String, Vec<String>>>;

#[derive(Debug, Default)]
pub struct Findings {
    queries: PageMap,
    non_200: PageMap,
    inline_scripts: PageMap,
}

impl Findings {
    pub fn new() -> Self {
        Self::default()
    }

    fn map(&self, set: FindingSet) -> &PageMap {
        match set {
            FindingSet::Queries => &self.queries,
            FindingSet::Non200 => &self.non_200,
            FindingSet::InlineScripts => &self.inline_scripts,
        }
    }

    /// Stores `values` for `page_url`, replacing anything recorded before.
    /// An empty list is a no-op: a page never appears with no findings.
    pub fn record(&self, set: FindingSet, page_url: &str, values: Vec<String>) {
        if values.is_empty() {
            return;
        }
        self.map(set).write().insert(page_url.to_string(), values);
    }

    /// Sorted copy of one set, for persisting.
    pub fn snapshot(&self, set: FindingSet) -> BTreeMap<String, Vec<String>> {
        self.map(set)
            .read()
            .iter()
            .map(|(page, values)| (page.clone(), values.clone()))
            .collect()
    }

    pub fn get(&self, set: FindingSet, page_url: &str) -> Option<Vec<String>> {
        self.map(set).read().get(page_url).cloned()
    }

    /// Number of pages with at least one finding in `set`.
    pub fn pages(&self, set: FindingSet) -> usize {
        self.map(set).read().len()
    }
}
