// src/crawl/scope.rs
// =============================================================================
// URL resolution and the rules that decide whether a URL may be crawled.
//
// Scope is "same registrable domain", approximated as the last two
// dot-separated labels of the hostname:
//
//   docs.example.com  -> example.com
//   mail.example.com  -> example.com   (same scope)
//   example.org       -> example.org   (different scope)
//
// This is coarse on purpose. There is no public suffix list, so
// a.co.uk and b.co.uk land in the same scope ("co.uk").
// =============================================================================

use crate::error::{ConfigError, CrawlError};
use regex::RegexSet;
use url::Url;

// Resolves a possibly-relative reference against the page it was found on
//
// Examples:
//   base = "https://example.com/a/page"
//   "/docs"              -> "https://example.com/docs"
//   "../other"           -> "https://example.com/other"
//   "?q=1"               -> "https://example.com/a/page?q=1"
//   "https://other.com"  -> "https://other.com/"
pub fn resolve(reference: &str, base: &Url) -> Result<Url, CrawlError> {
    base.join(reference).map_err(|source| CrawlError::MalformedUrl {
        url: reference.to_string(),
        source,
    })
}

// Last two labels of a hostname ("a.b.example.com" -> "example.com").
// A single-label host ("localhost") is its own registrable domain.
pub fn registrable_domain(host: &str) -> &str {
    let host = host.trim_end_matches('.');
    match host.rmatch_indices('.').nth(1) {
        Some((index, _)) => &host[index + 1..],
        None => host,
    }
}

/// True when both URLs parse, both have a host, and the hosts share a
/// registrable domain. Any parse failure is "not the same origin".
pub fn same_origin(a: &str, b: &str) -> bool {
    let (Ok(a), Ok(b)) = (Url::parse(a), Url::parse(b)) else {
        return false;
    };

    match (a.host_str(), b.host_str()) {
        (Some(a), Some(b)) => registrable_domain(a) == registrable_domain(b),
        _ => false,
    }
}

// Substring semantics: a pattern matching anywhere in the URL excludes it
pub fn is_excluded(url: &str, excluded: &RegexSet) -> bool {
    excluded.is_match(url)
}

// Only plain web links are crawled (no mailto:, javascript:, data:, ftp:...)
pub fn scheme_allowed(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}

// "#section" points back at the page we're already on
pub fn is_fragment_only(reference: &str) -> bool {
    reference.trim_start().starts_with('#')
}

/// The registrable domain of the crawl target. Built once per run and
/// shared by every job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    domain: String,
}

impl Scope {
    pub fn for_target(target: &Url) -> Result<Self, ConfigError> {
        let host = target.host_str().ok_or_else(|| ConfigError::Target {
            url: target.to_string(),
            reason: "URL has no host".to_string(),
        })?;

        Ok(Self {
            domain: registrable_domain(host).to_string(),
        })
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn contains(&self, url: &Url) -> bool {
        url.host_str()
            .map(|host| registrable_domain(host) == self.domain)
            .unwrap_or(false)
    }
}
