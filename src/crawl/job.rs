// src/crawl/job.rs
// =============================================================================
// A Job is one unit of crawl work: a URL, how many more hops are allowed,
// and everything needed to audit the page.
//
// The audit settings are identical for every job in a run, so they live in
// one AuditSpec behind an Arc. A child job carries the same Arc forward and
// only its URL and remaining depth differ from its parent.
// =============================================================================

use crate::checker::compile_selector;
use crate::config::Configuration;
use crate::error::ConfigError;
use regex::{Regex, RegexSet};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use scraper::Selector;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;
use url::Url;

/// A tag selector and the attribute to read from matching elements.
#[derive(Clone)]
pub struct AttributeQuery {
    pub tag: String,
    pub attribute: String,
    pub selector: Selector,
}

impl AttributeQuery {
    pub fn new(tag: &str, attribute: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            tag: tag.to_string(),
            attribute: attribute.to_string(),
            selector: compile_selector(tag)?,
        })
    }
}

impl fmt::Debug for AttributeQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.tag, self.attribute)
    }
}

/// Everything a job needs besides its URL and depth. Immutable once built.
#[derive(Debug, Clone)]
pub struct AuditSpec {
    pub headers: HeaderMap,
    pub log_queries: Vec<AttributeQuery>,
    pub log_url_filters: RegexSet,
    pub non_200_queries: Vec<AttributeQuery>,
    pub excluded_urls: RegexSet,
    pub excluded_status_codes: HashSet<u16>,
    pub log_inline_js: bool,
}

impl Default for AuditSpec {
    fn default() -> Self {
        Self {
            headers: HeaderMap::new(),
            log_queries: Vec::new(),
            log_url_filters: RegexSet::empty(),
            non_200_queries: Vec::new(),
            excluded_urls: RegexSet::empty(),
            excluded_status_codes: HashSet::new(),
            log_inline_js: false,
        }
    }
}

impl AuditSpec {
    /// Compiles headers, selectors and regexes from the raw configuration.
    /// Anything invalid is reported now, before the first request.
    pub fn compile(config: &Configuration) -> Result<Self, ConfigError> {
        Ok(Self {
            headers: compile_headers(&config.headers)?,
            log_queries: compile_queries(config.log_queries.as_ref())?,
            log_url_filters: compile_patterns(&config.log_url_regex)?,
            non_200_queries: compile_queries(config.log_non_200_queries.as_ref())?,
            excluded_urls: compile_patterns(&config.excluded_url_regex)?,
            excluded_status_codes: config.excluded_status_codes.iter().copied().collect(),
            log_inline_js: config.log_inline_js,
        })
    }

    /// Keeps the values matching at least one LogURLRegex pattern.
    /// With no patterns configured everything is kept.
    pub fn filter_logged(&self, values: Vec<String>) -> Vec<String> {
        if self.log_url_filters.is_empty() {
            return values;
        }
        values
            .into_iter()
            .filter(|value| self.log_url_filters.is_match(value))
            .collect()
    }
}

fn compile_headers(headers: &BTreeMap<String, String>) -> Result<HeaderMap, ConfigError> {
    let mut map = HeaderMap::with_capacity(headers.len());

    for (name, value) in headers {
        let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| ConfigError::Header {
            name: name.clone(),
            reason: e.to_string(),
        })?;
        let header_value = HeaderValue::from_str(value).map_err(|e| ConfigError::Header {
            name: name.clone(),
            reason: e.to_string(),
        })?;
        map.append(header_name, header_value);
    }

    Ok(map)
}

fn compile_queries(queries: Option<&BTreeMap<String, String>>) -> Result<Vec<AttributeQuery>, ConfigError> {
    queries
        .into_iter()
        .flatten()
        .map(|(tag, attribute)| AttributeQuery::new(tag, attribute))
        .collect()
}

// Each pattern is compiled on its own first so the error names the culprit
fn compile_patterns(patterns: &[String]) -> Result<RegexSet, ConfigError> {
    for pattern in patterns {
        Regex::new(pattern).map_err(|source| ConfigError::Regex {
            pattern: pattern.clone(),
            source,
        })?;
    }

    RegexSet::new(patterns).map_err(|source| ConfigError::Regex {
        pattern: patterns.join(" | "),
        source,
    })
}

#[derive(Debug, Clone)]
pub struct Job {
    pub url: Url,
    pub remaining_depth: usize,
    pub spec: Arc<AuditSpec>,
}

impl Job {
    pub fn seed(url: Url, depth: usize, spec: Arc<AuditSpec>) -> Self {
        Self {
            url,
            remaining_depth: depth,
            spec,
        }
    }

    /// True if this job's page may spawn children (one more hop allowed).
    pub fn can_spawn(&self) -> bool {
        self.remaining_depth > 1
    }

    /// A job for `url` one hop further, same audit settings.
    pub fn child(&self, url: Url) -> Self {
        Self {
            url,
            remaining_depth: self.remaining_depth.saturating_sub(1),
            spec: Arc::clone(&self.spec),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Configuration {
        serde_json::from_str(
            r#"{
                "Headers": {"User-Agent": "auditor/1.0", "Cookie": "session=abc"},
                "LogQueries": {"script": "src", "img": "src"},
                "LogURLRegex": ["\\.js$"],
                "LogNon200Queries": {"a": "href"},
                "ExcludedURLRegex": ["logout"],
                "ExcludedStatusCodes": [403],
                "LogInlineJS": true
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_compile_full_spec() {
        let spec = AuditSpec::compile(&config()).unwrap();

        assert_eq!(spec.headers.get("user-agent").unwrap(), "auditor/1.0");
        assert_eq!(spec.headers.get("cookie").unwrap(), "session=abc");
        // BTreeMap order: img before script
        let tags: Vec<_> = spec.log_queries.iter().map(|q| q.tag.as_str()).collect();
        assert_eq!(tags, vec!["img", "script"]);
        assert_eq!(spec.non_200_queries.len(), 1);
        assert!(spec.excluded_urls.is_match("https://example.com/logout"));
        assert!(spec.excluded_status_codes.contains(&403));
        assert!(spec.log_inline_js);
    }

    #[test]
    fn test_filter_logged() {
        let spec = AuditSpec::compile(&config()).unwrap();
        let kept = spec.filter_logged(vec![
            "/app.js".to_string(),
            "/logo.png".to_string(),
            "/vendor.js".to_string(),
        ]);
        assert_eq!(kept, vec!["/app.js", "/vendor.js"]);

        let unfiltered = AuditSpec::default();
        assert_eq!(unfiltered.filter_logged(vec!["/logo.png".to_string()]), vec!["/logo.png"]);
    }

    #[test]
    fn test_bad_regex_is_config_error() {
        let config = Configuration {
            excluded_url_regex: vec!["(unclosed".to_string()],
            ..Default::default()
        };
        match AuditSpec::compile(&config) {
            Err(ConfigError::Regex { pattern, .. }) => assert_eq!(pattern, "(unclosed"),
            other => panic!("expected regex error, got {:?}", other),
        }
    }

    #[test]
    fn test_bad_header_is_config_error() {
        let mut config = Configuration::default();
        config.headers.insert("Bad Header".to_string(), "x".to_string());
        assert!(matches!(AuditSpec::compile(&config), Err(ConfigError::Header { .. })));
    }

    #[test]
    fn test_child_decrements_depth_and_shares_spec() {
        let spec = Arc::new(AuditSpec::default());
        let seed = Job::seed(Url::parse("http://example.test/").unwrap(), 3, Arc::clone(&spec));
        assert!(seed.can_spawn());

        let child = seed.child(Url::parse("http://example.test/about").unwrap());
        assert_eq!(child.remaining_depth, 2);
        assert!(Arc::ptr_eq(&child.spec, &seed.spec));

        let grandchild = child.child(Url::parse("http://example.test/team").unwrap());
        assert_eq!(grandchild.remaining_depth, 1);
        assert!(!grandchild.can_spawn());
    }
}
