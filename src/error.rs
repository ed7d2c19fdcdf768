// src/error.rs
// =============================================================================
// Error types for the crawler.
//
// Three families, one per blast radius:
// - CrawlError: something went wrong with one job or one link. The job (or
//   just the link) is dropped and the rest of the crawl carries on.
// - ConfigError: the run cannot start. Surfaced from main, exit code 2.
// - PersistenceError: a result file could not be written. Logged, the other
//   result files are still written.
// =============================================================================

use std::path::PathBuf;
use thiserror::Error;

// Boxed source for transport failures so tests can fake them without a
// real reqwest::Error.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum CrawlError {
    /// A reference could not be turned into an absolute URL
    #[error("malformed URL '{url}': {source}")]
    MalformedUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// Connect, DNS, TLS or timeout failure while talking to the server
    #[error("could not request {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: BoxError,
    },

    /// The body could not be read or is not an HTML document
    #[error("could not parse page {url}: {reason}")]
    Parse { url: String, reason: String },

    /// The server answered 429
    #[error("rate limited while fetching {url}")]
    RateLimited { url: String },
}

impl CrawlError {
    pub fn transport(url: impl Into<String>, source: impl Into<BoxError>) -> Self {
        CrawlError::Transport {
            url: url.into(),
            source: source.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not open configuration file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not decode configuration file {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid regex '{pattern}': {source}")]
    Regex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid tag selector '{selector}': {reason}")]
    Selector { selector: String, reason: String },

    #[error("invalid header '{name}': {reason}")]
    Header { name: String, reason: String },

    #[error("target URL is invalid: {url}: {reason}")]
    Target { url: String, reason: String },

    #[error("worker count must be at least 1")]
    NoWorkers,

    #[error("could not build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("could not create output directory {dir}: {source}")]
    CreateDir {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not encode {file}: {source}")]
    Encode {
        file: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("could not write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_names_url() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = CrawlError::transport("http://example.test/", io);
        let message = err.to_string();
        assert!(message.contains("http://example.test/"));
        assert!(message.contains("refused"));
    }

    #[test]
    fn test_rate_limited_message() {
        let err = CrawlError::RateLimited {
            url: "http://example.test/a".to_string(),
        };
        assert_eq!(err.to_string(), "rate limited while fetching http://example.test/a");
    }
}
