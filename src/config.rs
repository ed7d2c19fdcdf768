// src/config.rs
// =============================================================================
// The JSON configuration file.
//
// The target URL is a CLI flag so the same config can be reused across
// targets. Everything else about what to audit lives here:
//
//   {
//     "Headers": {"User-Agent": "..."},
//     "Depth": 2,
//     "LogCrawledURLs": true,
//     "LogQueries": {"script": "src"},
//     "LogURLRegex": ["\\.js$"],
//     "LogNon200Queries": {"a": "href"},
//     "ExcludedURLRegex": ["logout"],
//     "ExcludedStatusCodes": [403],
//     "LogInlineJS": true
//   }
//
// Every key is optional. This module only decodes; turning the record into
// compiled selectors and regexes happens in crawl::job.
// =============================================================================

use crate::error::ConfigError;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

// Depth used when neither --depth nor "Depth" is given
pub const DEFAULT_DEPTH: usize = 2;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Configuration {
    #[serde(rename = "Headers")]
    pub headers: BTreeMap<String, String>,

    #[serde(rename = "Depth")]
    pub depth: Option<usize>,

    #[serde(rename = "LogCrawledURLs")]
    pub log_crawled_urls: bool,

    // tag -> attribute. BTreeMap keeps the concatenation order stable.
    #[serde(rename = "LogQueries")]
    pub log_queries: Option<BTreeMap<String, String>>,

    #[serde(rename = "LogURLRegex")]
    pub log_url_regex: Vec<String>,

    #[serde(rename = "LogNon200Queries")]
    pub log_non_200_queries: Option<BTreeMap<String, String>>,

    #[serde(rename = "ExcludedURLRegex")]
    pub excluded_url_regex: Vec<String>,

    #[serde(rename = "ExcludedStatusCodes")]
    pub excluded_status_codes: Vec<u16>,

    #[serde(rename = "LogInlineJS")]
    pub log_inline_js: bool,
}

impl Configuration {
    /// Reads and decodes the configuration file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let file = File::open(path).map_err(|source| ConfigError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_reader(BufReader::new(file)).map_err(|source| ConfigError::Decode {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Depth for the seed job: the CLI override wins, then the file, then
    /// DEFAULT_DEPTH.
    pub fn effective_depth(&self, cli_depth: Option<usize>) -> usize {
        cli_depth.or(self.depth).unwrap_or(DEFAULT_DEPTH)
    }
}
