// src/checker/html.rs
// =============================================================================
// This module pulls attribute values and inline scripts out of HTML pages.
//
// We use the `scraper` crate which:
// - Parses HTML into a DOM (Document Object Model)
// - Supports CSS selectors for finding elements
// - Never fails on malformed markup (html5ever recovers like a browser does)
//
// Nothing here resolves URLs. Values come back raw, exactly as they appear
// in the attribute, and callers decide what to do with them.
// =============================================================================

use crate::error::ConfigError;
use scraper::{Html, Selector};

// Compiles a tag selector from the configuration (e.g. "img", "link",
// "script[type=module]")
//
// Returns: ConfigError::Selector if the selector is not valid CSS
pub fn compile_selector(tag: &str) -> Result<Selector, ConfigError> {
    Selector::parse(tag).map_err(|e| ConfigError::Selector {
        selector: tag.to_string(),
        reason: format!("{:?}", e),
    })
}

// Extracts every value of `attribute` on elements matching `selector`
//
// Parameters:
//   document: the parsed page
//   selector: which elements to look at
//   attribute: which attribute to read
//
// Returns: the raw values in document order, duplicates included.
// Elements without the attribute are skipped.
//
// Example:
//   <img src="/a.png"><img><img src="/b.png">, img, src
//   -> ["/a.png", "/b.png"]
pub fn extract_attribute(document: &Html, selector: &Selector, attribute: &str) -> Vec<String> {
    document
        .select(selector)
        .filter_map(|element| element.value().attr(attribute))
        .map(str::to_string)
        .collect()
}

// Extracts every <a href> value, raw, in document order
pub fn extract_anchor_hrefs(document: &Html) -> Vec<String> {
    match Selector::parse("a[href]") {
        Ok(selector) => extract_attribute(document, &selector, "href"),
        Err(_) => Vec::new(),
    }
}

// Extracts the bodies of <script> elements that have no src attribute
pub fn extract_inline_scripts(document: &Html) -> Vec<String> {
    let mut scripts = Vec::new();

    // "script" is a constant, known-valid selector
    let selector = match Selector::parse("script") {
        Ok(selector) => selector,
        Err(_) => return scripts,
    };

    for element in document.select(&selector) {
        if element.value().attr("src").is_none() {
            scripts.push(element.text().collect::<String>());
        }
    }

    scripts
}

// -----------------------------------------------------------------------------
// NOTES:
//
// 1. Why take a compiled Selector instead of a tag string?
//    - Selectors are parsed once at startup from the config file
//    - A bad selector is a startup error, not something every job rediscovers
//
// 2. scraper::Html is not Send
//    - It must never be held across an .await in the crawler
//    - crawl::queue extracts everything it needs into owned Strings first
// -----------------------------------------------------------------------------
