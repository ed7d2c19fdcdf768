// src/checker/mod.rs
// =============================================================================
// Page-level checking.
//
// Submodules:
// - html: pulls attribute values and inline scripts out of a parsed page
// - http: the HTTP transport and the non-200 link auditor
//
// Nothing in here knows about jobs, depth or scope; that's crawl/.
// =============================================================================

mod html;
mod http;

pub use html::{compile_selector, extract_anchor_hrefs, extract_attribute, extract_inline_scripts};
pub use http::{audit_link, FetchedPage, HttpTransport, Transport};

#[cfg(test)]
pub(crate) use http::stub;
