// src/lib.rs
// =============================================================================
// second-order: a scope-limited crawler that audits a site.
//
// Modules:
// - config: the JSON configuration file
// - checker: HTML extraction, HTTP transport, non-200 link auditing
// - crawl: jobs, scope rules, the frontier/worker engine, finding sets
// - output: writing finding sets to JSON
// - logging: tracing setup
// - error: error types
//
// The binary (src/main.rs) wires these together behind a clap CLI.
// =============================================================================

pub mod checker;
pub mod config;
pub mod crawl;
pub mod error;
pub mod logging;
pub mod output;
