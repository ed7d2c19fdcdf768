// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// The target is a flag rather than a config key so one config file can be
// reused against many targets. What to audit lives in the config file.
// =============================================================================

use clap::Parser;
use std::path::PathBuf;

// #[derive(Parser)] tells clap to generate the parsing code
// The #[command(...)] attributes configure how the CLI behaves
#[derive(Parser, Debug)]
#[command(
    name = "second-order",
    version,
    about = "Crawl a site and audit it for resources, non-200 links and inline scripts",
    long_about = "second-order crawls a target up to a fixed depth, staying on the target's domain \
                  and its subdomains. Along the way it logs attribute values matching the configured \
                  tag/attribute queries, probes configured links for non-200 responses and collects \
                  inline <script> bodies. Results are written as JSON to the output directory."
)]
pub struct Cli {
    /// Target URL to start crawling from
    #[arg(long, default_value = "http://127.0.0.1")]
    pub target: String,

    /// Configuration file (JSON)
    #[arg(long, default_value = "config.json")]
    pub config: PathBuf,

    /// Directory to save results in
    #[arg(long, default_value = "output")]
    pub output: PathBuf,

    /// Verbose logging, and print visited pages to stdout as they are crawled
    #[arg(long)]
    pub debug: bool,

    /// Accept untrusted TLS certificates
    #[arg(long)]
    pub insecure: bool,

    /// Depth to crawl (overrides "Depth" in the config file)
    ///
    /// Depth 1 = just the target page
    /// Depth 2 = the target page + the in-scope pages it links to
    #[arg(long)]
    pub depth: Option<usize>,

    /// Number of concurrent workers
    #[arg(long, default_value_t = 10)]
    pub threads: usize,
}
