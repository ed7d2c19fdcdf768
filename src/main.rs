// src/main.rs
// =============================================================================
// This is the entry point of the CLI.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Load and compile the configuration (any problem here stops the run)
// 3. Crawl the target with a pool of workers
// 4. Write the finding sets to the output directory
// 5. Exit with proper code (0 = crawl completed, 2 = could not start)
//
// Failed pages and failed result writes are logged, not turned into a
// non-zero exit: a partial crawl still produces partial results.
// =============================================================================

mod cli;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use second_order::checker::HttpTransport;
use second_order::config::Configuration;
use second_order::crawl::{log_summary, scheme_allowed, AuditSpec, CrawlSettings, Crawler, Findings, Job, Scope};
use second_order::error::ConfigError;
use second_order::{logging, output};
use std::sync::Arc;
use tracing::info;
use url::Url;

#[tokio::main]
async fn main() {
    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

async fn run() -> Result<i32> {
    let cli = Cli::parse();
    logging::init_logging(cli.debug)?;

    // Everything that can be wrong with the inputs is checked before the
    // first request goes out
    let config = Configuration::load(&cli.config)?;
    let target = parse_target(&cli.target)?;
    let scope = Scope::for_target(&target)?;
    let spec = Arc::new(AuditSpec::compile(&config)?);
    if cli.threads == 0 {
        return Err(ConfigError::NoWorkers.into());
    }
    let depth = config.effective_depth(cli.depth);
    let transport = Arc::new(HttpTransport::new(cli.insecure)?);

    let settings = CrawlSettings {
        workers: cli.threads,
        log_crawled_urls: config.log_crawled_urls,
        print_visited: cli.debug,
    };

    info!(url = %target, scope = scope.domain(), depth, workers = cli.threads, "starting crawl");

    let findings = Arc::new(Findings::new());
    let crawler = Crawler::new(transport, Arc::clone(&findings), scope, settings);
    let summary = crawler.run(Job::seed(target, depth, spec)).await;

    log_summary(&summary, &findings);
    output::persist(&cli.output, &config, &findings);

    Ok(0)
}

// The target must be an absolute http(s) URL with a host
fn parse_target(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::Target {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    if !scheme_allowed(&url) {
        return Err(ConfigError::Target {
            url: raw.to_string(),
            reason: "only http and https targets can be crawled".to_string(),
        });
    }

    Ok(url)
}
