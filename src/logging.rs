// src/logging.rs
// =============================================================================
// tracing setup. Logs go to stderr; stdout is kept for URL listings so it
// can be piped.
// =============================================================================

use anyhow::Result;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

// Used when RUST_LOG is unset or unparsable
pub fn default_directives(verbose: bool) -> &'static str {
    if verbose {
        "warn,second_order=debug"
    } else {
        "warn,second_order=info"
    }
}

// RUST_LOG wins outright when it holds a valid filter
fn build_filter(verbose: bool, rust_log: Option<&str>) -> Result<EnvFilter> {
    if let Some(filter) = rust_log.and_then(|value| EnvFilter::try_new(value).ok()) {
        return Ok(filter);
    }
    Ok(EnvFilter::try_new(default_directives(verbose))?)
}

/// Initialize the logging system
pub fn init_logging(verbose: bool) -> Result<()> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let env_filter = build_filter(verbose, rust_log.as_deref())?;

    let fmt_layer = fmt::layer().with_target(false).with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
