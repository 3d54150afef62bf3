//! stderr logging for command line tools
//!
//! stdout carries labels and feature dumps, so every log line goes to
//! stderr. `RUST_LOG` directives take precedence over the verbosity flag.

use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

/// Default level for the number of `-v` flags given.
pub fn default_level(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

fn env_filter(verbosity: u8, directives: &str) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(default_level(verbosity).into())
        .parse_lossy(directives)
}

/// Install the global subscriber. Calling it twice is a no-op.
pub fn init(verbosity: u8) {
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_default();
    let filter = env_filter(verbosity, &directives);

    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(verbosity > 0)
        .with_filter(filter);

    if tracing_subscriber::registry().with(layer).try_init().is_err() {
        tracing::debug!("global subscriber already installed");
    }
}
