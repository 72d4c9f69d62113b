//! Logging setup for tracknodes.
//!
//! Diagnostics go to stderr so the report on stdout stays clean.
//! `RUST_LOG` wins over the verbosity flag when set.

use tracing_subscriber::EnvFilter;

/// Filter used without `--verbose`
pub const DEFAULT_FILTER: &str = "warn";

/// Filter used with `--verbose`
pub const VERBOSE_FILTER: &str = "debug";

pub fn filter_directive(verbose: bool) -> &'static str {
    if verbose {
        VERBOSE_FILTER
    } else {
        DEFAULT_FILTER
    }
}

/// Install the global subscriber. Safe to call more than once.
pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(verbose)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
