//! Logging
//!
//! Installs a `tracing` subscriber writing to stdout.

use std::sync::Once;

use tracing_subscriber::{fmt, EnvFilter};

static INIT: Once = Once::new();

/// Initialize the tracing subscriber
///
/// `level` is an [`EnvFilter`] directive such as `debug` or `dropkit=trace`. An invalid
/// directive falls back to `info`. Only the first call has an effect.
pub fn init_logging(level: &str) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));

        if let Err(err) = fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_ansi(false)
            .try_init()
        {
            eprintln!("Could not install tracing subscriber: {err}");
        }
    });
}

/// Initialize logging with the default `info` level
pub fn init_default_logging() {
    init_logging("info");
}
