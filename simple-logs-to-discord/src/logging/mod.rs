//! Diagnostic logging to stderr.
//!
//! Operational events (startup, matches, delivery results, shutdown) go here,
//! never to the webhook. Timestamps use the local timezone.

use chrono::Local;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::Writer, time::FormatTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Default log filter directive.
pub const DEFAULT_LOG_FILTER: &str = "simple_logs_to_discord=info,process_utils=info";

/// Filter directive applied by `--verbose`.
const VERBOSE_LOG_FILTER: &str = "simple_logs_to_discord=debug,process_utils=debug";

/// Custom timer that uses the local timezone via chrono.
#[derive(Debug, Clone, Copy)]
struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let now = Local::now();
        write!(w, "{}", now.format("%Y-%m-%dT%H:%M:%S%.3f%:z"))
    }
}

/// Pick the filter: `verbose` wins, then an explicit directive, then the default.
pub fn build_filter(directive: Option<&str>, verbose: bool) -> crate::Result<EnvFilter> {
    if verbose {
        return Ok(EnvFilter::new(VERBOSE_LOG_FILTER));
    }

    match directive.map(str::trim).filter(|d| !d.is_empty()) {
        Some(directive) => EnvFilter::try_new(directive)
            .map_err(|e| crate::Error::Other(format!("Invalid filter directive: {}", e))),
        None => Ok(EnvFilter::new(DEFAULT_LOG_FILTER)),
    }
}

/// Install the global subscriber writing to stderr.
pub fn init_logging(directive: Option<&str>, verbose: bool) -> crate::Result<()> {
    let filter = build_filter(directive, verbose)?;

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_timer(LocalTimer),
        )
        .try_init()
        .map_err(|e| {
            crate::Error::Other(format!("Failed to set global default subscriber: {}", e))
        })
}
