//! The ingest, match and notify loop.
//!
//! Lines are handled strictly one at a time: a line is matched, expanded and
//! delivered before the next one is read. A slow webhook therefore stalls
//! reading, which in turn stalls the child process once its pipe fills.

use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::matcher::{Pattern, expand_template, match_line};
use crate::notification::{DeliveryOutcome, Notifier};
use crate::source::LineSource;
use crate::utils::text;

/// Characters of the expanded message shown in the log.
const PREVIEW_CHARS: usize = 50;

/// Immutable settings the pipeline runs with.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Patterns in priority order.
    pub patterns: Arc<[Pattern]>,
    pub message_template: String,
    /// Configured source string, substituted for `{source}`.
    pub source_label: String,
}

/// Why [`Pipeline::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Shutdown was requested.
    Interrupted,
    /// The source process stopped producing output.
    StreamEnded,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interrupted => f.write_str("interrupted"),
            Self::StreamEnded => f.write_str("stream ended"),
        }
    }
}

/// Counters for one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub lines_read: u64,
    pub matched: u64,
    pub delivered: u64,
    pub rate_limited: u64,
    pub failed: u64,
    pub stop_reason: StopReason,
}

impl RunSummary {
    fn new() -> Self {
        Self {
            lines_read: 0,
            matched: 0,
            delivered: 0,
            rate_limited: 0,
            failed: 0,
            stop_reason: StopReason::StreamEnded,
        }
    }

    fn record(&mut self, outcome: &DeliveryOutcome) {
        match outcome {
            DeliveryOutcome::Delivered => self.delivered += 1,
            DeliveryOutcome::RateLimited(_) => self.rate_limited += 1,
            DeliveryOutcome::Failed(_) => self.failed += 1,
        }
    }
}

/// Drives lines from a [`LineSource`] through matching and delivery.
pub struct Pipeline<N> {
    config: PipelineConfig,
    notifier: N,
}

impl<N: Notifier> Pipeline<N> {
    pub fn new(config: PipelineConfig, notifier: N) -> Self {
        Self { config, notifier }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Handle one line. Returns the delivery outcome if the line matched.
    pub async fn process_line(&self, line: &str) -> Option<DeliveryOutcome> {
        let result = match_line(line, &self.config.patterns)?;
        info!(pattern = %result.pattern, "Match: {}", result.line);

        let message = expand_template(
            &self.config.message_template,
            &result,
            &self.config.source_label,
        );

        let outcome = self.notifier.notify(&message).await;
        info!(
            channel = self.notifier.channel_type(),
            outcome = %outcome,
            "Notified: {}...",
            text::preview(&message, PREVIEW_CHARS)
        );
        Some(outcome)
    }

    /// Consume `source` until it ends or `shutdown` is cancelled, then close it.
    ///
    /// Shutdown is only observed between lines: a delivery that is already
    /// in flight runs to completion (or to its timeout) first. The source is
    /// closed on both exit paths.
    pub async fn run(
        &self,
        mut source: Box<dyn LineSource>,
        shutdown: CancellationToken,
    ) -> RunSummary {
        let mut summary = RunSummary::new();

        loop {
            let line = tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    debug!("Shutdown requested, no more lines will be read");
                    summary.stop_reason = StopReason::Interrupted;
                    break;
                }
                line = source.next_line() => line,
            };

            let Some(line) = line else {
                summary.stop_reason = StopReason::StreamEnded;
                break;
            };

            summary.lines_read += 1;
            if let Some(outcome) = self.process_line(&line).await {
                summary.matched += 1;
                summary.record(&outcome);
            }
        }

        if let Err(e) = source.close().await {
            warn!(error = %e, "Failed to stop log source cleanly");
        }

        info!(
            reason = %summary.stop_reason,
            lines = summary.lines_read,
            matched = summary.matched,
            delivered = summary.delivered,
            rate_limited = summary.rate_limited,
            failed = summary.failed,
            "Pipeline stopped"
        );
        summary
    }
}
