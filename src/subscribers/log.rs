//! # LogWriter: events as `tracing` records.
//!
//! Source failures and overflow are logged at `warn`, lifecycle edges at
//! `info`, everything else at `debug`. Install any `tracing` subscriber to see
//! the output.
//!
//! ## Example output (with `tracing_subscriber::fmt`)
//! ```text
//! INFO statevisor: first observer observers=1
//! INFO statevisor: source starting source="prices" run=1
//! INFO statevisor: stop scheduled delay_ms=5000
//! WARN statevisor: source failed source="prices" run=1 reason="producer failed: timeout"
//! ```

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Subscriber that forwards every event to `tracing`.
#[derive(Debug, Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let source = e.source.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("-");
        match e.kind {
            EventKind::FirstObserver => {
                info!(target: "statevisor", observers = e.observers, "first observer");
            }
            EventKind::NoObservers => {
                info!(target: "statevisor", "no observers");
            }
            EventKind::StopScheduled => {
                info!(target: "statevisor", delay_ms = e.delay_ms, "stop scheduled");
            }
            EventKind::StopCancelled => {
                info!(target: "statevisor", "stop cancelled");
            }
            EventKind::StopElapsed => {
                info!(target: "statevisor", "grace period elapsed, stopping sources");
            }
            EventKind::SourceStarting => {
                info!(target: "statevisor", source, run = e.run, "source starting");
            }
            EventKind::SourceCompleted => {
                debug!(target: "statevisor", source, run = e.run, "source completed");
            }
            EventKind::SourceStopped => {
                debug!(target: "statevisor", source, run = e.run, "source stopped");
            }
            EventKind::SourceFailed => {
                warn!(target: "statevisor", source, run = e.run, reason, "source failed");
            }
            EventKind::StopTimedOut => {
                warn!(target: "statevisor", source, grace_ms = e.delay_ms, "source ignored cancellation, aborted");
            }
            EventKind::SubscriberOverflow => {
                warn!(target: "statevisor", subscriber = source, reason, "subscriber overflow");
            }
            EventKind::SubscriberPanicked => {
                warn!(target: "statevisor", subscriber = source, reason, "subscriber panicked");
            }
        }
    }

    fn name(&self) -> &'static str {
        "log_writer"
    }
}
