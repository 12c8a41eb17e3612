//! # Run a single source attempt.
//!
//! Awaits one run future produced by [`Source::spawn`](crate::Source::spawn),
//! classifies how it ended, and publishes exactly one terminal event.
//!
//! ```text
//! Ok(())                  → SourceCompleted   (SourceStopped if ctx was cancelled)
//! Err(Canceled)           → SourceStopped
//! Err(Fail/Reduce)        → SourceFailed { reason }
//! panic                   → SourceFailed { reason = "source_panic: ..." }
//! ```

use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tokio_util::sync::CancellationToken;

use crate::error::SourceError;
use crate::events::{Bus, Event, EventKind};
use crate::sources::BoxSourceFuture;
use crate::subscribers::panic_message;

/// How a source run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum RunOutcome {
    /// The producer sequence ended on its own.
    Completed,
    /// The run exited after cancellation.
    Stopped,
    /// Producer failure, reducer failure or panic.
    Failed(String),
}

/// Awaits `run`, catching panics, and classifies the result.
pub(super) async fn run_once(run: BoxSourceFuture, ctx: &CancellationToken) -> RunOutcome {
    match AssertUnwindSafe(run).catch_unwind().await {
        Ok(Ok(())) if ctx.is_cancelled() => RunOutcome::Stopped,
        Ok(Ok(())) => RunOutcome::Completed,
        Ok(Err(SourceError::Canceled)) => RunOutcome::Stopped,
        Ok(Err(e)) => RunOutcome::Failed(e.to_string()),
        Err(panic) => RunOutcome::Failed(format!("source_panic: {}", panic_message(&*panic))),
    }
}

/// Publishes the terminal event for `outcome`.
pub(super) fn publish_outcome(bus: &Bus, name: &str, run: u32, outcome: &RunOutcome) {
    let ev = match outcome {
        RunOutcome::Completed => Event::new(EventKind::SourceCompleted),
        RunOutcome::Stopped => Event::new(EventKind::SourceStopped),
        RunOutcome::Failed(reason) => {
            Event::new(EventKind::SourceFailed).with_reason(reason.as_str())
        }
    };
    bus.publish(ev.with_source(name).with_run(run));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::Future;

    fn boxed(f: impl Future<Output = Result<(), SourceError>> + Send + 'static) -> BoxSourceFuture {
        Box::pin(f)
    }

    #[tokio::test]
    async fn test_classifies_results() {
        let ctx = CancellationToken::new();
        assert_eq!(
            run_once(boxed(async { Ok(()) }), &ctx).await,
            RunOutcome::Completed
        );
        assert_eq!(
            run_once(boxed(async { Err(SourceError::Canceled) }), &ctx).await,
            RunOutcome::Stopped
        );
        assert_eq!(
            run_once(boxed(async { Err(SourceError::fail("boom")) }), &ctx).await,
            RunOutcome::Failed("producer failed: boom".into())
        );
    }

    #[tokio::test]
    async fn test_ok_after_cancel_is_a_stop() {
        let ctx = CancellationToken::new();
        ctx.cancel();
        assert_eq!(
            run_once(boxed(async { Ok(()) }), &ctx).await,
            RunOutcome::Stopped
        );
    }

    #[tokio::test]
    async fn test_panic_becomes_failure() {
        let ctx = CancellationToken::new();
        let outcome = run_once(boxed(async { panic!("exploded") }), &ctx).await;
        assert_eq!(outcome, RunOutcome::Failed("source_panic: exploded".into()));
    }
}
