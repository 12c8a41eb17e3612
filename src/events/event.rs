//! # Runtime events emitted by the coordinator, the registry and source runs.
//!
//! The [`EventKind`] enum classifies events into three groups:
//! - **Observer events**: edges of the observer count and the grace-period timer
//! - **Source events**: one start and one terminal event per source run
//! - **Subscriber events**: overflow/panic in the observability fan-out
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use statevisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::StopScheduled)
//!     .with_delay(Duration::from_secs(5))
//!     .with_observers(0);
//!
//! assert_eq!(ev.kind, EventKind::StopScheduled);
//! assert_eq!(ev.delay_ms, Some(5_000));
//! assert!(ev.source.is_none());
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Observer events ===
    /// Observer count went from 0 to at least 1.
    ///
    /// Sets: `observers`
    FirstObserver,

    /// Observer count dropped back to 0.
    ///
    /// Sets: `observers`
    NoObservers,

    /// Grace period started; sources stop after `delay_ms` unless an observer returns.
    ///
    /// Sets: `delay_ms`
    StopScheduled,

    /// An observer returned before the grace period elapsed; sources keep running.
    StopCancelled,

    /// Grace period elapsed with no observers; all sources are being stopped.
    StopElapsed,

    // === Source events ===
    /// A source run is starting.
    ///
    /// Sets: `source`, `run` (1-based, per source)
    SourceStarting,

    /// The producer sequence ended on its own.
    ///
    /// Sets: `source`, `run`
    SourceCompleted,

    /// The run exited after cancellation.
    ///
    /// Sets: `source`, `run`
    SourceStopped,

    /// The run failed (producer error, reducer error, or panic).
    ///
    /// Sets: `source`, `run`, `reason`
    SourceFailed,

    /// A cancelled run did not exit within `Config::stop_grace` and was aborted.
    ///
    /// Sets: `source`, `delay_ms` (the grace that was exceeded)
    StopTimedOut,

    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets: `source` (subscriber name), `reason`
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `source` (subscriber name), `reason`
    SubscriberOverflow,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Source (or subscriber) name, if applicable.
    pub source: Option<Arc<str>>,
    /// Run number of the source (starting from 1).
    pub run: Option<u32>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
    /// Delay in milliseconds (grace period, stop grace).
    pub delay_ms: Option<u32>,
    /// Observer count at the time of the event.
    pub observers: Option<usize>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            source: None,
            run: None,
            reason: None,
            delay_ms: None,
            observers: None,
        }
    }

    /// Attaches a source name.
    #[inline]
    pub fn with_source(mut self, source: impl Into<Arc<str>>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Attaches a run number.
    #[inline]
    pub fn with_run(mut self, run: u32) -> Self {
        self.run = Some(run);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a delay (stored as milliseconds, saturating at `u32::MAX`).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        let ms = u32::try_from(d.as_millis()).unwrap_or(u32::MAX);
        self.delay_ms = Some(ms);
        self
    }

    /// Attaches the observer count.
    #[inline]
    pub fn with_observers(mut self, n: usize) -> Self {
        self.observers = Some(n);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_source(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_source(subscriber)
            .with_reason(info)
    }

    /// True for the terminal event of a source run.
    #[inline]
    pub fn is_source_terminal(&self) -> bool {
        matches!(
            self.kind,
            EventKind::SourceCompleted | EventKind::SourceStopped | EventKind::SourceFailed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seq_is_monotonic() {
        let a = Event::new(EventKind::FirstObserver);
        let b = Event::new(EventKind::NoObservers);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_delay_saturates() {
        let ev = Event::new(EventKind::StopScheduled).with_delay(Duration::from_secs(u64::MAX));
        assert_eq!(ev.delay_ms, Some(u32::MAX));
    }

    #[test]
    fn test_terminal_kinds() {
        assert!(Event::new(EventKind::SourceFailed).is_source_terminal());
        assert!(Event::new(EventKind::SourceStopped).is_source_terminal());
        assert!(!Event::new(EventKind::SourceStarting).is_source_terminal());
        let ev = Event::subscriber_overflow("audit", "full");
        assert_eq!(ev.source.as_deref(), Some("audit"));
        assert_eq!(ev.reason.as_deref(), Some("subscriber=audit reason=full"));
    }
}
