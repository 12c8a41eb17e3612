//! # Source abstraction.
//!
//! A [`Source`] has a stable [`name`](Source::name) and a [`spawn`](Source::spawn)
//! method that builds a **fresh** run every time it is called. The registry
//! calls `spawn` once per start, so a source is restartable by construction:
//! a finished or cancelled run never affects the next one.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::cell::StateCell;
use crate::error::SourceError;

/// Boxed future returned by [`Source::spawn`].
pub type BoxSourceFuture = Pin<Box<dyn Future<Output = Result<(), SourceError>> + Send + 'static>>;

/// Shared handle to a source.
pub type SourceRef<T> = Arc<dyn Source<T>>;

/// # Restartable producer writing into a [`StateCell`].
///
/// # Example
/// ```
/// use statevisor::{BoxSourceFuture, Source, SourceError, StateCell};
/// use tokio_util::sync::CancellationToken;
///
/// struct Heartbeat;
///
/// impl Source<u64> for Heartbeat {
///     fn name(&self) -> &str { "heartbeat" }
///
///     fn spawn(&self, cell: StateCell<u64>, ctx: CancellationToken) -> BoxSourceFuture {
///         Box::pin(async move {
///             loop {
///                 tokio::select! {
///                     _ = ctx.cancelled() => return Err(SourceError::Canceled),
///                     _ = tokio::time::sleep(std::time::Duration::from_secs(1)) => {
///                         cell.merge(|n| n + 1);
///                     }
///                 }
///             }
///         })
///     }
/// }
/// ```
pub trait Source<T>: Send + Sync + 'static {
    /// Returns a stable, human-readable source name.
    fn name(&self) -> &str;

    /// Creates a new run of this source.
    ///
    /// The returned future should stop promptly once `ctx` is cancelled,
    /// returning `Err(SourceError::Canceled)` (or `Ok(())`).
    fn spawn(&self, cell: StateCell<T>, ctx: CancellationToken) -> BoxSourceFuture;
}
