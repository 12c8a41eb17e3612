//! # MergedState: the public handle of a coordinated cell.
//!
//! A [`MergedState`] is a [`StateCell`] plus the lifecycle that keeps its
//! sources running. It dereferences to the cell, so `get`, `subscribe` and
//! `observe` are called on it directly.
//!
//! ## Teardown
//! - [`MergedState::shutdown`] cancels every source and waits for them to exit,
//!   even if the coordinator task has already ended.
//! - Dropping the last clone cancels the lifecycle token; sources then stop in
//!   the background.
//! - Cancelling the parent token given to
//!   [`MergedStateBuilder::with_cancellation`](crate::MergedStateBuilder::with_cancellation)
//!   has the same effect as dropping.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};

use super::builder::MergedStateBuilder;
use super::registry::Registry;
use crate::cell::{CellValue, StateCell};
use crate::events::{Bus, Event};
use crate::policies::LaunchPolicy;

/// Observable aggregate kept up to date by its sources.
///
/// Cloning is cheap; all clones share the same cell and lifecycle.
///
/// # Example
/// ```rust
/// use std::time::Duration;
/// use futures::stream;
/// use statevisor::{LaunchPolicy, MergedState, StateCell};
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let state = MergedState::builder(0u64)
///         .with_policy(LaunchPolicy::Lazy)
///         .source_fn(
///             "numbers",
///             |_cell: StateCell<u64>| stream::iter([1u64, 2, 3]),
///             |sum: &u64, n: u64| sum + n,
///         )
///         .build()?;
///
///     let mut sub = state.subscribe();
///     while let Some(sum) = sub.next().await {
///         if sum == 6 {
///             break;
///         }
///     }
///     state.shutdown().await;
///     Ok(())
/// }
/// ```
pub struct MergedState<T> {
    cell: StateCell<T>,
    registry: Arc<Registry<T>>,
    lifecycle: Arc<Lifecycle>,
}

struct Lifecycle {
    policy: LaunchPolicy,
    bus: Bus,
    token: CancellationToken,
    coordinator: Mutex<Option<JoinHandle<()>>>,
    listener: Mutex<Option<JoinHandle<()>>>,
    _guard: DropGuard,
}

impl<T: CellValue> MergedState<T> {
    pub(super) fn new(
        cell: StateCell<T>,
        policy: LaunchPolicy,
        bus: Bus,
        token: CancellationToken,
        registry: Arc<Registry<T>>,
        coordinator: JoinHandle<()>,
        listener: Option<JoinHandle<()>>,
    ) -> Self {
        let _guard = token.clone().drop_guard();
        Self {
            cell,
            registry,
            lifecycle: Arc::new(Lifecycle {
                policy,
                bus,
                token,
                coordinator: Mutex::new(Some(coordinator)),
                listener: Mutex::new(listener),
                _guard,
            }),
        }
    }

    /// Starts building a merged state around `initial`.
    pub fn builder(initial: T) -> MergedStateBuilder<T> {
        MergedStateBuilder::new(initial)
    }

    /// The underlying cell.
    pub fn as_cell(&self) -> &StateCell<T> {
        &self.cell
    }

    /// The launch policy in effect.
    pub fn policy(&self) -> LaunchPolicy {
        self.lifecycle.policy
    }

    /// Receives runtime events published from now on.
    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.lifecycle.bus.subscribe()
    }

    /// True once shutdown was requested, the last handle dropped, or the parent token cancelled.
    pub fn is_shut_down(&self) -> bool {
        self.lifecycle.token.is_cancelled()
    }

    /// Stops every source and waits for them (and subscriber delivery) to finish.
    ///
    /// The cell keeps its last value. Calling it again, or on another clone, only
    /// waits for whatever is still running.
    pub async fn shutdown(&self) {
        self.lifecycle.token.cancel();
        let coordinator = self.lifecycle.coordinator.lock().take();
        if let Some(task) = coordinator {
            if let Err(err) = task.await {
                tracing::warn!(target: "statevisor", error = %err, "coordinator ended abnormally; stopping sources directly");
            }
        }
        // No-op when the coordinator already stopped everything.
        self.registry.stop_all().await;

        let listener = self.lifecycle.listener.lock().take();
        if let Some(task) = listener {
            let _ = task.await;
        }
    }
}

impl<T> Clone for MergedState<T> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
            registry: Arc::clone(&self.registry),
            lifecycle: Arc::clone(&self.lifecycle),
        }
    }
}

impl<T> Deref for MergedState<T> {
    type Target = StateCell<T>;

    fn deref(&self) -> &StateCell<T> {
        &self.cell
    }
}

impl<T: fmt::Debug> fmt::Debug for MergedState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MergedState")
            .field("cell", &self.cell)
            .field("policy", &self.lifecycle.policy)
            .field("shut_down", &self.lifecycle.token.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::slot::{SlotStatus, SourceId};
    use crate::sources::{SourceFn, SourceRef};
    use futures::stream;
    use std::time::Duration;
    use tokio::runtime::Handle;

    fn forever() -> SourceRef<u32> {
        Arc::new(SourceFn::new(
            "forever",
            |_cell: StateCell<u32>| stream::pending::<u32>(),
            |_: &u32, v: u32| v,
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_sources_after_coordinator_died() {
        let cell = StateCell::new(0u32);
        let bus = Bus::new(16);
        let token = CancellationToken::new();
        let registry = Registry::new(
            vec![forever()],
            cell.clone(),
            bus.clone(),
            Handle::current(),
            token.clone(),
            Some(Duration::from_secs(1)),
        );
        assert_eq!(registry.start_stopped(), 1);

        let coordinator: JoinHandle<()> = tokio::spawn(async { panic!("coordinator down") });
        while !coordinator.is_finished() {
            tokio::task::yield_now().await;
        }

        let state = MergedState::new(
            cell,
            LaunchPolicy::Lazy,
            bus,
            token,
            Arc::clone(&registry),
            coordinator,
            None,
        );
        assert!(registry.status(SourceId(0)).is_live());

        state.shutdown().await;
        assert_eq!(registry.status(SourceId(0)), SlotStatus::Stopped);
        assert!(state.is_shut_down());
        // A second call finds nothing left to stop.
        state.shutdown().await;
    }
}
