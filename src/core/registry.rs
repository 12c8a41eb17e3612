//! # Source registry: one slot per source, at most one run per slot.
//!
//! The registry owns the slot arena and the run handles. It is driven by the
//! coordinator (`start`, `stop`, `schedule_stop`, `cancel_pending_stop`) and
//! by each run's own completion callback (`finish`). Both paths go through the
//! same `parking_lot::Mutex`; the lock is never held across an `.await`.
//!
//! ## Slot transitions
//! ```text
//!             start()                     schedule_stop()
//!   Stopped ───────────► Running ───────────────────────► PendingStop
//!      ▲                  │   ▲                                │
//!      │ finish(gen)      │   └────── cancel_pending_stop() ───┘
//!      │ stop()           │                                    │
//!      └──────────────────┴──────────── stop() / finish(gen) ──┘
//! ```
//!
//! ## Rules
//! - `start` on a live slot (`Running`/`PendingStop`) is a no-op.
//! - `stop` on a `Stopped` slot is a no-op.
//! - `stop` cancels, then awaits the run (bounded by `stop_grace`, then abort).
//! - Every start bumps the slot generation; `finish` from an older
//!   generation never overwrites a newer run.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

use crate::cell::{CellValue, StateCell};
use crate::core::runner::{RunOutcome, publish_outcome, run_once};
use crate::core::slot::{RunHandle, SlotState, SlotStatus, SourceId};
use crate::events::{Bus, Event, EventKind};
use crate::sources::{BoxSourceFuture, SourceRef};

/// Slot arena for the sources of one merged state.
pub(crate) struct Registry<T> {
    sources: Vec<SourceRef<T>>,
    slots: Mutex<Vec<SlotState>>,
    cell: StateCell<T>,
    bus: Bus,
    runtime: Handle,
    runtime_token: CancellationToken,
    stop_grace: Option<Duration>,
}

/// A run taken out of its slot by `stop`.
struct Taken {
    id: SourceId,
    generation: u64,
    run: u32,
    handle: RunHandle,
}

impl<T: CellValue> Registry<T> {
    /// Creates a registry with one stopped slot per source.
    pub fn new(
        sources: Vec<SourceRef<T>>,
        cell: StateCell<T>,
        bus: Bus,
        runtime: Handle,
        runtime_token: CancellationToken,
        stop_grace: Option<Duration>,
    ) -> Arc<Self> {
        let slots = sources.iter().map(|_| SlotState::new()).collect();
        Arc::new(Self {
            sources,
            slots: Mutex::new(slots),
            cell,
            bus,
            runtime,
            runtime_token,
            stop_grace,
        })
    }

    /// All source ids, in registration order.
    pub fn ids(&self) -> impl Iterator<Item = SourceId> + use<T> {
        (0..self.sources.len()).map(SourceId)
    }

    /// Current status of a slot.
    #[cfg(test)]
    pub fn status(&self, id: SourceId) -> SlotStatus {
        self.slots.lock()[id.0].status
    }

    /// Number of runs started for a slot.
    #[cfg(test)]
    pub fn runs(&self, id: SourceId) -> u32 {
        self.slots.lock()[id.0].runs
    }

    /// Spawns a fresh run if the slot is `Stopped`. Returns whether a run was started.
    ///
    /// Refuses to start anything once the runtime token is cancelled.
    pub fn start(self: &Arc<Self>, id: SourceId) -> bool {
        if self.runtime_token.is_cancelled() {
            return false;
        }
        let source = Arc::clone(&self.sources[id.0]);

        let mut slots = self.slots.lock();
        let slot = &mut slots[id.0];
        if slot.status.is_live() {
            return false;
        }
        slot.generation += 1;
        slot.runs += 1;
        let (generation, run) = (slot.generation, slot.runs);

        let cancel = self.runtime_token.child_token();
        let ctx = cancel.clone();
        let cell = self.cell.clone();
        // The producer factory is invoked inside the task so a panicking factory
        // is reported like any other failed run.
        let fut: BoxSourceFuture = Box::pin(async move { source.spawn(cell, ctx).await });

        let me = Arc::clone(self);
        let token = cancel.clone();
        let join = self.runtime.spawn(async move {
            let outcome = run_once(fut, &token).await;
            me.finish(id, generation, run, outcome);
        });

        slot.status = SlotStatus::Running {
            started_at: Instant::now(),
        };
        slot.handle = Some(RunHandle { join, cancel });
        drop(slots);

        self.bus.publish(
            Event::new(EventKind::SourceStarting)
                .with_source(self.sources[id.0].name())
                .with_run(run),
        );
        true
    }

    /// Starts every `Stopped` slot. Returns how many runs were started.
    pub fn start_stopped(self: &Arc<Self>) -> usize {
        self.ids().filter(|id| self.start(*id)).count()
    }

    /// Cancels the slot's run and waits for it to exit. No-op on a `Stopped` slot.
    pub async fn stop(&self, id: SourceId) -> bool {
        let taken = {
            let mut slots = self.slots.lock();
            let slot = &mut slots[id.0];
            match slot.handle.take() {
                Some(handle) => Taken {
                    id,
                    generation: slot.generation,
                    run: slot.runs,
                    handle,
                },
                None => return false,
            }
        };
        taken.handle.cancel.cancel();
        self.await_stopped(taken).await;
        true
    }

    /// Stops every live slot concurrently. Returns how many runs were stopped.
    ///
    /// All runs are cancelled on the first poll, before any of them is awaited.
    pub async fn stop_all(&self) -> usize {
        join_all(self.ids().map(|id| self.stop(id)))
            .await
            .into_iter()
            .filter(|stopped| *stopped)
            .count()
    }

    /// Marks a `Running` slot as `PendingStop`. Returns whether it changed.
    pub fn schedule_stop(&self, id: SourceId) -> bool {
        let mut slots = self.slots.lock();
        let slot = &mut slots[id.0];
        match slot.status {
            SlotStatus::Running { started_at } => {
                slot.status = SlotStatus::PendingStop { started_at };
                true
            }
            _ => false,
        }
    }

    /// Reverts a `PendingStop` slot to `Running`, keeping its run. Returns whether it changed.
    pub fn cancel_pending_stop(&self, id: SourceId) -> bool {
        let mut slots = self.slots.lock();
        let slot = &mut slots[id.0];
        match slot.status {
            SlotStatus::PendingStop { started_at } => {
                slot.status = SlotStatus::Running { started_at };
                true
            }
            _ => false,
        }
    }

    /// Completion callback, called from inside the run's own task.
    fn finish(&self, id: SourceId, generation: u64, run: u32, outcome: RunOutcome) {
        {
            let mut slots = self.slots.lock();
            let slot = &mut slots[id.0];
            if slot.generation == generation && slot.status.is_live() {
                slot.status = SlotStatus::Stopped;
                slot.handle = None;
            }
        }
        publish_outcome(&self.bus, self.sources[id.0].name(), run, &outcome);
    }

    /// Awaits a cancelled run, aborting it after `stop_grace`, then marks the slot `Stopped`.
    async fn await_stopped(&self, taken: Taken) {
        let Taken {
            id,
            generation,
            run,
            handle,
        } = taken;
        let aborted = self.join_with_grace(handle.join).await;
        {
            let mut slots = self.slots.lock();
            let slot = &mut slots[id.0];
            if slot.generation == generation {
                slot.status = SlotStatus::Stopped;
            }
        }
        if aborted {
            let name = self.sources[id.0].name();
            tracing::warn!(target: "statevisor", source = name, run, "source ignored cancellation; task aborted");
            let mut ev = Event::new(EventKind::StopTimedOut).with_source(name);
            if let Some(grace) = self.stop_grace {
                ev = ev.with_delay(grace);
            }
            self.bus.publish(ev);
            publish_outcome(&self.bus, name, run, &RunOutcome::Stopped);
        }
    }

    /// Returns `true` if the run had to be aborted.
    async fn join_with_grace(&self, mut join: JoinHandle<()>) -> bool {
        let Some(grace) = self.stop_grace else {
            let _ = join.await;
            return false;
        };
        match time::timeout(grace, &mut join).await {
            Ok(_) => false,
            Err(_elapsed) => {
                join.abort();
                let _ = join.await;
                true
            }
        }
    }
}
