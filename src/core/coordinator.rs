//! # Coordinator: turns observer-count edges into source starts and stops.
//!
//! One coordinator task runs per merged state. It watches the cell's observer
//! count and drives the [`Registry`] according to the [`LaunchPolicy`].
//!
//! ```text
//! Eager:            (sources started at build) ─► wait for cancel
//! Lazy:             wait for count > 0 ─► start_stopped() ─► wait for cancel
//! WhileSubscribed:
//!              count 0→1                     count 1→0
//!   Idle ──────────────────► Active ──────────────────────► Draining{deadline}
//!    ▲   start_stopped()       ▲      schedule_stop_all()        │   │
//!    │                         │                                 │   │
//!    │                         └──── count 0→1: cancel pending ──┘   │
//!    │                               stops, start_stopped()          │
//!    └──────────────── deadline reached: stop_all() ◄────────────────┘
//! ```
//!
//! ## Rules
//! - Edges are derived from the latest observed count; a 1→0→1 blip that
//!   completes between two polls is not an edge.
//! - On cancellation the loop exits and every live run is stopped.
//! - A stop timeout too large for `Instant` (e.g. `Duration::MAX`) never elapses.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

use super::registry::Registry;
use crate::cell::CellValue;
use crate::events::{Bus, Event, EventKind};
use crate::policies::LaunchPolicy;

/// Lifecycle phase under `WhileSubscribed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Nobody observing and nothing scheduled.
    Idle,
    /// At least one observer; sources started.
    Active,
    /// No observers; sources stop at `deadline` unless an observer returns.
    /// `None` when the timeout lies beyond what `Instant` can represent.
    Draining { deadline: Option<Instant> },
}

impl Phase {
    fn deadline(&self) -> Option<Instant> {
        match self {
            Phase::Draining { deadline } => *deadline,
            _ => None,
        }
    }
}

pub(super) struct Coordinator<T> {
    policy: LaunchPolicy,
    registry: Arc<Registry<T>>,
    observers: watch::Receiver<usize>,
    bus: Bus,
    token: CancellationToken,
}

impl<T: CellValue> Coordinator<T> {
    pub fn new(
        policy: LaunchPolicy,
        registry: Arc<Registry<T>>,
        observers: watch::Receiver<usize>,
        bus: Bus,
        token: CancellationToken,
    ) -> Self {
        Self {
            policy,
            registry,
            observers,
            bus,
            token,
        }
    }

    /// Runs until the token is cancelled, then stops every live source run.
    pub async fn run(mut self) {
        match self.policy {
            LaunchPolicy::Eager => self.token.cancelled().await,
            LaunchPolicy::Lazy => self.run_lazy().await,
            LaunchPolicy::WhileSubscribed { stop_timeout } => {
                self.run_while_subscribed(stop_timeout).await
            }
        }
        self.registry.stop_all().await;
    }

    async fn run_lazy(&mut self) {
        loop {
            let count = self.current();
            if count > 0 {
                self.bus
                    .publish(Event::new(EventKind::FirstObserver).with_observers(count));
                self.registry.start_stopped();
                break;
            }
            tokio::select! {
                biased;
                _ = self.token.cancelled() => return,
                res = self.observers.changed() => {
                    if res.is_err() {
                        break;
                    }
                }
            }
        }
        self.token.cancelled().await;
    }

    async fn run_while_subscribed(&mut self, stop_timeout: Duration) {
        let mut phase = Phase::Idle;
        let mut subscribed = false;
        loop {
            let count = self.current();
            match (subscribed, count > 0) {
                (false, true) => {
                    subscribed = true;
                    phase = self.on_subscribed(phase, count);
                }
                (true, false) => {
                    subscribed = false;
                    phase = self.on_unsubscribed(stop_timeout);
                }
                _ => {}
            }

            tokio::select! {
                biased;
                _ = self.token.cancelled() => return,
                res = self.observers.changed() => {
                    if res.is_err() {
                        self.token.cancelled().await;
                        return;
                    }
                }
                _ = grace_elapsed(phase.deadline()) => {
                    phase = self.on_stop_elapsed().await;
                }
            }
        }
    }

    fn on_subscribed(&self, phase: Phase, count: usize) -> Phase {
        self.bus
            .publish(Event::new(EventKind::FirstObserver).with_observers(count));
        if let Phase::Draining { .. } = phase {
            for id in self.registry.ids() {
                self.registry.cancel_pending_stop(id);
            }
            self.bus.publish(Event::new(EventKind::StopCancelled));
        }
        self.registry.start_stopped();
        Phase::Active
    }

    fn on_unsubscribed(&self, stop_timeout: Duration) -> Phase {
        self.bus
            .publish(Event::new(EventKind::NoObservers).with_observers(0));
        for id in self.registry.ids() {
            self.registry.schedule_stop(id);
        }
        self.bus
            .publish(Event::new(EventKind::StopScheduled).with_delay(stop_timeout));
        Phase::Draining {
            deadline: Instant::now().checked_add(stop_timeout),
        }
    }

    async fn on_stop_elapsed(&self) -> Phase {
        self.bus.publish(Event::new(EventKind::StopElapsed));
        self.registry.stop_all().await;
        Phase::Idle
    }

    fn current(&mut self) -> usize {
        *self.observers.borrow_and_update()
    }
}

async fn grace_elapsed(deadline: Option<Instant>) {
    match deadline {
        Some(at) => time::sleep_until(at).await,
        None => std::future::pending::<()>().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::StateCell;
    use crate::core::slot::{SlotStatus, SourceId};
    use crate::sources::{SourceFn, SourceRef};
    use futures::stream;
    use tokio::runtime::Handle;

    struct Rig {
        cell: StateCell<u32>,
        registry: Arc<Registry<u32>>,
        token: CancellationToken,
        join: tokio::task::JoinHandle<()>,
    }

    fn rig(policy: LaunchPolicy) -> Rig {
        let cell = StateCell::new(0);
        let bus = Bus::new(64);
        let token = CancellationToken::new();
        let source: SourceRef<u32> = Arc::new(SourceFn::new(
            "forever",
            |_cell: StateCell<u32>| stream::pending::<u32>(),
            |_: &u32, v: u32| v,
        ));
        let registry = Registry::new(
            vec![source],
            cell.clone(),
            bus.clone(),
            Handle::current(),
            token.clone(),
            None,
        );
        let coordinator = Coordinator::new(
            policy,
            Arc::clone(&registry),
            cell.watch_observers(),
            bus,
            token.clone(),
        );
        let join = tokio::spawn(coordinator.run());
        Rig {
            cell,
            registry,
            token,
            join,
        }
    }

    async fn settle() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_lazy_starts_once() {
        let rig = rig(LaunchPolicy::Lazy);
        settle().await;
        assert_eq!(rig.registry.status(SourceId(0)), SlotStatus::Stopped);

        let sub = rig.cell.subscribe();
        settle().await;
        assert!(rig.registry.status(SourceId(0)).is_live());

        drop(sub);
        time::sleep(Duration::from_secs(60)).await;
        assert!(rig.registry.status(SourceId(0)).is_live());
        assert_eq!(rig.registry.runs(SourceId(0)), 1);

        rig.token.cancel();
        rig.join.await.unwrap();
        assert_eq!(rig.registry.status(SourceId(0)), SlotStatus::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_while_subscribed_drains_then_stops() {
        let rig = rig(LaunchPolicy::while_subscribed(Duration::from_secs(5)));
        let sub = rig.cell.subscribe();
        settle().await;
        assert!(matches!(
            rig.registry.status(SourceId(0)),
            SlotStatus::Running { .. }
        ));

        drop(sub);
        settle().await;
        assert!(matches!(
            rig.registry.status(SourceId(0)),
            SlotStatus::PendingStop { .. }
        ));

        time::sleep(Duration::from_secs(5)).await;
        settle().await;
        assert_eq!(rig.registry.status(SourceId(0)), SlotStatus::Stopped);

        rig.token.cancel();
        rig.join.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_resubscribe_cancels_pending_stop() {
        let rig = rig(LaunchPolicy::while_subscribed(Duration::from_secs(5)));
        let sub = rig.cell.subscribe();
        settle().await;
        drop(sub);
        settle().await;

        time::sleep(Duration::from_secs(2)).await;
        let _sub = rig.cell.subscribe();
        settle().await;
        time::sleep(Duration::from_secs(10)).await;

        assert!(matches!(
            rig.registry.status(SourceId(0)),
            SlotStatus::Running { .. }
        ));
        assert_eq!(rig.registry.runs(SourceId(0)), 1);

        rig.token.cancel();
        rig.join.await.unwrap();
    }

    #[tokio::test]
    async fn test_phase_deadline() {
        assert_eq!(Phase::Idle.deadline(), None);
        assert_eq!(Phase::Active.deadline(), None);
        let at = Instant::now();
        let draining = Phase::Draining {
            deadline: Some(at),
        };
        assert_eq!(draining.deadline(), Some(at));
        assert_eq!(Phase::Draining { deadline: None }.deadline(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_timeout_never_elapses() {
        let rig = rig(LaunchPolicy::while_subscribed(Duration::MAX));
        let sub = rig.cell.subscribe();
        settle().await;
        drop(sub);
        settle().await;

        time::sleep(Duration::from_secs(365 * 24 * 3600)).await;
        settle().await;
        assert!(matches!(
            rig.registry.status(SourceId(0)),
            SlotStatus::PendingStop { .. }
        ));
        assert!(!rig.join.is_finished());

        let _sub = rig.cell.subscribe();
        settle().await;
        assert!(matches!(
            rig.registry.status(SourceId(0)),
            SlotStatus::Running { .. }
        ));
        assert_eq!(rig.registry.runs(SourceId(0)), 1);

        rig.token.cancel();
        rig.join.await.unwrap();
        assert_eq!(rig.registry.status(SourceId(0)), SlotStatus::Stopped);
    }
}
